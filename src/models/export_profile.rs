//! Export profiles and export history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BoxId, ExportHistoryId, ExportProfileId, OrganizationId, UserId};

/// Bookkeeping system an export is shaped for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportTarget {
    #[default]
    Generic,
    Peak,
    #[serde(rename = "FLOWACCOUNT")]
    FlowAccount,
    Express,
}

impl ExportTarget {
    pub fn all() -> &'static [ExportTarget] {
        &[Self::Generic, Self::Peak, Self::FlowAccount, Self::Express]
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "generic" => Some(Self::Generic),
            "peak" => Some(Self::Peak),
            "flowaccount" | "flow" => Some(Self::FlowAccount),
            "express" => Some(Self::Express),
            _ => None,
        }
    }

    /// Lowercase tag used in file names
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Peak => "peak",
            Self::FlowAccount => "flowaccount",
            Self::Express => "express",
        }
    }
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "GENERIC"),
            Self::Peak => write!(f, "PEAK"),
            Self::FlowAccount => write!(f, "FLOWACCOUNT"),
            Self::Express => write!(f, "EXPRESS"),
        }
    }
}

/// Artifact kind an export produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Zip,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().trim_start_matches('.') {
            "xlsx" | "excel" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Zip => "zip",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
            Self::Zip => "application/zip",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Saved export settings for an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportProfile {
    pub id: ExportProfileId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub target: ExportTarget,
    pub format: ExportFormat,
    /// Only export boxes in Completed status
    #[serde(default)]
    pub include_completed_only: bool,
    pub created_at: DateTime<Utc>,
}

impl ExportProfile {
    pub fn new(
        organization_id: OrganizationId,
        name: impl Into<String>,
        target: ExportTarget,
        format: ExportFormat,
    ) -> Self {
        Self {
            id: ExportProfileId::new(),
            organization_id,
            name: name.into().trim().to_string(),
            target,
            format,
            include_completed_only: false,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Export profile name cannot be empty".into());
        }
        Ok(())
    }
}

/// Record of one export run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportHistory {
    pub id: ExportHistoryId,
    pub organization_id: OrganizationId,
    pub profile_id: Option<ExportProfileId>,
    pub target: ExportTarget,
    pub format: ExportFormat,
    pub box_ids: Vec<BoxId>,
    pub file_name: String,
    pub row_count: usize,
    /// Files that could not be read into a zip bundle
    #[serde(default)]
    pub skipped_files: Vec<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}
