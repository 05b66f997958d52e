//! Export profile and history repository, persisted to exports.json

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{
    ExportHistory, ExportHistoryId, ExportProfile, ExportProfileId, OrganizationId,
};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for ExportProfile {
    type Key = ExportProfileId;

    fn key(&self) -> ExportProfileId {
        self.id
    }
}

impl Keyed for ExportHistory {
    type Key = ExportHistoryId;

    fn key(&self) -> ExportHistoryId {
        self.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ExportData {
    #[serde(default)]
    profiles: Vec<ExportProfile>,
    #[serde(default)]
    history: Vec<ExportHistory>,
}

pub struct ExportRepository {
    path: PathBuf,
    pub profiles: Table<ExportProfile>,
    pub history: Table<ExportHistory>,
}

impl ExportRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            profiles: Table::new(),
            history: Table::new(),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: ExportData = read_json(&self.path)?;
        self.profiles.replace_all(file_data.profiles)?;
        self.history.replace_all(file_data.history)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let file_data = ExportData {
            profiles: self.profiles.sorted_by_key(|p| p.created_at)?,
            history: self.history.sorted_by_key(|h| h.created_at)?,
        };
        write_json_atomic(&self.path, &file_data)
    }

    pub fn profiles_of(&self, organization_id: OrganizationId) -> Result<Vec<ExportProfile>, TaxboxError> {
        let mut list = self.profiles.filter(|p| p.organization_id == organization_id)?;
        list.sort_by_key(|p| p.name.to_lowercase());
        Ok(list)
    }

    pub fn find_profile(
        &self,
        organization_id: OrganizationId,
        name: &str,
    ) -> Result<Option<ExportProfile>, TaxboxError> {
        let name = name.trim().to_lowercase();
        self.profiles
            .find(|p| p.organization_id == organization_id && p.name.to_lowercase() == name)
    }

    /// Export runs of an organization, newest first
    pub fn history_of(&self, organization_id: OrganizationId) -> Result<Vec<ExportHistory>, TaxboxError> {
        let mut list = self.history.filter(|h| h.organization_id == organization_id)?;
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}
