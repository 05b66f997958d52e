//! Follow-up tasks for organizations and boxes

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BoxId, OrganizationId, TaskId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "open" => Some(Self::Open),
            "in_progress" | "inprogress" | "started" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Done => write!(f, "Done"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub organization_id: OrganizationId,
    pub box_id: Option<BoxId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assignee: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(organization_id: OrganizationId, title: impl Into<String>, created_by: UserId) -> Self {
        Self {
            id: TaskId::new(),
            organization_id,
            box_id: None,
            title: title.into().trim().to_string(),
            description: String::new(),
            assignee: None,
            due_date: None,
            status: TaskStatus::Open,
            created_by,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Past its due date while still open or in progress
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_active() && self.due_date.map(|d| d < today).unwrap_or(false)
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.completed_at = match status {
            TaskStatus::Done => Some(Utc::now()),
            _ => None,
        };
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        if self.title.len() > 200 {
            return Err(TaskValidationError::TitleTooLong(self.title.len()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    TitleTooLong(usize),
}

impl fmt::Display for TaskValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Task title cannot be empty"),
            Self::TitleTooLong(len) => write!(f, "Task title too long ({} chars, max 200)", len),
        }
    }
}

impl std::error::Error for TaskValidationError {}
