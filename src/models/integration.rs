//! Outbound notification channels configured per organization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{IntegrationId, OrganizationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationKind {
    /// LINE Notify
    Line,
    Slack,
    Discord,
    /// Generic JSON webhook
    Webhook,
    /// E-mail through the configured relay
    Email,
}

impl IntegrationKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "line" => Some(Self::Line),
            "slack" => Some(Self::Slack),
            "discord" => Some(Self::Discord),
            "webhook" | "custom" => Some(Self::Webhook),
            "email" | "e-mail" => Some(Self::Email),
            _ => None,
        }
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => write!(f, "LINE"),
            Self::Slack => write!(f, "Slack"),
            Self::Discord => write!(f, "Discord"),
            Self::Webhook => write!(f, "Webhook"),
            Self::Email => write!(f, "Email"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    BoxSubmitted,
    DocsRequested,
    BoxCompleted,
    PaymentRecorded,
    TaskAssigned,
    ExportCompleted,
}

impl NotificationEvent {
    pub fn all() -> &'static [NotificationEvent] {
        &[
            Self::BoxSubmitted,
            Self::DocsRequested,
            Self::BoxCompleted,
            Self::PaymentRecorded,
            Self::TaskAssigned,
            Self::ExportCompleted,
        ]
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "box_submitted" | "submitted" => Some(Self::BoxSubmitted),
            "docs_requested" | "need_docs" => Some(Self::DocsRequested),
            "box_completed" | "completed" => Some(Self::BoxCompleted),
            "payment_recorded" | "payment" => Some(Self::PaymentRecorded),
            "task_assigned" | "task" => Some(Self::TaskAssigned),
            "export_completed" | "export" => Some(Self::ExportCompleted),
            _ => None,
        }
    }

    /// Wire name, e.g. `box_submitted`
    pub fn key(&self) -> &'static str {
        match self {
            Self::BoxSubmitted => "box_submitted",
            Self::DocsRequested => "docs_requested",
            Self::BoxCompleted => "box_completed",
            Self::PaymentRecorded => "payment_recorded",
            Self::TaskAssigned => "task_assigned",
            Self::ExportCompleted => "export_completed",
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: IntegrationId,
    pub organization_id: OrganizationId,
    pub kind: IntegrationKind,
    pub name: String,
    /// Webhook URL, or recipient address for e-mail
    pub target: String,
    /// Access token (LINE Notify)
    pub token: Option<String>,
    pub events: Vec<NotificationEvent>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Integration {
    pub fn new(
        organization_id: OrganizationId,
        kind: IntegrationKind,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: IntegrationId::new(),
            organization_id,
            kind,
            name: name.into().trim().to_string(),
            target: target.into().trim().to_string(),
            token: None,
            events: NotificationEvent::all().to_vec(),
            enabled: true,
            created_at: Utc::now(),
        }
    }

    pub fn wants(&self, event: NotificationEvent) -> bool {
        self.enabled && self.events.contains(&event)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Integration name cannot be empty".into());
        }
        match self.kind {
            IntegrationKind::Email => {
                if !self.target.contains('@') {
                    return Err(format!("Invalid e-mail address: {}", self.target));
                }
            }
            _ => {
                if !(self.target.starts_with("https://") || self.target.starts_with("http://")) {
                    return Err(format!("Integration target must be an http(s) URL: {}", self.target));
                }
            }
        }
        if self.kind == IntegrationKind::Line && self.token.as_deref().unwrap_or("").is_empty() {
            return Err("LINE integrations need an access token".into());
        }
        if self.events.is_empty() {
            return Err("Integration must subscribe to at least one event".into());
        }
        Ok(())
    }

    /// Copy with the token blanked, for audit records and snapshots
    pub fn redacted(&self) -> Integration {
        let mut copy = self.clone();
        if copy.token.is_some() {
            copy.token = Some("***".into());
        }
        copy
    }
}
