//! Audit entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of operations that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
        }
    }
}

/// Types of entities that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Organization,
    Member,
    Firm,
    FirmMember,
    FirmRelation,
    Box,
    Document,
    Payment,
    Category,
    Contact,
    CostCenter,
    Task,
    ExportProfile,
    Export,
    Integration,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityType::User => "User",
            EntityType::Organization => "Organization",
            EntityType::Member => "Member",
            EntityType::Firm => "Firm",
            EntityType::FirmMember => "FirmMember",
            EntityType::FirmRelation => "FirmRelation",
            EntityType::Box => "Box",
            EntityType::Document => "Document",
            EntityType::Payment => "Payment",
            EntityType::Category => "Category",
            EntityType::Contact => "Contact",
            EntityType::CostCenter => "CostCenter",
            EntityType::Task => "Task",
            EntityType::ExportProfile => "ExportProfile",
            EntityType::Export => "Export",
            EntityType::Integration => "Integration",
        };
        write!(f, "{}", name)
    }
}

/// A single audit log entry
///
/// Records one operation on an entity, who performed it and in which
/// organization, with before/after snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    pub entity_type: EntityType,

    /// Display form of the entity ID, e.g. `box-1a2b3c4d`
    pub entity_id: String,

    /// Human-readable label, e.g. a box number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    /// User who performed the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// Organization the entity belongs to, when it belongs to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,

    /// Human-readable diff summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditEntry {
    fn blank(operation: Operation, entity_type: EntityType, entity_id: String, entity_name: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            entity_type,
            entity_id,
            entity_name,
            actor: None,
            organization_id: None,
            before: None,
            after: None,
            diff_summary: None,
        }
    }

    pub fn create<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Self {
        Self {
            after: serde_json::to_value(entity).ok(),
            ..Self::blank(Operation::Create, entity_type, entity_id.into(), entity_name)
        }
    }

    pub fn update<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) -> Self {
        Self {
            before: serde_json::to_value(before).ok(),
            after: serde_json::to_value(after).ok(),
            diff_summary,
            ..Self::blank(Operation::Update, entity_type, entity_id.into(), entity_name)
        }
    }

    pub fn delete<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Self {
        Self {
            before: serde_json::to_value(entity).ok(),
            ..Self::blank(Operation::Delete, entity_type, entity_id.into(), entity_name)
        }
    }

    /// Attribute the entry to a user
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Scope the entry to an organization
    pub fn in_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.entity_type,
            self.entity_id
        );

        if let Some(name) = &self.entity_name {
            output.push_str(&format!(" ({})", name));
        }
        if let Some(actor) = &self.actor {
            output.push_str(&format!(" by {}", actor));
        }
        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_entry_with_actor_and_org() {
        let entry = AuditEntry::create(
            EntityType::Box,
            "box-12345678",
            Some("EXP-202501-0001".to_string()),
            &json!({"title": "Rent"}),
        )
        .by("usr-aaaaaaaa")
        .in_organization("org-bbbbbbbb");

        assert_eq!(entry.operation, Operation::Create);
        assert!(entry.before.is_none());
        assert!(entry.after.is_some());
        assert_eq!(entry.actor.as_deref(), Some("usr-aaaaaaaa"));
        assert_eq!(entry.organization_id.as_deref(), Some("org-bbbbbbbb"));
    }

    #[test]
    fn test_update_and_delete_entries() {
        let before = json!({"status": "DRAFT"});
        let after = json!({"status": "PENDING"});
        let update = AuditEntry::update(
            EntityType::Box,
            "box-1",
            None,
            &before,
            &after,
            Some("status: \"DRAFT\" -> \"PENDING\"".into()),
        );
        assert!(update.before.is_some() && update.after.is_some());

        let delete = AuditEntry::delete(EntityType::Payment, "pay-1", None, &before);
        assert!(delete.after.is_none());
    }

    #[test]
    fn test_serialization_skips_missing_actor() {
        let entry = AuditEntry::create(EntityType::Task, "task-1", None, &json!({}));
        let line = serde_json::to_string(&entry).unwrap();
        assert!(!line.contains("actor"));
        assert!(line.contains("\"entity_type\":\"task\""));

        let parsed: AuditEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.entity_type, EntityType::Task);
    }

    #[test]
    fn test_human_readable_format() {
        let entry = AuditEntry::create(
            EntityType::Organization,
            "org-12345678",
            Some("Siam Widgets".to_string()),
            &json!({}),
        )
        .by("somchai@example.com");

        let formatted = entry.format_human_readable();
        assert!(formatted.contains("CREATE Organization org-12345678 (Siam Widgets)"));
        assert!(formatted.ends_with("by somchai@example.com"));
    }
}
