//! Accounting firm models
//!
//! A firm provides bookkeeping to several client organizations. Firm staff
//! reach a client's boxes only through an active client relation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{FirmId, OrganizationId, RelationId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingFirm {
    pub id: FirmId,
    pub name: String,
    #[serde(default)]
    pub tax_id: String,
    pub created_at: DateTime<Utc>,
}

impl AccountingFirm {
    pub fn new(name: impl Into<String>, tax_id: impl Into<String>) -> Self {
        Self {
            id: FirmId::new(),
            name: name.into().trim().to_string(),
            tax_id: tax_id.into().trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for AccountingFirm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FirmRole {
    Owner,
    Manager,
    Accountant,
}

impl FirmRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "manager" => Some(Self::Manager),
            "accountant" => Some(Self::Accountant),
            _ => None,
        }
    }

    /// Owners and managers take on and drop clients
    pub fn manages_clients(&self) -> bool {
        matches!(self, Self::Owner | Self::Manager)
    }
}

impl fmt::Display for FirmRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "Owner"),
            Self::Manager => write!(f, "Manager"),
            Self::Accountant => write!(f, "Accountant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmMember {
    pub firm_id: FirmId,
    pub user_id: UserId,
    pub role: FirmRole,
    pub joined_at: DateTime<Utc>,
}

impl FirmMember {
    pub fn new(firm_id: FirmId, user_id: UserId, role: FirmRole) -> Self {
        Self {
            firm_id,
            user_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

/// Lifecycle of a firm/client engagement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationStatus {
    /// Requested by the firm, not yet accepted by the organization
    #[default]
    Pending,
    Active,
    Terminated,
}

impl fmt::Display for RelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Active => write!(f, "Active"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmClientRelation {
    pub id: RelationId,
    pub firm_id: FirmId,
    pub organization_id: OrganizationId,
    pub status: RelationStatus,
    /// Firm accountant responsible for this client
    pub assigned_accountant: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FirmClientRelation {
    pub fn new(firm_id: FirmId, organization_id: OrganizationId) -> Self {
        let now = Utc::now();
        Self {
            id: RelationId::new(),
            firm_id,
            organization_id,
            status: RelationStatus::Pending,
            assigned_accountant: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RelationStatus::Active
    }

    /// Pending and active relations both block a second request
    pub fn is_open(&self) -> bool {
        self.status != RelationStatus::Terminated
    }

    pub fn set_status(&mut self, status: RelationStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_relation_is_pending() {
        let rel = FirmClientRelation::new(FirmId::new(), OrganizationId::new());
        assert_eq!(rel.status, RelationStatus::Pending);
        assert!(rel.is_open());
        assert!(!rel.is_active());
    }

    #[test]
    fn test_terminated_relation_is_closed() {
        let mut rel = FirmClientRelation::new(FirmId::new(), OrganizationId::new());
        rel.set_status(RelationStatus::Active);
        assert!(rel.is_active());
        rel.set_status(RelationStatus::Terminated);
        assert!(!rel.is_open());
    }

    #[test]
    fn test_firm_role_capabilities() {
        assert!(FirmRole::Owner.manages_clients());
        assert!(FirmRole::Manager.manages_clients());
        assert!(!FirmRole::Accountant.manages_clients());
        assert_eq!(FirmRole::parse("Manager"), Some(FirmRole::Manager));
    }
}
