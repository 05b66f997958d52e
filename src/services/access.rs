//! Role checks
//!
//! A user's effective role in an organization is their membership role, or
//! Accountant when they work at a firm with an active relation to it.

use std::fmt;

use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{MemberRole, OrganizationId, UserId};
use crate::storage::Storage;

/// What an operation needs to be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    Edit,
    Review,
    Manage,
    Export,
}

impl Capability {
    pub fn permits(&self, role: MemberRole) -> bool {
        use MemberRole::*;
        match self {
            Self::View => true,
            Self::Edit => matches!(role, Owner | Admin | Accountant | Staff),
            Self::Review | Self::Export => matches!(role, Owner | Admin | Accountant),
            Self::Manage => matches!(role, Owner | Admin),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Edit => write!(f, "edit"),
            Self::Review => write!(f, "review"),
            Self::Manage => write!(f, "manage"),
            Self::Export => write!(f, "export"),
        }
    }
}

pub struct AccessService<'a> {
    storage: &'a Storage,
}

impl<'a> AccessService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn effective_role(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> TaxboxResult<Option<MemberRole>> {
        if let Some(member) = self
            .storage
            .organizations
            .membership(organization_id, user_id)?
        {
            return Ok(Some(member.role));
        }
        if self.storage.firms.serves(user_id, organization_id)? {
            return Ok(Some(MemberRole::Accountant));
        }
        Ok(None)
    }

    /// Fail with `PermissionDenied` unless the user may `capability` in the organization
    pub fn require(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        capability: Capability,
    ) -> TaxboxResult<MemberRole> {
        match self.effective_role(user_id, organization_id)? {
            Some(role) if capability.permits(role) => Ok(role),
            Some(role) => {
                tracing::debug!(%user_id, %organization_id, %role, %capability, "access denied");
                Err(TaxboxError::denied(format!(
                    "{} cannot {} in this organization",
                    role, capability
                )))
            }
            None => Err(TaxboxError::denied(format!(
                "not a member of organization {}",
                organization_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::Fixture;

    #[test]
    fn test_capability_matrix() {
        use MemberRole::*;
        assert!(Capability::View.permits(Viewer));
        assert!(!Capability::Edit.permits(Viewer));
        assert!(Capability::Edit.permits(Staff));
        assert!(!Capability::Review.permits(Staff));
        assert!(Capability::Review.permits(Accountant));
        assert!(Capability::Export.permits(Accountant));
        assert!(!Capability::Manage.permits(Accountant));
        assert!(Capability::Manage.permits(Admin));
    }

    #[test]
    fn test_member_and_outsider() {
        let fx = Fixture::new();
        let access = AccessService::new(&fx.storage);

        assert_eq!(
            access.effective_role(fx.owner, fx.org).unwrap(),
            Some(MemberRole::Owner)
        );
        let outsider = fx.user("outsider@example.com");
        let err = access.require(outsider, fx.org, Capability::View).unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_firm_accountant_gets_access_only_when_active() {
        let fx = Fixture::new();
        let accountant = fx.firm_accountant_with_relation(false);
        let access = AccessService::new(&fx.storage);
        assert_eq!(access.effective_role(accountant, fx.org).unwrap(), None);

        let accountant = fx.firm_accountant_with_relation(true);
        assert_eq!(
            access.require(accountant, fx.org, Capability::Review).unwrap(),
            MemberRole::Accountant
        );
        assert!(access.require(accountant, fx.org, Capability::Manage).is_err());
    }
}
