//! Organization service
//!
//! Users, organizations and memberships. The creator of an organization
//! becomes its Owner and an organization never loses its last Owner.

use serde::Serialize;

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{
    MemberRole, Organization, OrganizationId, OrganizationMember, User, UserId,
};
use crate::storage::{default_categories, AuditScope, Storage};

use super::access::{AccessService, Capability};

/// Fields that can change on an existing organization
#[derive(Debug, Clone, Default)]
pub struct OrganizationUpdate {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub address: Option<String>,
    pub vat_registered: Option<bool>,
}

/// A membership joined with its user
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub member: OrganizationMember,
    pub user: User,
}

pub struct OrganizationService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> OrganizationService<'a> {
    pub fn new(storage: &'a Storage, actor: UserId) -> Self {
        Self { storage, actor }
    }

    /// Register a user; there is no acting user yet, so the entry is self-attributed
    pub fn create_user(storage: &Storage, email: &str, name: &str) -> TaxboxResult<User> {
        let user = User::new(email, name);
        user.validate()
            .map_err(|e| TaxboxError::Validation(e.to_string()))?;

        if storage.users.get_by_email(&user.email)?.is_some() {
            return Err(TaxboxError::Duplicate {
                entity_type: "User",
                identifier: user.email,
            });
        }

        storage.users.upsert(user.clone())?;
        storage.users.save()?;
        storage.log_create(
            AuditScope::new(user.id),
            EntityType::User,
            user.id.to_string(),
            Some(user.email.clone()),
            &user,
        )?;

        tracing::info!(user = %user.email, "user created");
        Ok(user)
    }

    /// Find a user by e-mail or ID
    pub fn find_user(storage: &Storage, identifier: &str) -> TaxboxResult<User> {
        if let Some(user) = storage.users.get_by_email(identifier)? {
            return Ok(user);
        }
        if let Ok(id) = identifier.parse::<UserId>() {
            if let Some(user) = storage.users.get(id)? {
                return Ok(user);
            }
        }
        Err(TaxboxError::user_not_found(identifier))
    }

    fn scope(&self, organization_id: OrganizationId) -> AuditScope {
        AuditScope::new(self.actor).org(organization_id)
    }

    fn require(&self, organization_id: OrganizationId, capability: Capability) -> TaxboxResult<MemberRole> {
        AccessService::new(self.storage).require(self.actor, organization_id, capability)
    }

    pub fn create_organization(
        &self,
        name: &str,
        tax_id: &str,
        branch: Option<&str>,
        address: &str,
        vat_registered: bool,
    ) -> TaxboxResult<Organization> {
        let mut org = Organization::new(name, tax_id);
        if let Some(branch) = branch {
            org.branch = branch.trim().to_string();
        }
        org.address = address.trim().to_string();
        org.vat_registered = vat_registered;
        org.validate()
            .map_err(|e| TaxboxError::Validation(e.to_string()))?;

        if self.storage.users.get(self.actor)?.is_none() {
            return Err(TaxboxError::user_not_found(self.actor.to_string()));
        }
        if self.storage.organizations.get_by_name(&org.name)?.is_some() {
            return Err(TaxboxError::Duplicate {
                entity_type: "Organization",
                identifier: org.name,
            });
        }
        let taken = self
            .storage
            .organizations
            .organizations
            .find(|o| o.tax_id == org.tax_id && o.branch == org.branch)?;
        if taken.is_some() {
            return Err(TaxboxError::Duplicate {
                entity_type: "Organization",
                identifier: format!("{} branch {}", org.tax_id, org.branch),
            });
        }

        let owner = OrganizationMember::new(org.id, self.actor, MemberRole::Owner);
        self.storage.organizations.upsert(org.clone())?;
        self.storage.organizations.members.upsert(owner.clone())?;
        self.storage.organizations.save()?;

        let categories = default_categories(org.id);
        for category in &categories {
            self.storage.catalog.categories.upsert(category.clone())?;
        }
        self.storage.catalog.save()?;

        self.storage.log_create(
            self.scope(org.id),
            EntityType::Organization,
            org.id.to_string(),
            Some(org.name.clone()),
            &org,
        )?;
        self.storage.log_create(
            self.scope(org.id),
            EntityType::Member,
            self.actor.to_string(),
            Some(MemberRole::Owner.to_string()),
            &owner,
        )?;

        tracing::info!(organization = %org.name, categories = categories.len(), "organization created");
        Ok(org)
    }

    /// Find an organization by name or ID
    pub fn find_organization(&self, identifier: &str) -> TaxboxResult<Organization> {
        let found = match self.storage.organizations.get_by_name(identifier)? {
            Some(org) => Some(org),
            None => match identifier.parse::<OrganizationId>() {
                Ok(id) => self.storage.organizations.get(id)?,
                Err(_) => self
                    .storage
                    .organizations
                    .organizations
                    .find(|o| o.id.matches_short(identifier))?,
            },
        };
        found.ok_or_else(|| TaxboxError::organization_not_found(identifier))
    }

    pub fn get(&self, organization_id: OrganizationId) -> TaxboxResult<Organization> {
        self.require(organization_id, Capability::View)?;
        self.storage
            .organizations
            .get(organization_id)?
            .ok_or_else(|| TaxboxError::organization_not_found(organization_id.to_string()))
    }

    pub fn update_organization(
        &self,
        organization_id: OrganizationId,
        update: OrganizationUpdate,
    ) -> TaxboxResult<Organization> {
        self.require(organization_id, Capability::Manage)?;
        let mut org = self.get(organization_id)?;
        let before = org.clone();

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if let Some(existing) = self.storage.organizations.get_by_name(&name)? {
                if existing.id != org.id {
                    return Err(TaxboxError::Duplicate {
                        entity_type: "Organization",
                        identifier: name,
                    });
                }
            }
            org.name = name;
        }
        if let Some(branch) = update.branch {
            org.branch = branch.trim().to_string();
        }
        if let Some(address) = update.address {
            org.address = address.trim().to_string();
        }
        if let Some(vat_registered) = update.vat_registered {
            org.vat_registered = vat_registered;
        }
        org.validate()
            .map_err(|e| TaxboxError::Validation(e.to_string()))?;
        org.updated_at = chrono::Utc::now();

        self.storage.organizations.upsert(org.clone())?;
        self.storage.organizations.save()?;
        self.storage.log_update(
            self.scope(org.id),
            EntityType::Organization,
            org.id.to_string(),
            Some(org.name.clone()),
            &before,
            &org,
            None,
        )?;
        Ok(org)
    }

    /// Granting or revoking Owner needs an Owner; other changes need Manage
    fn require_role_change(&self, organization_id: OrganizationId, touches_owner: bool) -> TaxboxResult<()> {
        let role = self.require(organization_id, Capability::Manage)?;
        if touches_owner && role != MemberRole::Owner {
            return Err(TaxboxError::denied("only an Owner can grant or revoke Owner"));
        }
        Ok(())
    }

    pub fn add_member(
        &self,
        organization_id: OrganizationId,
        email: &str,
        role: MemberRole,
    ) -> TaxboxResult<OrganizationMember> {
        self.require_role_change(organization_id, role == MemberRole::Owner)?;
        let user = Self::find_user(self.storage, email)?;

        if self
            .storage
            .organizations
            .membership(organization_id, user.id)?
            .is_some()
        {
            return Err(TaxboxError::Duplicate {
                entity_type: "Member",
                identifier: user.email,
            });
        }

        let member = OrganizationMember::new(organization_id, user.id, role);
        self.storage.organizations.members.upsert(member.clone())?;
        self.storage.organizations.save()?;
        self.storage.log_create(
            self.scope(organization_id),
            EntityType::Member,
            user.id.to_string(),
            Some(format!("{} as {}", user.email, role)),
            &member,
        )?;

        tracing::info!(member = %user.email, %role, "member added");
        Ok(member)
    }

    fn membership(&self, organization_id: OrganizationId, user_id: UserId) -> TaxboxResult<OrganizationMember> {
        self.storage
            .organizations
            .membership(organization_id, user_id)?
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Member",
                identifier: user_id.to_string(),
            })
    }

    fn ensure_keeps_owner(&self, member: &OrganizationMember) -> TaxboxResult<()> {
        if member.role == MemberRole::Owner
            && self.storage.organizations.owner_count(member.organization_id)? <= 1
        {
            return Err(TaxboxError::Validation(
                "An organization must keep at least one Owner".into(),
            ));
        }
        Ok(())
    }

    pub fn change_role(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: MemberRole,
    ) -> TaxboxResult<OrganizationMember> {
        let mut member = self.membership(organization_id, user_id)?;
        self.require_role_change(
            organization_id,
            role == MemberRole::Owner || member.role == MemberRole::Owner,
        )?;
        if member.role == role {
            return Ok(member);
        }
        self.ensure_keeps_owner(&member)?;

        let before = member.clone();
        member.role = role;
        self.storage.organizations.members.upsert(member.clone())?;
        self.storage.organizations.save()?;
        self.storage.log_update(
            self.scope(organization_id),
            EntityType::Member,
            user_id.to_string(),
            None,
            &before,
            &member,
            Some(format!("role: {} -> {}", before.role, role)),
        )?;
        Ok(member)
    }

    /// Remove a member; anyone may leave, removing others needs Manage
    pub fn remove_member(&self, organization_id: OrganizationId, user_id: UserId) -> TaxboxResult<()> {
        let member = self.membership(organization_id, user_id)?;
        if user_id != self.actor {
            self.require_role_change(organization_id, member.role == MemberRole::Owner)?;
        }
        self.ensure_keeps_owner(&member)?;

        self.storage
            .organizations
            .members
            .remove((organization_id, user_id))?;
        self.storage.organizations.save()?;
        self.storage.log_delete(
            self.scope(organization_id),
            EntityType::Member,
            user_id.to_string(),
            None,
            &member,
        )?;
        Ok(())
    }

    pub fn list_members(&self, organization_id: OrganizationId) -> TaxboxResult<Vec<MemberView>> {
        self.require(organization_id, Capability::View)?;
        let mut views = Vec::new();
        for member in self.storage.organizations.members_of(organization_id)? {
            if let Some(user) = self.storage.users.get(member.user_id)? {
                views.push(MemberView { member, user });
            }
        }
        Ok(views)
    }

    /// Organizations the acting user can see, with their effective role
    pub fn list_for_user(&self) -> TaxboxResult<Vec<(Organization, MemberRole)>> {
        let access = AccessService::new(self.storage);
        let mut result = Vec::new();
        for org in self.storage.organizations.get_all()? {
            if let Some(role) = access.effective_role(self.actor, org.id)? {
                result.push((org, role));
            }
        }
        Ok(result)
    }
}
