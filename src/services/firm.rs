//! Firm service
//!
//! Accounting firms, their staff and client engagements. A firm asks for a
//! client relation, the organization accepts it, and from then on the firm's
//! members act on the organization as accountants.

use serde::Serialize;

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::organization::validate_tax_id;
use crate::models::{
    AccountingFirm, FirmClientRelation, FirmId, FirmMember, FirmRole, Organization,
    OrganizationId, RelationId, RelationStatus, UserId,
};
use crate::storage::{AuditScope, Storage};

use super::access::{AccessService, Capability};
use super::organization::OrganizationService;

/// A client relation joined with its organization
#[derive(Debug, Clone, Serialize)]
pub struct ClientView {
    pub relation: FirmClientRelation,
    pub organization: Organization,
}

pub struct FirmService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> FirmService<'a> {
    pub fn new(storage: &'a Storage, actor: UserId) -> Self {
        Self { storage, actor }
    }

    fn firm_role(&self, firm_id: FirmId) -> TaxboxResult<FirmRole> {
        self.storage
            .firms
            .membership(firm_id, self.actor)?
            .map(|m| m.role)
            .ok_or_else(|| TaxboxError::denied(format!("not a member of firm {}", firm_id)))
    }

    fn require_firm_manager(&self, firm_id: FirmId) -> TaxboxResult<FirmRole> {
        let role = self.firm_role(firm_id)?;
        if !role.manages_clients() {
            return Err(TaxboxError::denied(format!("{} cannot manage firm clients", role)));
        }
        Ok(role)
    }

    fn relation(&self, relation_id: RelationId) -> TaxboxResult<FirmClientRelation> {
        self.storage
            .firms
            .relations
            .get(relation_id)?
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Client relation",
                identifier: relation_id.to_string(),
            })
    }

    fn save_relation(&self, before: &FirmClientRelation, after: &FirmClientRelation) -> TaxboxResult<()> {
        self.storage.firms.relations.upsert(after.clone())?;
        self.storage.firms.save()?;
        self.storage.log_update(
            AuditScope::new(self.actor).org(after.organization_id),
            EntityType::FirmRelation,
            after.id.to_string(),
            None,
            before,
            after,
            None,
        )
    }

    pub fn create_firm(&self, name: &str, tax_id: &str) -> TaxboxResult<AccountingFirm> {
        let firm = AccountingFirm::new(name, tax_id);
        if firm.name.is_empty() {
            return Err(TaxboxError::Validation("Firm name cannot be empty".into()));
        }
        validate_tax_id(&firm.tax_id).map_err(|e| TaxboxError::Validation(e.to_string()))?;
        if self.storage.firms.get_by_name(&firm.name)?.is_some() {
            return Err(TaxboxError::Duplicate {
                entity_type: "Firm",
                identifier: firm.name,
            });
        }

        let owner = FirmMember::new(firm.id, self.actor, FirmRole::Owner);
        self.storage.firms.firms.upsert(firm.clone())?;
        self.storage.firms.members.upsert(owner)?;
        self.storage.firms.save()?;
        self.storage.log_create(
            AuditScope::new(self.actor),
            EntityType::Firm,
            firm.id.to_string(),
            Some(firm.name.clone()),
            &firm,
        )?;

        tracing::info!(firm = %firm.name, "firm created");
        Ok(firm)
    }

    /// Find a firm by name or ID
    pub fn find_firm(&self, identifier: &str) -> TaxboxResult<AccountingFirm> {
        if let Some(firm) = self.storage.firms.get_by_name(identifier)? {
            return Ok(firm);
        }
        let by_id = match identifier.parse::<FirmId>() {
            Ok(id) => self.storage.firms.get(id)?,
            Err(_) => self.storage.firms.firms.find(|f| f.id.matches_short(identifier))?,
        };
        by_id.ok_or_else(|| TaxboxError::firm_not_found(identifier))
    }

    pub fn add_firm_member(&self, firm_id: FirmId, email: &str, role: FirmRole) -> TaxboxResult<FirmMember> {
        let actor_role = self.require_firm_manager(firm_id)?;
        if role == FirmRole::Owner && actor_role != FirmRole::Owner {
            return Err(TaxboxError::denied("only a firm Owner can add Owners"));
        }
        let user = OrganizationService::find_user(self.storage, email)?;
        if self.storage.firms.membership(firm_id, user.id)?.is_some() {
            return Err(TaxboxError::Duplicate {
                entity_type: "Firm member",
                identifier: user.email,
            });
        }

        let member = FirmMember::new(firm_id, user.id, role);
        self.storage.firms.members.upsert(member.clone())?;
        self.storage.firms.save()?;
        self.storage.log_create(
            AuditScope::new(self.actor),
            EntityType::FirmMember,
            user.id.to_string(),
            Some(format!("{} as {}", user.email, role)),
            &member,
        )?;
        Ok(member)
    }

    /// Ask to serve an organization; the relation starts Pending
    pub fn request_client(
        &self,
        firm_id: FirmId,
        organization_id: OrganizationId,
    ) -> TaxboxResult<FirmClientRelation> {
        self.require_firm_manager(firm_id)?;
        if self.storage.organizations.get(organization_id)?.is_none() {
            return Err(TaxboxError::organization_not_found(organization_id.to_string()));
        }
        if let Some(open) = self.storage.firms.open_relation(firm_id, organization_id)? {
            return Err(TaxboxError::Duplicate {
                entity_type: "Client relation",
                identifier: format!("{} ({})", open.id, open.status),
            });
        }

        let relation = FirmClientRelation::new(firm_id, organization_id);
        self.storage.firms.relations.upsert(relation.clone())?;
        self.storage.firms.save()?;
        self.storage.log_create(
            AuditScope::new(self.actor).org(organization_id),
            EntityType::FirmRelation,
            relation.id.to_string(),
            None,
            &relation,
        )?;

        tracing::info!(%firm_id, %organization_id, "client relation requested");
        Ok(relation)
    }

    /// Organization managers accept a pending request
    pub fn accept_client(&self, relation_id: RelationId) -> TaxboxResult<FirmClientRelation> {
        let mut relation = self.relation(relation_id)?;
        AccessService::new(self.storage).require(
            self.actor,
            relation.organization_id,
            Capability::Manage,
        )?;
        if relation.status != RelationStatus::Pending {
            return Err(TaxboxError::Validation(format!(
                "Only pending relations can be accepted (this one is {})",
                relation.status
            )));
        }

        let before = relation.clone();
        relation.set_status(RelationStatus::Active);
        self.save_relation(&before, &relation)?;
        Ok(relation)
    }

    /// Either side may end an open relation
    pub fn terminate_client(&self, relation_id: RelationId) -> TaxboxResult<FirmClientRelation> {
        let mut relation = self.relation(relation_id)?;
        let firm_side = self
            .firm_role(relation.firm_id)
            .map(|r| r.manages_clients())
            .unwrap_or(false);
        if !firm_side {
            AccessService::new(self.storage).require(
                self.actor,
                relation.organization_id,
                Capability::Manage,
            )?;
        }
        if !relation.is_open() {
            return Err(TaxboxError::Validation("Relation is already terminated".into()));
        }

        let before = relation.clone();
        relation.set_status(RelationStatus::Terminated);
        self.save_relation(&before, &relation)?;
        Ok(relation)
    }

    pub fn assign_accountant(
        &self,
        relation_id: RelationId,
        accountant: UserId,
    ) -> TaxboxResult<FirmClientRelation> {
        let mut relation = self.relation(relation_id)?;
        self.require_firm_manager(relation.firm_id)?;
        if !relation.is_open() {
            return Err(TaxboxError::Validation("Relation is terminated".into()));
        }
        if self
            .storage
            .firms
            .membership(relation.firm_id, accountant)?
            .is_none()
        {
            return Err(TaxboxError::Validation(
                "Assigned accountant must be a member of the firm".into(),
            ));
        }

        let before = relation.clone();
        relation.assigned_accountant = Some(accountant);
        relation.updated_at = chrono::Utc::now();
        self.save_relation(&before, &relation)?;
        Ok(relation)
    }

    /// Open relations of a firm with their organizations
    pub fn list_clients(&self, firm_id: FirmId) -> TaxboxResult<Vec<ClientView>> {
        self.firm_role(firm_id)?;
        let mut clients = Vec::new();
        for relation in self.storage.firms.relations_of_firm(firm_id)? {
            if !relation.is_open() {
                continue;
            }
            if let Some(organization) = self.storage.organizations.get(relation.organization_id)? {
                clients.push(ClientView {
                    relation,
                    organization,
                });
            }
        }
        clients.sort_by(|a, b| a.organization.name.cmp(&b.organization.name));
        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::{Fixture, FIRM_TAX_ID};

    #[test]
    fn test_request_accept_terminate() {
        let fx = Fixture::new();
        let partner = fx.user("partner@firm.co.th");
        let firms = FirmService::new(&fx.storage, partner);
        let firm = firms.create_firm("Chao Phraya Accounting", FIRM_TAX_ID).unwrap();

        let relation = firms.request_client(firm.id, fx.org).unwrap();
        assert_eq!(relation.status, RelationStatus::Pending);
        assert!(matches!(
            firms.request_client(firm.id, fx.org).unwrap_err(),
            TaxboxError::Duplicate { .. }
        ));

        // The firm cannot accept on the organization's behalf
        assert!(firms.accept_client(relation.id).unwrap_err().is_permission_denied());

        let accepted = FirmService::new(&fx.storage, fx.owner)
            .accept_client(relation.id)
            .unwrap();
        assert!(accepted.is_active());
        assert_eq!(firms.list_clients(firm.id).unwrap().len(), 1);

        firms.terminate_client(relation.id).unwrap();
        assert!(firms.list_clients(firm.id).unwrap().is_empty());
        assert!(firms.terminate_client(relation.id).unwrap_err().is_validation());
    }

    #[test]
    fn test_accountant_cannot_request_clients() {
        let fx = Fixture::new();
        let partner = fx.user("partner@firm.co.th");
        fx.user("junior@firm.co.th");
        let firms = FirmService::new(&fx.storage, partner);
        let firm = firms.create_firm("Chao Phraya Accounting", FIRM_TAX_ID).unwrap();
        let member = firms
            .add_firm_member(firm.id, "junior@firm.co.th", FirmRole::Accountant)
            .unwrap();

        let junior = FirmService::new(&fx.storage, member.user_id);
        assert!(junior
            .request_client(firm.id, fx.org)
            .unwrap_err()
            .is_permission_denied());
        // members can still see the client list
        assert!(junior.list_clients(firm.id).unwrap().is_empty());
    }

    #[test]
    fn test_assign_accountant_must_be_firm_member() {
        let fx = Fixture::new();
        let partner = fx.user("partner@firm.co.th");
        let firms = FirmService::new(&fx.storage, partner);
        let firm = firms.create_firm("Chao Phraya Accounting", FIRM_TAX_ID).unwrap();
        let relation = firms.request_client(firm.id, fx.org).unwrap();

        assert!(firms.assign_accountant(relation.id, fx.owner).unwrap_err().is_validation());
        let assigned = firms.assign_accountant(relation.id, partner).unwrap();
        assert_eq!(assigned.assigned_accountant, Some(partner));
    }
}
