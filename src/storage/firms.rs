//! Accounting firm repository, persisted to firms.json
//!
//! Holds firms, their staff and their client relations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{
    AccountingFirm, FirmClientRelation, FirmId, FirmMember, OrganizationId, RelationId, UserId,
};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for AccountingFirm {
    type Key = FirmId;

    fn key(&self) -> FirmId {
        self.id
    }
}

impl Keyed for FirmMember {
    type Key = (FirmId, UserId);

    fn key(&self) -> (FirmId, UserId) {
        (self.firm_id, self.user_id)
    }
}

impl Keyed for FirmClientRelation {
    type Key = RelationId;

    fn key(&self) -> RelationId {
        self.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FirmData {
    firms: Vec<AccountingFirm>,
    #[serde(default)]
    members: Vec<FirmMember>,
    #[serde(default)]
    relations: Vec<FirmClientRelation>,
}

pub struct FirmRepository {
    path: PathBuf,
    pub firms: Table<AccountingFirm>,
    pub members: Table<FirmMember>,
    pub relations: Table<FirmClientRelation>,
}

impl FirmRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            firms: Table::new(),
            members: Table::new(),
            relations: Table::new(),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: FirmData = read_json(&self.path)?;
        self.firms.replace_all(file_data.firms)?;
        self.members.replace_all(file_data.members)?;
        self.relations.replace_all(file_data.relations)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let file_data = FirmData {
            firms: self.firms.sorted_by_key(|f| f.name.to_lowercase())?,
            members: self.members.sorted_by_key(|m| (m.firm_id, m.joined_at))?,
            relations: self.relations.sorted_by_key(|r| r.created_at)?,
        };
        write_json_atomic(&self.path, &file_data)
    }

    pub fn get(&self, id: FirmId) -> Result<Option<AccountingFirm>, TaxboxError> {
        self.firms.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<AccountingFirm>, TaxboxError> {
        let name = name.trim().to_lowercase();
        self.firms.find(|f| f.name.to_lowercase() == name)
    }

    pub fn membership(
        &self,
        firm_id: FirmId,
        user_id: UserId,
    ) -> Result<Option<FirmMember>, TaxboxError> {
        self.members.get((firm_id, user_id))
    }

    /// The non-terminated relation between a firm and an organization
    pub fn open_relation(
        &self,
        firm_id: FirmId,
        organization_id: OrganizationId,
    ) -> Result<Option<FirmClientRelation>, TaxboxError> {
        self.relations.find(|r| {
            r.firm_id == firm_id && r.organization_id == organization_id && r.is_open()
        })
    }

    pub fn relations_of_firm(&self, firm_id: FirmId) -> Result<Vec<FirmClientRelation>, TaxboxError> {
        let mut relations = self.relations.filter(|r| r.firm_id == firm_id)?;
        relations.sort_by_key(|r| r.created_at);
        Ok(relations)
    }

    /// True when `user_id` works at a firm with an active relation to the organization
    pub fn serves(&self, user_id: UserId, organization_id: OrganizationId) -> Result<bool, TaxboxError> {
        let firm_ids: Vec<FirmId> = self
            .members
            .filter(|m| m.user_id == user_id)?
            .into_iter()
            .map(|m| m.firm_id)
            .collect();
        if firm_ids.is_empty() {
            return Ok(false);
        }
        Ok(self
            .relations
            .find(|r| {
                r.organization_id == organization_id && r.is_active() && firm_ids.contains(&r.firm_id)
            })?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FirmRole, RelationStatus};
    use tempfile::TempDir;

    #[test]
    fn test_serves_requires_active_relation() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FirmRepository::new(temp_dir.path().join("firms.json"));

        let firm = AccountingFirm::new("Bangkok Bookkeeping", "0105555123450");
        let accountant = UserId::new();
        let org = OrganizationId::new();
        repo.firms.upsert(firm.clone()).unwrap();
        repo.members
            .upsert(FirmMember::new(firm.id, accountant, FirmRole::Accountant))
            .unwrap();

        let mut relation = FirmClientRelation::new(firm.id, org);
        repo.relations.upsert(relation.clone()).unwrap();
        assert!(!repo.serves(accountant, org).unwrap());
        assert!(repo.open_relation(firm.id, org).unwrap().is_some());

        relation.set_status(RelationStatus::Active);
        repo.relations.upsert(relation.clone()).unwrap();
        assert!(repo.serves(accountant, org).unwrap());
        assert!(!repo.serves(UserId::new(), org).unwrap());

        relation.set_status(RelationStatus::Terminated);
        repo.relations.upsert(relation).unwrap();
        assert!(!repo.serves(accountant, org).unwrap());
        assert!(repo.open_relation(firm.id, org).unwrap().is_none());
    }
}
