//! Organization and membership repository, persisted to organizations.json

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{MemberRole, Organization, OrganizationId, OrganizationMember, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for Organization {
    type Key = OrganizationId;

    fn key(&self) -> OrganizationId {
        self.id
    }
}

impl Keyed for OrganizationMember {
    type Key = (OrganizationId, UserId);

    fn key(&self) -> (OrganizationId, UserId) {
        (self.organization_id, self.user_id)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OrganizationData {
    organizations: Vec<Organization>,
    #[serde(default)]
    members: Vec<OrganizationMember>,
}

pub struct OrganizationRepository {
    path: PathBuf,
    pub organizations: Table<Organization>,
    pub members: Table<OrganizationMember>,
}

impl OrganizationRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            organizations: Table::new(),
            members: Table::new(),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: OrganizationData = read_json(&self.path)?;
        self.organizations.replace_all(file_data.organizations)?;
        self.members.replace_all(file_data.members)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let file_data = OrganizationData {
            organizations: self.organizations.sorted_by_key(|o| o.name.to_lowercase())?,
            members: self
                .members
                .sorted_by_key(|m| (m.organization_id, m.joined_at))?,
        };
        write_json_atomic(&self.path, &file_data)
    }

    pub fn get(&self, id: OrganizationId) -> Result<Option<Organization>, TaxboxError> {
        self.organizations.get(id)
    }

    /// Case-insensitive name lookup
    pub fn get_by_name(&self, name: &str) -> Result<Option<Organization>, TaxboxError> {
        let name = name.trim().to_lowercase();
        self.organizations.find(|o| o.name.to_lowercase() == name)
    }

    pub fn get_all(&self) -> Result<Vec<Organization>, TaxboxError> {
        self.organizations.sorted_by_key(|o| o.name.to_lowercase())
    }

    pub fn upsert(&self, organization: Organization) -> Result<(), TaxboxError> {
        self.organizations.upsert(organization)
    }

    pub fn membership(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<Option<OrganizationMember>, TaxboxError> {
        self.members.get((organization_id, user_id))
    }

    pub fn members_of(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<OrganizationMember>, TaxboxError> {
        let mut members = self
            .members
            .filter(|m| m.organization_id == organization_id)?;
        members.sort_by_key(|m| (m.role, m.joined_at));
        Ok(members)
    }

    pub fn memberships_of(&self, user_id: UserId) -> Result<Vec<OrganizationMember>, TaxboxError> {
        self.members.filter(|m| m.user_id == user_id)
    }

    pub fn owner_count(&self, organization_id: OrganizationId) -> Result<usize, TaxboxError> {
        Ok(self
            .members
            .filter(|m| m.organization_id == organization_id && m.role == MemberRole::Owner)?
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_members_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("organizations.json");
        let repo = OrganizationRepository::new(path.clone());

        let org = Organization::new("Siam Widgets", "0105536000313");
        let owner = UserId::new();
        repo.upsert(org.clone()).unwrap();
        repo.members
            .upsert(OrganizationMember::new(org.id, owner, MemberRole::Owner))
            .unwrap();
        repo.members
            .upsert(OrganizationMember::new(org.id, UserId::new(), MemberRole::Staff))
            .unwrap();
        repo.save().unwrap();

        let reloaded = OrganizationRepository::new(path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.members_of(org.id).unwrap().len(), 2);
        assert_eq!(reloaded.owner_count(org.id).unwrap(), 1);
        assert!(reloaded.membership(org.id, owner).unwrap().is_some());
        assert!(reloaded.get_by_name("siam widgets").unwrap().is_some());
    }
}
