//! Catalog repository, persisted to catalog.json
//!
//! Categories, contacts and cost centers share one file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{
    Category, CategoryId, Contact, ContactId, CostCenter, CostCenterId, OrganizationId,
};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for Category {
    type Key = CategoryId;

    fn key(&self) -> CategoryId {
        self.id
    }
}

impl Keyed for Contact {
    type Key = ContactId;

    fn key(&self) -> ContactId {
        self.id
    }
}

impl Keyed for CostCenter {
    type Key = CostCenterId;

    fn key(&self) -> CostCenterId {
        self.id
    }
}

/// Serializable catalog data structure
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub cost_centers: Vec<CostCenter>,
}

pub struct CatalogRepository {
    path: PathBuf,
    pub categories: Table<Category>,
    pub contacts: Table<Contact>,
    pub cost_centers: Table<CostCenter>,
}

impl CatalogRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            categories: Table::new(),
            contacts: Table::new(),
            cost_centers: Table::new(),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: CatalogData = read_json(&self.path)?;
        self.categories.replace_all(file_data.categories)?;
        self.contacts.replace_all(file_data.contacts)?;
        self.cost_centers.replace_all(file_data.cost_centers)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let file_data = CatalogData {
            categories: self
                .categories
                .sorted_by_key(|c| (c.organization_id, c.box_type as u8, c.name.clone()))?,
            contacts: self
                .contacts
                .sorted_by_key(|c| (c.organization_id, c.name.to_lowercase()))?,
            cost_centers: self
                .cost_centers
                .sorted_by_key(|c| (c.organization_id, c.code.clone()))?,
        };
        write_json_atomic(&self.path, &file_data)
    }

    pub fn categories_of(
        &self,
        organization_id: OrganizationId,
        include_archived: bool,
    ) -> Result<Vec<Category>, TaxboxError> {
        let mut list = self.categories.filter(|c| {
            c.organization_id == organization_id && (include_archived || !c.archived)
        })?;
        list.sort_by(|a, b| (a.box_type as u8, &a.name).cmp(&(b.box_type as u8, &b.name)));
        Ok(list)
    }

    pub fn contacts_of(
        &self,
        organization_id: OrganizationId,
        include_archived: bool,
    ) -> Result<Vec<Contact>, TaxboxError> {
        let mut list = self.contacts.filter(|c| {
            c.organization_id == organization_id && (include_archived || !c.archived)
        })?;
        list.sort_by_key(|c| c.name.to_lowercase());
        Ok(list)
    }

    pub fn cost_centers_of(
        &self,
        organization_id: OrganizationId,
        include_archived: bool,
    ) -> Result<Vec<CostCenter>, TaxboxError> {
        let mut list = self.cost_centers.filter(|c| {
            c.organization_id == organization_id && (include_archived || !c.archived)
        })?;
        list.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(list)
    }

    /// Find a category by name within an organization (case-insensitive)
    pub fn find_category(
        &self,
        organization_id: OrganizationId,
        name: &str,
    ) -> Result<Option<Category>, TaxboxError> {
        let name = name.trim().to_lowercase();
        self.categories
            .find(|c| c.organization_id == organization_id && c.name.to_lowercase() == name)
    }

    pub fn find_contact(
        &self,
        organization_id: OrganizationId,
        name: &str,
    ) -> Result<Option<Contact>, TaxboxError> {
        let name = name.trim().to_lowercase();
        self.contacts
            .find(|c| c.organization_id == organization_id && c.name.to_lowercase() == name)
    }

    pub fn find_cost_center(
        &self,
        organization_id: OrganizationId,
        code: &str,
    ) -> Result<Option<CostCenter>, TaxboxError> {
        let code = code.trim().to_uppercase();
        self.cost_centers
            .find(|c| c.organization_id == organization_id && c.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoxType, ContactKind};
    use tempfile::TempDir;

    #[test]
    fn test_lookups_are_scoped_to_organization() {
        let temp_dir = TempDir::new().unwrap();
        let repo = CatalogRepository::new(temp_dir.path().join("catalog.json"));
        let org = OrganizationId::new();
        let other = OrganizationId::new();

        repo.categories
            .upsert(Category::new(org, "Rent", BoxType::Expense, "5300"))
            .unwrap();
        repo.contacts
            .upsert(Contact::new(org, "Thai Stationery Co.", ContactKind::Juristic))
            .unwrap();
        repo.cost_centers
            .upsert(CostCenter::new(org, "hq", "Head office"))
            .unwrap();
        repo.save().unwrap();

        let reloaded = CatalogRepository::new(temp_dir.path().join("catalog.json"));
        reloaded.load().unwrap();
        assert!(reloaded.find_category(org, "rent").unwrap().is_some());
        assert!(reloaded.find_category(other, "rent").unwrap().is_none());
        assert!(reloaded.find_contact(org, "thai stationery co.").unwrap().is_some());
        assert!(reloaded.find_cost_center(org, "HQ").unwrap().is_some());
        assert_eq!(reloaded.categories_of(org, false).unwrap().len(), 1);
    }
}
