//! Catalog service
//!
//! Categories, contacts and cost centers of an organization. Entries are
//! archived rather than deleted so existing boxes keep their references.

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{
    BoxType, Category, CategoryId, Contact, ContactId, ContactKind, ContactRole, CostCenter,
    CostCenterId, OrganizationId, UserId,
};
use crate::storage::{AuditScope, Storage};

use super::access::{AccessService, Capability};

/// Input for a new contact
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub name: String,
    pub kind: ContactKind,
    pub role: ContactRole,
    pub tax_id: Option<String>,
    pub branch: Option<String>,
    pub default_wht_rate_bp: Option<u32>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub struct CatalogService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> CatalogService<'a> {
    pub fn new(storage: &'a Storage, actor: UserId) -> Self {
        Self { storage, actor }
    }

    fn require(&self, organization_id: OrganizationId, capability: Capability) -> TaxboxResult<()> {
        AccessService::new(self.storage).require(self.actor, organization_id, capability)?;
        Ok(())
    }

    fn scope(&self, organization_id: OrganizationId) -> AuditScope {
        AuditScope::new(self.actor).org(organization_id)
    }

    // === Categories ===

    pub fn create_category(
        &self,
        organization_id: OrganizationId,
        name: &str,
        box_type: BoxType,
        account_code: &str,
    ) -> TaxboxResult<Category> {
        self.require(organization_id, Capability::Manage)?;
        let category = Category::new(organization_id, name, box_type, account_code);
        category
            .validate()
            .map_err(|e| TaxboxError::Validation(e.to_string()))?;
        if self
            .storage
            .catalog
            .find_category(organization_id, &category.name)?
            .is_some()
        {
            return Err(TaxboxError::Duplicate {
                entity_type: "Category",
                identifier: category.name,
            });
        }

        self.storage.catalog.categories.upsert(category.clone())?;
        self.storage.catalog.save()?;
        self.storage.log_create(
            self.scope(organization_id),
            EntityType::Category,
            category.id.to_string(),
            Some(category.name.clone()),
            &category,
        )?;
        Ok(category)
    }

    pub fn list_categories(
        &self,
        organization_id: OrganizationId,
        include_archived: bool,
    ) -> TaxboxResult<Vec<Category>> {
        self.require(organization_id, Capability::View)?;
        self.storage
            .catalog
            .categories_of(organization_id, include_archived)
    }

    /// Find a category by name or ID within an organization
    pub fn find_category(&self, organization_id: OrganizationId, identifier: &str) -> TaxboxResult<Category> {
        let found = match self.storage.catalog.find_category(organization_id, identifier)? {
            Some(c) => Some(c),
            None => self.storage.catalog.categories.find(|c| {
                c.organization_id == organization_id
                    && (c.id.matches_short(identifier) || c.id.to_string() == identifier)
            })?,
        };
        found.ok_or_else(|| TaxboxError::NotFound {
            entity_type: "Category",
            identifier: identifier.to_string(),
        })
    }

    pub fn archive_category(&self, id: CategoryId) -> TaxboxResult<Category> {
        let mut category = self
            .storage
            .catalog
            .categories
            .get(id)?
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Category",
                identifier: id.to_string(),
            })?;
        self.require(category.organization_id, Capability::Manage)?;
        if category.archived {
            return Err(TaxboxError::Validation("Category is already archived".into()));
        }

        let before = category.clone();
        category.archived = true;
        self.storage.catalog.categories.upsert(category.clone())?;
        self.storage.catalog.save()?;
        self.storage.log_update(
            self.scope(category.organization_id),
            EntityType::Category,
            category.id.to_string(),
            Some(category.name.clone()),
            &before,
            &category,
            Some("archived: false -> true".into()),
        )?;
        Ok(category)
    }

    // === Contacts ===

    pub fn create_contact(&self, organization_id: OrganizationId, input: NewContact) -> TaxboxResult<Contact> {
        self.require(organization_id, Capability::Manage)?;
        let mut contact = Contact::new(organization_id, input.name, input.kind);
        contact.role = input.role;
        contact.tax_id = input.tax_id.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        contact.branch = input.branch;
        contact.default_wht_rate_bp = input.default_wht_rate_bp;
        contact.email = input.email;
        contact.phone = input.phone;
        contact
            .validate()
            .map_err(|e| TaxboxError::Validation(e.to_string()))?;
        if self
            .storage
            .catalog
            .find_contact(organization_id, &contact.name)?
            .is_some()
        {
            return Err(TaxboxError::Duplicate {
                entity_type: "Contact",
                identifier: contact.name,
            });
        }

        self.storage.catalog.contacts.upsert(contact.clone())?;
        self.storage.catalog.save()?;
        self.storage.log_create(
            self.scope(organization_id),
            EntityType::Contact,
            contact.id.to_string(),
            Some(contact.name.clone()),
            &contact,
        )?;
        Ok(contact)
    }

    pub fn list_contacts(
        &self,
        organization_id: OrganizationId,
        include_archived: bool,
    ) -> TaxboxResult<Vec<Contact>> {
        self.require(organization_id, Capability::View)?;
        self.storage
            .catalog
            .contacts_of(organization_id, include_archived)
    }

    pub fn find_contact(&self, organization_id: OrganizationId, identifier: &str) -> TaxboxResult<Contact> {
        let found = match self.storage.catalog.find_contact(organization_id, identifier)? {
            Some(c) => Some(c),
            None => self.storage.catalog.contacts.find(|c| {
                c.organization_id == organization_id
                    && (c.id.matches_short(identifier)
                        || c.tax_id.as_deref() == Some(identifier.trim()))
            })?,
        };
        found.ok_or_else(|| TaxboxError::NotFound {
            entity_type: "Contact",
            identifier: identifier.to_string(),
        })
    }

    pub fn archive_contact(&self, id: ContactId) -> TaxboxResult<Contact> {
        let mut contact = self
            .storage
            .catalog
            .contacts
            .get(id)?
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Contact",
                identifier: id.to_string(),
            })?;
        self.require(contact.organization_id, Capability::Manage)?;
        let before = contact.clone();
        contact.archived = true;
        self.storage.catalog.contacts.upsert(contact.clone())?;
        self.storage.catalog.save()?;
        self.storage.log_update(
            self.scope(contact.organization_id),
            EntityType::Contact,
            contact.id.to_string(),
            Some(contact.name.clone()),
            &before,
            &contact,
            None,
        )?;
        Ok(contact)
    }

    // === Cost centers ===

    pub fn create_cost_center(
        &self,
        organization_id: OrganizationId,
        code: &str,
        name: &str,
    ) -> TaxboxResult<CostCenter> {
        self.require(organization_id, Capability::Manage)?;
        let cost_center = CostCenter::new(organization_id, code, name);
        cost_center
            .validate()
            .map_err(|e| TaxboxError::Validation(e.to_string()))?;
        if self
            .storage
            .catalog
            .find_cost_center(organization_id, &cost_center.code)?
            .is_some()
        {
            return Err(TaxboxError::Duplicate {
                entity_type: "Cost center",
                identifier: cost_center.code,
            });
        }

        self.storage.catalog.cost_centers.upsert(cost_center.clone())?;
        self.storage.catalog.save()?;
        self.storage.log_create(
            self.scope(organization_id),
            EntityType::CostCenter,
            cost_center.id.to_string(),
            Some(cost_center.code.clone()),
            &cost_center,
        )?;
        Ok(cost_center)
    }

    pub fn list_cost_centers(
        &self,
        organization_id: OrganizationId,
        include_archived: bool,
    ) -> TaxboxResult<Vec<CostCenter>> {
        self.require(organization_id, Capability::View)?;
        self.storage
            .catalog
            .cost_centers_of(organization_id, include_archived)
    }

    pub fn find_cost_center(&self, organization_id: OrganizationId, code: &str) -> TaxboxResult<CostCenter> {
        self.storage
            .catalog
            .find_cost_center(organization_id, code)?
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Cost center",
                identifier: code.to_string(),
            })
    }

    pub fn archive_cost_center(&self, id: CostCenterId) -> TaxboxResult<CostCenter> {
        let mut cost_center = self
            .storage
            .catalog
            .cost_centers
            .get(id)?
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Cost center",
                identifier: id.to_string(),
            })?;
        self.require(cost_center.organization_id, Capability::Manage)?;
        let before = cost_center.clone();
        cost_center.archived = true;
        self.storage.catalog.cost_centers.upsert(cost_center.clone())?;
        self.storage.catalog.save()?;
        self.storage.log_update(
            self.scope(cost_center.organization_id),
            EntityType::CostCenter,
            cost_center.id.to_string(),
            Some(cost_center.code.clone()),
            &before,
            &cost_center,
            None,
        )?;
        Ok(cost_center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberRole;
    use crate::services::testutil::Fixture;

    #[test]
    fn test_category_lifecycle() {
        let fx = Fixture::new();
        let svc = CatalogService::new(&fx.storage, fx.owner);
        let before = svc.list_categories(fx.org, false).unwrap().len();

        let cat = svc
            .create_category(fx.org, "Software", BoxType::Expense, "5810")
            .unwrap();
        assert!(matches!(
            svc.create_category(fx.org, "software", BoxType::Expense, "")
                .unwrap_err(),
            TaxboxError::Duplicate { .. }
        ));
        assert_eq!(svc.find_category(fx.org, "SOFTWARE").unwrap().id, cat.id);

        svc.archive_category(cat.id).unwrap();
        assert_eq!(svc.list_categories(fx.org, false).unwrap().len(), before);
        assert_eq!(svc.list_categories(fx.org, true).unwrap().len(), before + 1);
    }

    #[test]
    fn test_contact_validation_and_lookup() {
        let fx = Fixture::new();
        let svc = CatalogService::new(&fx.storage, fx.owner);

        let bad = NewContact {
            name: "Bad Vendor".into(),
            tax_id: Some("0000000000000".into()),
            ..Default::default()
        };
        // 0000000000000 has check digit 1, so zero is wrong
        assert!(svc.create_contact(fx.org, bad).unwrap_err().is_validation());

        let vendor = svc
            .create_contact(
                fx.org,
                NewContact {
                    name: "Somsak Design".into(),
                    kind: ContactKind::Individual,
                    tax_id: Some("1234567890121".into()),
                    default_wht_rate_bp: Some(300),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(svc.find_contact(fx.org, "1234567890121").unwrap().id, vendor.id);
    }

    #[test]
    fn test_cost_center_codes_unique_and_manage_only() {
        let fx = Fixture::new();
        let svc = CatalogService::new(&fx.storage, fx.owner);
        svc.create_cost_center(fx.org, "hq", "Head office").unwrap();
        assert!(matches!(
            svc.create_cost_center(fx.org, "HQ", "Again").unwrap_err(),
            TaxboxError::Duplicate { .. }
        ));

        let staff = fx.member("staff@example.com", MemberRole::Staff);
        let err = CatalogService::new(&fx.storage, staff)
            .create_cost_center(fx.org, "OPS", "Operations")
            .unwrap_err();
        assert!(err.is_permission_denied());
    }
}
