//! Box service
//!
//! Creation with numbering and tax derivation, edits, the review workflow
//! and box listing.
//!
//! Workflow:
//!
//! | from      | to        | operation      | capability |
//! |-----------|-----------|----------------|------------|
//! | Draft     | Pending   | `submit`       | edit       |
//! | Pending   | Draft     | `withdraw`     | edit       |
//! | Pending   | NeedDocs  | `request_docs` | review     |
//! | NeedDocs  | Pending   | `resubmit`     | edit       |
//! | Pending   | Completed | `complete`     | review     |
//! | Completed | Pending   | `reopen`       | review     |

use chrono::NaiveDate;
use serde::Serialize;

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{
    box_number_sequence, format_box_number, missing_documents, BoxId, BoxStatus, BoxType, BoxValidationError,
    CategoryId, Contact, ContactId, CostCenterId, DocBox, Document, Money, OrganizationId,
    Payment, PaymentStatus, Requirement, UserId, VatStatus, WhtStatus,
};
use crate::storage::{AuditScope, Storage};

use super::access::{AccessService, Capability};
use super::document::sync_document_statuses;

/// Input for a new box
#[derive(Debug, Clone)]
pub struct NewBox {
    pub organization_id: OrganizationId,
    pub box_type: BoxType,
    pub title: String,
    pub document_date: NaiveDate,
    pub total_amount: Money,
    pub contact_id: Option<ContactId>,
    pub category_id: Option<CategoryId>,
    pub cost_center_id: Option<CostCenterId>,
    pub due_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub has_vat: bool,
    pub vat_inclusive: bool,
    /// Falls back to the configured default rate
    pub vat_rate_bp: Option<u32>,
    pub has_wht: bool,
    /// Falls back to the contact's default WHT rate
    pub wht_rate_bp: Option<u32>,
}

impl NewBox {
    pub fn new(
        organization_id: OrganizationId,
        box_type: BoxType,
        title: impl Into<String>,
        document_date: NaiveDate,
        total_amount: Money,
    ) -> Self {
        Self {
            organization_id,
            box_type,
            title: title.into(),
            document_date,
            total_amount,
            contact_id: None,
            category_id: None,
            cost_center_id: None,
            due_date: None,
            reference: None,
            has_vat: false,
            vat_inclusive: true,
            vat_rate_bp: None,
            has_wht: false,
            wht_rate_bp: None,
        }
    }
}

/// Fields that can change on an existing box
#[derive(Debug, Clone, Default)]
pub struct BoxUpdate {
    pub title: Option<String>,
    pub document_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub total_amount: Option<Money>,
    pub contact_id: Option<ContactId>,
    pub category_id: Option<CategoryId>,
    pub cost_center_id: Option<CostCenterId>,
    pub has_vat: Option<bool>,
    pub vat_inclusive: Option<bool>,
    pub vat_rate_bp: Option<u32>,
    pub has_wht: Option<bool>,
    pub wht_rate_bp: Option<u32>,
}

impl BoxUpdate {
    fn changes_amounts(&self) -> bool {
        self.total_amount.is_some()
            || self.has_vat.is_some()
            || self.vat_inclusive.is_some()
            || self.vat_rate_bp.is_some()
            || self.has_wht.is_some()
            || self.wht_rate_bp.is_some()
    }
}

/// Criteria for listing boxes
#[derive(Debug, Clone, Default)]
pub struct BoxFilter {
    /// All organizations visible to the actor when `None`
    pub organization_id: Option<OrganizationId>,
    pub status: Option<BoxStatus>,
    pub box_type: Option<BoxType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub payment_status: Option<PaymentStatus>,
    /// Case-insensitive match on number, title, reference or contact name
    pub text: Option<String>,
    pub limit: Option<usize>,
}

/// A box with everything filed against it
#[derive(Debug, Clone, Serialize)]
pub struct BoxDetail {
    pub doc_box: DocBox,
    pub contact: Option<Contact>,
    pub documents: Vec<Document>,
    pub payments: Vec<Payment>,
    pub missing: Vec<Requirement>,
}

fn box_error(e: BoxValidationError) -> TaxboxError {
    match e {
        BoxValidationError::InvalidTransition { from, to } => TaxboxError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        },
        other => TaxboxError::Validation(other.to_string()),
    }
}

pub struct BoxService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> BoxService<'a> {
    pub fn new(storage: &'a Storage, actor: UserId) -> Self {
        Self { storage, actor }
    }

    fn require(&self, organization_id: OrganizationId, capability: Capability) -> TaxboxResult<()> {
        AccessService::new(self.storage).require(self.actor, organization_id, capability)?;
        Ok(())
    }

    fn scope(&self, doc_box: &DocBox) -> AuditScope {
        AuditScope::new(self.actor).org(doc_box.organization_id)
    }

    /// Load a box the actor may act on with `capability`
    pub fn get(&self, id: BoxId, capability: Capability) -> TaxboxResult<DocBox> {
        let doc_box = self
            .storage
            .boxes
            .get(id)?
            .ok_or_else(|| TaxboxError::box_not_found(id.to_string()))?;
        self.require(doc_box.organization_id, capability)?;
        Ok(doc_box)
    }

    /// Find a box by number within an organization, or by full or short ID
    pub fn find(&self, organization_id: Option<OrganizationId>, identifier: &str) -> TaxboxResult<DocBox> {
        if let Some(org) = organization_id {
            if let Some(doc_box) = self.storage.boxes.get_by_number(org, identifier)? {
                self.require(org, Capability::View)?;
                return Ok(doc_box);
            }
        }
        if let Ok(id) = identifier.parse::<BoxId>() {
            return self.get(id, Capability::View);
        }
        let found = self
            .storage
            .boxes
            .find_by_short_id(organization_id, identifier)?;
        match found {
            Some(doc_box) => {
                self.require(doc_box.organization_id, Capability::View)?;
                Ok(doc_box)
            }
            None => Err(TaxboxError::box_not_found(identifier)),
        }
    }

    /// Check that catalog references belong to the organization and are usable
    fn check_references(
        &self,
        organization_id: OrganizationId,
        box_type: BoxType,
        contact_id: Option<ContactId>,
        category_id: Option<CategoryId>,
        cost_center_id: Option<CostCenterId>,
    ) -> TaxboxResult<Option<Contact>> {
        let contact = match contact_id {
            Some(id) => {
                let contact = self
                    .storage
                    .catalog
                    .contacts
                    .get(id)?
                    .filter(|c| c.organization_id == organization_id)
                    .ok_or_else(|| TaxboxError::NotFound {
                        entity_type: "Contact",
                        identifier: id.to_string(),
                    })?;
                if contact.archived {
                    return Err(TaxboxError::Validation(format!(
                        "Contact '{}' is archived",
                        contact.name
                    )));
                }
                Some(contact)
            }
            None => None,
        };

        if let Some(id) = category_id {
            let category = self
                .storage
                .catalog
                .categories
                .get(id)?
                .filter(|c| c.organization_id == organization_id)
                .ok_or_else(|| TaxboxError::NotFound {
                    entity_type: "Category",
                    identifier: id.to_string(),
                })?;
            if category.box_type != box_type {
                return Err(TaxboxError::Validation(format!(
                    "Category '{}' is for {} boxes",
                    category.name, category.box_type
                )));
            }
            if category.archived {
                return Err(TaxboxError::Validation(format!(
                    "Category '{}' is archived",
                    category.name
                )));
            }
        }

        if let Some(id) = cost_center_id {
            let cost_center = self
                .storage
                .catalog
                .cost_centers
                .get(id)?
                .filter(|c| c.organization_id == organization_id)
                .ok_or_else(|| TaxboxError::NotFound {
                    entity_type: "Cost center",
                    identifier: id.to_string(),
                })?;
            if cost_center.archived {
                return Err(TaxboxError::Validation(format!(
                    "Cost center '{}' is archived",
                    cost_center.code
                )));
            }
        }

        Ok(contact)
    }

    pub fn create(&self, input: NewBox) -> TaxboxResult<DocBox> {
        self.require(input.organization_id, Capability::Edit)?;
        if self.storage.organizations.get(input.organization_id)?.is_none() {
            return Err(TaxboxError::organization_not_found(input.organization_id.to_string()));
        }
        let contact = self.check_references(
            input.organization_id,
            input.box_type,
            input.contact_id,
            input.category_id,
            input.cost_center_id,
        )?;

        let seq = self.storage.boxes.next_sequence(
            input.organization_id,
            input.box_type,
            input.document_date,
        )?;
        let number = format_box_number(input.box_type, input.document_date, seq);

        let mut doc_box = DocBox::new(
            input.organization_id,
            number,
            input.box_type,
            input.title,
            input.document_date,
            input.total_amount,
            self.actor,
        );
        doc_box.contact_id = input.contact_id;
        doc_box.category_id = input.category_id;
        doc_box.cost_center_id = input.cost_center_id;
        doc_box.due_date = input.due_date;
        doc_box.reference = input.reference.filter(|r| !r.trim().is_empty());

        let wht_rate = input
            .wht_rate_bp
            .or_else(|| contact.as_ref().and_then(|c| c.default_wht_rate_bp))
            .unwrap_or(0);
        doc_box.set_taxes(
            input.has_vat,
            input.vat_inclusive,
            input.vat_rate_bp.unwrap_or(self.storage.settings.default_vat_rate_bp),
            input.has_wht,
            wht_rate,
        );
        doc_box.validate().map_err(box_error)?;

        self.storage.boxes.upsert(doc_box.clone())?;
        self.storage.boxes.save()?;
        self.storage.log_create(
            self.scope(&doc_box),
            EntityType::Box,
            doc_box.id.to_string(),
            Some(doc_box.box_number.clone()),
            &doc_box,
        )?;

        tracing::info!(
            box_number = %doc_box.box_number,
            total = %doc_box.total_amount,
            vat = %doc_box.vat_amount,
            wht = %doc_box.wht_amount,
            "box created"
        );
        Ok(doc_box)
    }

    pub fn update(&self, id: BoxId, update: BoxUpdate) -> TaxboxResult<DocBox> {
        let mut doc_box = self.get(id, Capability::Edit)?;
        if doc_box.is_locked() {
            return Err(TaxboxError::Locked(format!(
                "{} is completed; reopen it to edit",
                doc_box.box_number
            )));
        }
        let before = doc_box.clone();

        let contact = self.check_references(
            doc_box.organization_id,
            doc_box.box_type,
            update.contact_id.or(doc_box.contact_id),
            update.category_id.or(doc_box.category_id),
            update.cost_center_id.or(doc_box.cost_center_id),
        )?;

        if let Some(title) = &update.title {
            doc_box.title = title.trim().to_string();
        }
        if let Some(date) = update.document_date {
            // The number embeds the document month
            if box_number_sequence(&doc_box.box_number, doc_box.box_type, date).is_none() {
                let seq = self
                    .storage
                    .boxes
                    .next_sequence(doc_box.organization_id, doc_box.box_type, date)?;
                doc_box.box_number = format_box_number(doc_box.box_type, date, seq);
            }
            doc_box.document_date = date;
        }
        if update.due_date.is_some() {
            doc_box.due_date = update.due_date;
        }
        if let Some(reference) = &update.reference {
            doc_box.reference = Some(reference.trim().to_string()).filter(|r| !r.is_empty());
        }
        if update.contact_id.is_some() {
            doc_box.contact_id = update.contact_id;
        }
        if update.category_id.is_some() {
            doc_box.category_id = update.category_id;
        }
        if update.cost_center_id.is_some() {
            doc_box.cost_center_id = update.cost_center_id;
        }

        if update.changes_amounts() {
            if let Some(total) = update.total_amount {
                doc_box.total_amount = total;
            }
            let has_wht = update.has_wht.unwrap_or(doc_box.has_wht);
            let wht_rate = update
                .wht_rate_bp
                .or(Some(doc_box.wht_rate_bp).filter(|r| *r > 0))
                .or_else(|| contact.as_ref().and_then(|c| c.default_wht_rate_bp))
                .unwrap_or(0);
            doc_box.set_taxes(
                update.has_vat.unwrap_or(doc_box.has_vat),
                update.vat_inclusive.unwrap_or(doc_box.vat_inclusive),
                update.vat_rate_bp.unwrap_or(doc_box.vat_rate_bp),
                has_wht,
                wht_rate,
            );
        }
        sync_document_statuses(self.storage, &mut doc_box)?;
        doc_box.validate().map_err(box_error)?;
        doc_box.touch();

        self.storage.boxes.upsert(doc_box.clone())?;
        self.storage.boxes.save()?;
        self.storage.log_update(
            self.scope(&doc_box),
            EntityType::Box,
            doc_box.id.to_string(),
            Some(doc_box.box_number.clone()),
            &before,
            &doc_box,
            None,
        )?;
        Ok(doc_box)
    }

    /// Apply a status change and persist it
    fn move_to(
        &self,
        id: BoxId,
        next: BoxStatus,
        capability: Capability,
        prepare: impl FnOnce(&mut DocBox) -> TaxboxResult<()>,
    ) -> TaxboxResult<DocBox> {
        let mut doc_box = self.get(id, capability)?;
        let before = doc_box.clone();
        doc_box.transition(next).map_err(box_error)?;
        prepare(&mut doc_box)?;

        self.storage.boxes.upsert(doc_box.clone())?;
        self.storage.boxes.save()?;
        self.storage.log_update(
            self.scope(&doc_box),
            EntityType::Box,
            doc_box.id.to_string(),
            Some(doc_box.box_number.clone()),
            &before,
            &doc_box,
            Some(format!("status: {} -> {}", before.status, doc_box.status)),
        )?;

        tracing::info!(
            box_number = %doc_box.box_number,
            from = %before.status,
            to = %doc_box.status,
            "box status changed"
        );
        Ok(doc_box)
    }

    /// Send a draft for review; at least one file must be attached
    pub fn submit(&self, id: BoxId) -> TaxboxResult<DocBox> {
        let has_files = self
            .storage
            .documents
            .get_by_box(id)?
            .iter()
            .any(|d| d.has_files());
        self.move_to(id, BoxStatus::Pending, Capability::Edit, |doc_box| {
            if has_files {
                Ok(())
            } else {
                Err(TaxboxError::Validation(format!(
                    "{} has no attached files",
                    doc_box.box_number
                )))
            }
        })
    }

    pub fn withdraw(&self, id: BoxId) -> TaxboxResult<DocBox> {
        self.move_to(id, BoxStatus::Draft, Capability::Edit, |_| Ok(()))
    }

    /// Send a box back to the submitter asking for more documents
    pub fn request_docs(&self, id: BoxId, reason: &str) -> TaxboxResult<DocBox> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(TaxboxError::Validation(
                "A reason is required when requesting documents".into(),
            ));
        }
        self.move_to(id, BoxStatus::NeedDocs, Capability::Review, move |doc_box| {
            doc_box.need_docs_reason = Some(reason);
            Ok(())
        })
    }

    pub fn resubmit(&self, id: BoxId) -> TaxboxResult<DocBox> {
        self.move_to(id, BoxStatus::Pending, Capability::Edit, |_| Ok(()))
    }

    pub fn complete(&self, id: BoxId) -> TaxboxResult<DocBox> {
        self.move_to(id, BoxStatus::Completed, Capability::Review, |_| Ok(()))
    }

    pub fn reopen(&self, id: BoxId) -> TaxboxResult<DocBox> {
        self.move_to(id, BoxStatus::Pending, Capability::Review, |_| Ok(()))
    }

    fn save_sub_status(&self, before: &DocBox, doc_box: &DocBox, diff: String) -> TaxboxResult<()> {
        self.storage.boxes.upsert(doc_box.clone())?;
        self.storage.boxes.save()?;
        self.storage.log_update(
            self.scope(doc_box),
            EntityType::Box,
            doc_box.id.to_string(),
            Some(doc_box.box_number.clone()),
            before,
            doc_box,
            Some(diff),
        )?;
        Ok(())
    }

    /// Record that this box's VAT was reported on a PP.30 return
    pub fn mark_vat_filed(&self, id: BoxId) -> TaxboxResult<DocBox> {
        let mut doc_box = self.get(id, Capability::Review)?;
        match doc_box.vat_status {
            VatStatus::NotRequired => {
                return Err(TaxboxError::Validation(format!(
                    "{} has no VAT",
                    doc_box.box_number
                )))
            }
            VatStatus::Filed => {
                return Err(TaxboxError::Validation(format!(
                    "VAT for {} is already filed",
                    doc_box.box_number
                )))
            }
            VatStatus::Pending | VatStatus::Received => {}
        }
        let before = doc_box.clone();
        doc_box.vat_status = VatStatus::Filed;
        doc_box.touch();
        self.save_sub_status(
            &before,
            &doc_box,
            format!("vat_status: {} -> {}", before.vat_status, doc_box.vat_status),
        )?;
        Ok(doc_box)
    }

    /// Record that this box's WHT was reported on a PND.3/PND.53 return
    pub fn mark_wht_filed(&self, id: BoxId) -> TaxboxResult<DocBox> {
        let mut doc_box = self.get(id, Capability::Review)?;
        match doc_box.wht_status {
            WhtStatus::NotRequired => {
                return Err(TaxboxError::Validation(format!(
                    "{} has no withholding tax",
                    doc_box.box_number
                )))
            }
            WhtStatus::Filed => {
                return Err(TaxboxError::Validation(format!(
                    "WHT for {} is already filed",
                    doc_box.box_number
                )))
            }
            WhtStatus::Pending | WhtStatus::Issued => {}
        }
        let before = doc_box.clone();
        doc_box.wht_status = WhtStatus::Filed;
        doc_box.touch();
        self.save_sub_status(
            &before,
            &doc_box,
            format!("wht_status: {} -> {}", before.wht_status, doc_box.wht_status),
        )?;
        Ok(doc_box)
    }

    /// Hand a box to a user who can see the organization, or clear the assignee
    pub fn assign(&self, id: BoxId, assignee: Option<UserId>) -> TaxboxResult<DocBox> {
        let mut doc_box = self.get(id, Capability::Edit)?;
        if let Some(user_id) = assignee {
            let role = AccessService::new(self.storage).effective_role(user_id, doc_box.organization_id)?;
            if !role.is_some_and(|r| Capability::Edit.permits(r)) {
                return Err(TaxboxError::Validation(format!(
                    "{} cannot work on boxes of this organization",
                    user_id
                )));
            }
        }
        let before = doc_box.clone();
        doc_box.assignee = assignee;
        doc_box.touch();
        self.storage.boxes.upsert(doc_box.clone())?;
        self.storage.boxes.save()?;
        self.storage.log_update(
            self.scope(&doc_box),
            EntityType::Box,
            doc_box.id.to_string(),
            Some(doc_box.box_number.clone()),
            &before,
            &doc_box,
            None,
        )?;
        Ok(doc_box)
    }

    /// Delete a draft with its documents, payments and stored files
    pub fn delete(&self, id: BoxId) -> TaxboxResult<DocBox> {
        let doc_box = self.get(id, Capability::Edit)?;
        if doc_box.status != BoxStatus::Draft {
            return Err(TaxboxError::Validation(format!(
                "Only draft boxes can be deleted; {} is {}",
                doc_box.box_number, doc_box.status
            )));
        }

        // Box row before its records
        self.storage.boxes.delete(id)?;
        if let Err(e) = self.storage.boxes.save() {
            self.storage.boxes.upsert(doc_box.clone())?;
            return Err(e);
        }

        let documents = self.storage.documents.delete_for_box(id)?;
        self.storage.documents.save()?;
        let payments = self.storage.payments.delete_for_box(id)?;
        self.storage.payments.save()?;
        let unlinked = self.storage.tasks.unlink_box(id)?;
        if unlinked > 0 {
            self.storage.tasks.save()?;
        }

        let dir = self
            .storage
            .paths()
            .box_files_dir(doc_box.organization_id, doc_box.id);
        if dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                tracing::warn!(path = %dir.display(), error = %e, "box files could not be removed");
            }
        }

        self.storage.log_delete(
            self.scope(&doc_box),
            EntityType::Box,
            doc_box.id.to_string(),
            Some(doc_box.box_number.clone()),
            &doc_box,
        )?;
        tracing::info!(
            box_number = %doc_box.box_number,
            documents = documents.len(),
            payments = payments.len(),
            "box deleted"
        );
        Ok(doc_box)
    }

    fn visible_organizations(&self) -> TaxboxResult<Vec<OrganizationId>> {
        let access = AccessService::new(self.storage);
        let mut ids = Vec::new();
        for org in self.storage.organizations.get_all()? {
            if access.effective_role(self.actor, org.id)?.is_some() {
                ids.push(org.id);
            }
        }
        Ok(ids)
    }

    /// Boxes matching `filter`, newest document date first
    pub fn list(&self, filter: &BoxFilter) -> TaxboxResult<Vec<DocBox>> {
        let organizations = match filter.organization_id {
            Some(org) => {
                self.require(org, Capability::View)?;
                vec![org]
            }
            None => self.visible_organizations()?,
        };
        let needle = filter
            .text
            .as_ref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        let mut result = Vec::new();
        for org in organizations {
            for doc_box in self.storage.boxes.get_by_organization(org)? {
                if filter.status.is_some_and(|s| s != doc_box.status)
                    || filter.box_type.is_some_and(|t| t != doc_box.box_type)
                    || filter.from.is_some_and(|d| doc_box.document_date < d)
                    || filter.to.is_some_and(|d| doc_box.document_date > d)
                    || filter
                        .payment_status
                        .is_some_and(|p| p != doc_box.payment_status)
                {
                    continue;
                }
                if let Some(needle) = &needle {
                    if !self.matches_text(&doc_box, needle)? {
                        continue;
                    }
                }
                result.push(doc_box);
            }
        }

        result.sort_by(|a, b| {
            b.document_date
                .cmp(&a.document_date)
                .then_with(|| b.box_number.cmp(&a.box_number))
        });
        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }
        Ok(result)
    }

    fn matches_text(&self, doc_box: &DocBox, needle: &str) -> TaxboxResult<bool> {
        if doc_box.box_number.to_lowercase().contains(needle)
            || doc_box.title.to_lowercase().contains(needle)
            || doc_box
                .reference
                .as_deref()
                .is_some_and(|r| r.to_lowercase().contains(needle))
        {
            return Ok(true);
        }
        let contact_name = match doc_box.contact_id {
            Some(id) => self.storage.catalog.contacts.get(id)?.map(|c| c.name),
            None => None,
        };
        Ok(contact_name.is_some_and(|n| n.to_lowercase().contains(needle)))
    }

    /// Required document types not yet on file
    pub fn missing_documents(&self, id: BoxId) -> TaxboxResult<Vec<Requirement>> {
        let doc_box = self.get(id, Capability::View)?;
        let documents = self.storage.documents.get_by_box(id)?;
        Ok(missing_documents(&doc_box, &documents))
    }

    pub fn detail(&self, id: BoxId) -> TaxboxResult<BoxDetail> {
        let doc_box = self.get(id, Capability::View)?;
        let contact = match doc_box.contact_id {
            Some(contact_id) => self.storage.catalog.contacts.get(contact_id)?,
            None => None,
        };
        let mut documents = self.storage.documents.get_by_box(id)?;
        documents.sort_by_key(|d| d.doc_type);
        let payments = self.storage.payments.get_by_box(id)?;
        let missing = missing_documents(&doc_box, &documents);
        Ok(BoxDetail {
            doc_box,
            contact,
            documents,
            payments,
            missing,
        })
    }
}
