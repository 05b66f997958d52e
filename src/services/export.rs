//! Export service
//!
//! Runs the export pipeline for an organization, saves reusable export
//! profiles and keeps a history of every run.

use chrono::{NaiveDate, Utc};

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::export::{
    map_box, write_bundle, write_csv, write_xlsx, BoxRecord, ExportArtifact, OrganizationSnapshot,
};
use crate::models::{
    BoxId, BoxStatus, DocBox, ExportFormat, ExportHistory, ExportHistoryId, ExportProfile,
    ExportProfileId, ExportTarget, OrganizationId, UserId,
};
use crate::storage::{AuditScope, Storage};

use super::access::{AccessService, Capability};

/// What to export
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub organization_id: OrganizationId,
    pub target: ExportTarget,
    pub format: ExportFormat,
    pub completed_only: bool,
    /// Inclusive document-date range
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub profile_id: Option<ExportProfileId>,
}

impl ExportRequest {
    pub fn new(organization_id: OrganizationId, target: ExportTarget, format: ExportFormat) -> Self {
        Self {
            organization_id,
            target,
            format,
            completed_only: false,
            from: None,
            to: None,
            profile_id: None,
        }
    }

    pub fn from_profile(profile: &ExportProfile) -> Self {
        Self {
            completed_only: profile.include_completed_only,
            profile_id: Some(profile.id),
            ..Self::new(profile.organization_id, profile.target, profile.format)
        }
    }

    fn selects(&self, doc_box: &DocBox) -> bool {
        !(self.completed_only && doc_box.status != BoxStatus::Completed
            || self.from.is_some_and(|d| doc_box.document_date < d)
            || self.to.is_some_and(|d| doc_box.document_date > d))
    }
}

/// Result of an export run
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub artifact: ExportArtifact,
    pub history: ExportHistory,
}

pub struct ExportService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> ExportService<'a> {
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

    pub fn create_profile(
        &self,
        organization_id: OrganizationId,
        name: &str,
        target: ExportTarget,
        format: ExportFormat,
        completed_only: bool,
    ) -> TaxboxResult<ExportProfile> {
        self.require(organization_id, Capability::Manage)?;
        if self
            .storage
            .exports
            .find_profile(organization_id, name)?
            .is_some()
        {
            return Err(TaxboxError::Duplicate {
                entity_type: "Export profile",
                identifier: name.trim().to_string(),
            });
        }

        let mut profile = ExportProfile::new(organization_id, name, target, format);
        profile.include_completed_only = completed_only;
        profile.validate().map_err(TaxboxError::Validation)?;

        self.storage.exports.profiles.upsert(profile.clone())?;
        self.storage.exports.save()?;
        self.storage.log_create(
            self.scope(organization_id),
            EntityType::ExportProfile,
            profile.id.to_string(),
            Some(profile.name.clone()),
            &profile,
        )?;
        Ok(profile)
    }

    pub fn list_profiles(&self, organization_id: OrganizationId) -> TaxboxResult<Vec<ExportProfile>> {
        self.require(organization_id, Capability::View)?;
        self.storage.exports.profiles_of(organization_id)
    }

    /// Find a profile by name or ID within an organization
    pub fn find_profile(
        &self,
        organization_id: OrganizationId,
        identifier: &str,
    ) -> TaxboxResult<ExportProfile> {
        self.require(organization_id, Capability::View)?;
        if let Some(profile) = self.storage.exports.find_profile(organization_id, identifier)? {
            return Ok(profile);
        }
        self.storage
            .exports
            .profiles_of(organization_id)?
            .into_iter()
            .find(|p| p.id.to_string() == identifier || p.id.matches_short(identifier))
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Export profile",
                identifier: identifier.to_string(),
            })
    }

    pub fn delete_profile(&self, id: ExportProfileId) -> TaxboxResult<ExportProfile> {
        let profile = self
            .storage
            .exports
            .profiles
            .get(id)?
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Export profile",
                identifier: id.to_string(),
            })?;
        self.require(profile.organization_id, Capability::Manage)?;

        self.storage.exports.profiles.remove(id)?;
        self.storage.exports.save()?;
        self.storage.log_delete(
            self.scope(profile.organization_id),
            EntityType::ExportProfile,
            profile.id.to_string(),
            Some(profile.name.clone()),
            &profile,
        )?;
        Ok(profile)
    }

    /// Load the boxes an export selects, with their catalog entries and documents
    fn load_records(&self, request: &ExportRequest) -> TaxboxResult<Vec<BoxRecord>> {
        let catalog = &self.storage.catalog;
        let mut records = Vec::new();
        for doc_box in self.storage.boxes.get_by_organization(request.organization_id)? {
            if !request.selects(&doc_box) {
                continue;
            }
            let contact = match doc_box.contact_id {
                Some(id) => catalog.contacts.get(id)?,
                None => None,
            };
            let category = match doc_box.category_id {
                Some(id) => catalog.categories.get(id)?,
                None => None,
            };
            let cost_center = match doc_box.cost_center_id {
                Some(id) => catalog.cost_centers.get(id)?,
                None => None,
            };
            let documents = self.storage.documents.get_by_box(doc_box.id)?;
            records.push(BoxRecord {
                doc_box,
                contact,
                category,
                cost_center,
                documents,
            });
        }
        Ok(records)
    }

    /// Build an export artifact, stamp the exported boxes and record the run
    pub fn run_export(&self, request: &ExportRequest) -> TaxboxResult<ExportOutcome> {
        let org_id = request.organization_id;
        self.require(org_id, Capability::Export)?;
        let organization = self
            .storage
            .organizations
            .get(org_id)?
            .ok_or_else(|| TaxboxError::organization_not_found(org_id.to_string()))?;

        if let (Some(from), Some(to)) = (request.from, request.to) {
            if from > to {
                return Err(TaxboxError::Validation(format!(
                    "Export range starts after it ends ({} > {})",
                    from, to
                )));
            }
        }

        let records = self.load_records(request)?;
        if records.is_empty() {
            return Err(TaxboxError::Validation("No boxes match this export".into()));
        }
        let rows: Vec<_> = records.iter().map(|r| map_box(r, request.target)).collect();

        let now = Utc::now();
        let mut skipped_files = Vec::new();
        let bytes = match request.format {
            ExportFormat::Xlsx => write_xlsx(request.target, &rows)?,
            ExportFormat::Csv => write_csv(request.target, &rows)?,
            ExportFormat::Zip => {
                let files_dir = self.storage.paths().files_dir();
                let bundle = write_bundle(
                    &organization.name,
                    request.target,
                    &records,
                    &rows,
                    now,
                    |file| std::fs::read(files_dir.join(&file.stored_path)),
                )?;
                skipped_files = bundle.manifest.skipped.iter().map(|s| s.label()).collect();
                bundle.bytes
            }
        };

        let file_name = format!(
            "{}-{}-{}.{}",
            organization.tax_id,
            request.target.slug(),
            now.format("%Y%m%d-%H%M%S"),
            request.format.extension()
        );

        let box_ids: Vec<BoxId> = records.iter().map(|r| r.doc_box.id).collect();
        for record in records {
            let mut doc_box = record.doc_box;
            doc_box.exported_at = Some(now);
            self.storage.boxes.upsert(doc_box)?;
        }
        self.storage.boxes.save()?;

        let history = ExportHistory {
            id: ExportHistoryId::new(),
            organization_id: org_id,
            profile_id: request.profile_id,
            target: request.target,
            format: request.format,
            row_count: box_ids.len(),
            box_ids,
            file_name: file_name.clone(),
            skipped_files,
            created_by: self.actor,
            created_at: now,
        };
        self.storage.exports.history.upsert(history.clone())?;
        self.storage.exports.save()?;
        self.storage.log_create(
            self.scope(org_id),
            EntityType::Export,
            history.id.to_string(),
            Some(history.file_name.clone()),
            &history,
        )?;

        tracing::info!(
            organization = %organization.name,
            target = %request.target,
            format = %request.format,
            rows = history.row_count,
            skipped = history.skipped_files.len(),
            "export finished"
        );

        Ok(ExportOutcome {
            artifact: ExportArtifact {
                file_name,
                mime_type: request.format.mime_type().to_string(),
                bytes,
            },
            history,
        })
    }

    pub fn history(&self, organization_id: OrganizationId) -> TaxboxResult<Vec<ExportHistory>> {
        self.require(organization_id, Capability::View)?;
        self.storage.exports.history_of(organization_id)
    }

    /// Everything stored for an organization, for backup or migration
    pub fn snapshot(&self, organization_id: OrganizationId) -> TaxboxResult<OrganizationSnapshot> {
        self.require(organization_id, Capability::Export)?;
        OrganizationSnapshot::collect(self.storage, organization_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{Manifest, MANIFEST_NAME};
    use crate::models::{DocType, MemberRole};
    use crate::services::testutil::{date, Fixture};
    use crate::services::{BoxService, DocumentService};
    use std::io::{Cursor, Read};

    /// A completed box with a receipt attached
    fn completed_box(fx: &Fixture) -> DocBox {
        let doc_box = fx.expense_box(true, Some(300));
        DocumentService::new(&fx.storage, fx.owner)
            .attach_bytes(doc_box.id, DocType::Receipt, "receipt.pdf", b"%PDF")
            .unwrap();
        let boxes = BoxService::new(&fx.storage, fx.owner);
        boxes.submit(doc_box.id).unwrap();
        boxes.complete(doc_box.id).unwrap()
    }

    #[test]
    fn test_run_export_csv_records_history_and_stamps_boxes() {
        let fx = Fixture::new();
        let done = completed_box(&fx);
        let draft = fx.expense_box(false, None);

        let svc = ExportService::new(&fx.storage, fx.owner);
        let outcome = svc
            .run_export(&ExportRequest::new(fx.org, ExportTarget::Generic, ExportFormat::Csv))
            .unwrap();

        assert_eq!(outcome.history.row_count, 2);
        assert!(outcome.artifact.file_name.ends_with(".csv"));
        assert_eq!(outcome.artifact.mime_type, "text/csv");
        let text = String::from_utf8_lossy(&outcome.artifact.bytes).to_string();
        assert!(text.contains(&done.box_number));
        assert!(text.contains(&draft.box_number));

        let stamped = fx.storage.boxes.get(done.id).unwrap().unwrap();
        assert!(stamped.exported_at.is_some());
        assert_eq!(svc.history(fx.org).unwrap().len(), 1);
    }

    #[test]
    fn test_completed_only_and_date_range() {
        let fx = Fixture::new();
        let done = completed_box(&fx);
        fx.expense_box(false, None);

        let svc = ExportService::new(&fx.storage, fx.owner);
        let mut request = ExportRequest::new(fx.org, ExportTarget::Peak, ExportFormat::Xlsx);
        request.completed_only = true;
        let outcome = svc.run_export(&request).unwrap();
        assert_eq!(outcome.history.box_ids, vec![done.id]);
        assert!(outcome.artifact.bytes.starts_with(b"PK"));

        request.from = Some(date(2025, 2, 1));
        let err = svc.run_export(&request).unwrap_err();
        assert!(err.is_validation());

        request.from = Some(date(2025, 3, 1));
        request.to = Some(date(2025, 2, 1));
        assert!(svc.run_export(&request).unwrap_err().is_validation());
    }

    #[test]
    fn test_zip_export_skips_missing_files() {
        let fx = Fixture::new();
        let done = completed_box(&fx);
        let documents = DocumentService::new(&fx.storage, fx.owner);
        let reopened = BoxService::new(&fx.storage, fx.owner).reopen(done.id).unwrap();
        let lost = documents
            .attach_bytes(reopened.id, DocType::TaxInvoice, "invoice.pdf", b"%PDF")
            .unwrap();
        std::fs::remove_file(fx.storage.paths().files_dir().join(&lost.stored_path)).unwrap();

        let outcome = ExportService::new(&fx.storage, fx.owner)
            .run_export(&ExportRequest::new(fx.org, ExportTarget::Express, ExportFormat::Zip))
            .unwrap();
        assert_eq!(
            outcome.history.skipped_files,
            vec![format!("{}/invoice.pdf", done.box_number)]
        );

        let mut archive = zip::ZipArchive::new(Cursor::new(outcome.artifact.bytes)).unwrap();
        let mut manifest = String::new();
        archive
            .by_name(MANIFEST_NAME)
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        let manifest: Manifest = serde_json::from_str(&manifest).unwrap();
        assert_eq!(
            manifest.rows[0].files,
            vec![format!("{}/receipt.pdf", done.box_number)]
        );
        assert!(archive
            .by_name(&format!("{}/receipt.pdf", done.box_number))
            .is_ok());
    }

    #[test]
    fn test_staff_cannot_export() {
        let fx = Fixture::new();
        fx.expense_box(false, None);
        let staff = fx.member("staff@example.com", MemberRole::Staff);
        let err = ExportService::new(&fx.storage, staff)
            .run_export(&ExportRequest::new(fx.org, ExportTarget::Generic, ExportFormat::Csv))
            .unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_profiles() {
        let fx = Fixture::new();
        completed_box(&fx);
        let svc = ExportService::new(&fx.storage, fx.owner);

        let profile = svc
            .create_profile(fx.org, "Monthly PEAK", ExportTarget::Peak, ExportFormat::Csv, true)
            .unwrap();
        assert!(matches!(
            svc.create_profile(fx.org, "monthly peak", ExportTarget::Peak, ExportFormat::Csv, true),
            Err(TaxboxError::Duplicate { .. })
        ));
        assert_eq!(svc.find_profile(fx.org, "MONTHLY PEAK").unwrap().id, profile.id);

        let outcome = svc.run_export(&ExportRequest::from_profile(&profile)).unwrap();
        assert_eq!(outcome.history.profile_id, Some(profile.id));
        assert!(outcome.artifact.file_name.contains("-peak-"));

        svc.delete_profile(profile.id).unwrap();
        assert!(svc.list_profiles(fx.org).unwrap().is_empty());
    }
}
