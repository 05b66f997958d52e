//! Document service
//!
//! Files are copied into the store under `files/{organization}/{box}/` and
//! filed into one classification slot per document type. Attaching or
//! removing a tax invoice or WHT certificate moves the box's sub-statuses.

use std::path::Path;

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{BoxId, DocBox, DocType, Document, SubDocument, SubDocumentId, UserId};
use crate::storage::{write_bytes_atomic, AuditScope, Storage};

use super::access::{AccessService, Capability};

/// Re-derive VAT/WHT sub-statuses from the files currently filed on a box
pub(crate) fn sync_document_statuses(storage: &Storage, doc_box: &mut DocBox) -> TaxboxResult<()> {
    let documents = storage.documents.get_by_box(doc_box.id)?;
    let has = |t: DocType| documents.iter().any(|d| d.doc_type == t && d.has_files());
    doc_box.refresh_document_statuses(has(DocType::TaxInvoice), has(DocType::WhtCertificate));
    Ok(())
}

/// Keep only the final path component and drop characters unsafe in file names
fn safe_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    if cleaned.trim().is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

pub struct DocumentService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> DocumentService<'a> {
    pub fn new(storage: &'a Storage, actor: UserId) -> Self {
        Self { storage, actor }
    }

    fn load_box(&self, box_id: BoxId, capability: Capability) -> TaxboxResult<DocBox> {
        let doc_box = self
            .storage
            .boxes
            .get(box_id)?
            .ok_or_else(|| TaxboxError::box_not_found(box_id.to_string()))?;
        AccessService::new(self.storage).require(self.actor, doc_box.organization_id, capability)?;
        Ok(doc_box)
    }

    fn editable_box(&self, box_id: BoxId) -> TaxboxResult<DocBox> {
        let doc_box = self.load_box(box_id, Capability::Edit)?;
        if doc_box.is_locked() {
            return Err(TaxboxError::Locked(format!(
                "{} is completed; reopen it to change documents",
                doc_box.box_number
            )));
        }
        Ok(doc_box)
    }

    /// Save a box after its documents changed, if its sub-statuses moved
    fn refresh_box(&self, mut doc_box: DocBox) -> TaxboxResult<DocBox> {
        let before = doc_box.clone();
        sync_document_statuses(self.storage, &mut doc_box)?;
        if before.vat_status != doc_box.vat_status || before.wht_status != doc_box.wht_status {
            doc_box.touch();
            self.storage.boxes.upsert(doc_box.clone())?;
            self.storage.boxes.save()?;
            self.storage.log_update(
                AuditScope::new(self.actor).org(doc_box.organization_id),
                EntityType::Box,
                doc_box.id.to_string(),
                Some(doc_box.box_number.clone()),
                &before,
                &doc_box,
                None,
            )?;
        }
        Ok(doc_box)
    }

    /// Copy a file from disk into a box
    pub fn attach(&self, box_id: BoxId, doc_type: DocType, source: &Path) -> TaxboxResult<SubDocument> {
        let bytes = std::fs::read(source).map_err(|e| {
            TaxboxError::Io(format!("Failed to read {}: {}", source.display(), e))
        })?;
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.attach_bytes(box_id, doc_type, &name, &bytes)
    }

    /// Store `bytes` as a new file in the box's slot for `doc_type`
    pub fn attach_bytes(
        &self,
        box_id: BoxId,
        doc_type: DocType,
        file_name: &str,
        bytes: &[u8],
    ) -> TaxboxResult<SubDocument> {
        let doc_box = self.editable_box(box_id)?;
        if bytes.is_empty() {
            return Err(TaxboxError::Validation("Cannot attach an empty file".into()));
        }

        let file_name = safe_file_name(file_name);
        let mut document = match self.storage.documents.slot(box_id, doc_type)? {
            Some(existing) => existing,
            None => Document::new(box_id, doc_type),
        };

        let mut sub = SubDocument::new(&file_name, "", bytes.len() as u64, self.actor);
        let stored_name = format!("{}-{}", sub.id.as_uuid().simple(), file_name);
        let full_path = self
            .storage
            .paths()
            .box_files_dir(doc_box.organization_id, box_id)
            .join(&stored_name);
        write_bytes_atomic(&full_path, bytes)?;

        sub.stored_path = full_path
            .strip_prefix(self.storage.paths().files_dir())
            .map_err(|e| TaxboxError::Storage(e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");

        document.files.push(sub.clone());
        self.storage.documents.upsert(document.clone())?;
        self.storage.documents.save()?;
        self.storage.log_create(
            AuditScope::new(self.actor).org(doc_box.organization_id),
            EntityType::Document,
            sub.id.to_string(),
            Some(format!("{} {}", doc_type, sub.file_name)),
            &sub,
        )?;

        tracing::info!(
            box_number = %doc_box.box_number,
            doc_type = %doc_type,
            size = sub.size_bytes,
            "file attached"
        );
        self.refresh_box(doc_box)?;
        Ok(sub)
    }

    /// Remove one file; an emptied slot is dropped
    pub fn remove_file(&self, file_id: SubDocumentId) -> TaxboxResult<SubDocument> {
        let mut document = self
            .storage
            .documents
            .find_by_file(file_id)?
            .ok_or_else(|| TaxboxError::document_not_found(file_id.to_string()))?;
        let doc_box = self.editable_box(document.box_id)?;

        let sub = document
            .take_file(file_id)
            .ok_or_else(|| TaxboxError::document_not_found(file_id.to_string()))?;

        if document.has_files() {
            self.storage.documents.upsert(document.clone())?;
        } else {
            self.storage.documents.delete(document.id)?;
        }
        self.storage.documents.save()?;

        let full_path = self.storage.paths().files_dir().join(&sub.stored_path);
        if let Err(e) = std::fs::remove_file(&full_path) {
            tracing::warn!(path = %full_path.display(), error = %e, "stored file could not be removed");
        }

        self.storage.log_delete(
            AuditScope::new(self.actor).org(doc_box.organization_id),
            EntityType::Document,
            sub.id.to_string(),
            Some(sub.file_name.clone()),
            &sub,
        )?;
        self.refresh_box(doc_box)?;
        Ok(sub)
    }

    /// Move a file into the slot for another document type
    pub fn reclassify(&self, file_id: SubDocumentId, doc_type: DocType) -> TaxboxResult<Document> {
        let mut source = self
            .storage
            .documents
            .find_by_file(file_id)?
            .ok_or_else(|| TaxboxError::document_not_found(file_id.to_string()))?;
        let doc_box = self.editable_box(source.box_id)?;
        if source.doc_type == doc_type {
            return Ok(source);
        }

        let before = source.clone();
        let sub = source
            .take_file(file_id)
            .ok_or_else(|| TaxboxError::document_not_found(file_id.to_string()))?;
        let mut target = match self.storage.documents.slot(source.box_id, doc_type)? {
            Some(existing) => existing,
            None => Document::new(source.box_id, doc_type),
        };
        target.files.push(sub.clone());

        if source.has_files() {
            self.storage.documents.upsert(source)?;
        } else {
            self.storage.documents.delete(source.id)?;
        }
        self.storage.documents.upsert(target.clone())?;
        self.storage.documents.save()?;

        self.storage.log_update(
            AuditScope::new(self.actor).org(doc_box.organization_id),
            EntityType::Document,
            sub.id.to_string(),
            Some(sub.file_name.clone()),
            &before,
            &target,
            Some(format!("doc_type: {} -> {}", before.doc_type, doc_type)),
        )?;
        self.refresh_box(doc_box)?;
        Ok(target)
    }

    pub fn list_for_box(&self, box_id: BoxId) -> TaxboxResult<Vec<Document>> {
        self.load_box(box_id, Capability::View)?;
        let mut documents = self.storage.documents.get_by_box(box_id)?;
        documents.sort_by_key(|d| d.doc_type);
        Ok(documents)
    }

    /// Read back a stored file
    pub fn read_file(&self, file_id: SubDocumentId) -> TaxboxResult<(SubDocument, Vec<u8>)> {
        let document = self
            .storage
            .documents
            .find_by_file(file_id)?
            .ok_or_else(|| TaxboxError::document_not_found(file_id.to_string()))?;
        self.load_box(document.box_id, Capability::View)?;
        let sub = document
            .find_file(file_id)
            .cloned()
            .ok_or_else(|| TaxboxError::document_not_found(file_id.to_string()))?;

        let full_path = self.storage.paths().files_dir().join(&sub.stored_path);
        let bytes = std::fs::read(&full_path).map_err(|e| {
            TaxboxError::Io(format!("Failed to read {}: {}", full_path.display(), e))
        })?;
        Ok((sub, bytes))
    }

    /// Find a file by full or short ID within a box
    pub fn find_file(&self, box_id: BoxId, identifier: &str) -> TaxboxResult<SubDocument> {
        self.list_for_box(box_id)?
            .into_iter()
            .flat_map(|d| d.files)
            .find(|f| f.id.to_string() == identifier || f.id.matches_short(identifier))
            .ok_or_else(|| TaxboxError::document_not_found(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberRole, VatStatus, WhtStatus};
    use crate::services::testutil::Fixture;

    #[test]
    fn test_attach_files_into_slots() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(true, Some(300));
        let svc = DocumentService::new(&fx.storage, fx.owner);

        let invoice = svc
            .attach_bytes(doc_box.id, DocType::TaxInvoice, "inv-001.pdf", b"%PDF-1.4")
            .unwrap();
        assert_eq!(invoice.mime_type, "application/pdf");
        svc.attach_bytes(doc_box.id, DocType::TaxInvoice, "inv-001-p2.pdf", b"%PDF-1.4")
            .unwrap();

        let documents = svc.list_for_box(doc_box.id).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].files.len(), 2);

        let (_, bytes) = svc.read_file(invoice.id).unwrap();
        assert_eq!(bytes, b"%PDF-1.4");

        let stored = fx.storage.boxes.get(doc_box.id).unwrap().unwrap();
        assert_eq!(stored.vat_status, VatStatus::Received);
        assert_eq!(stored.wht_status, WhtStatus::Pending);
    }

    #[test]
    fn test_removing_last_tax_invoice_reverts_vat_status() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(true, None);
        let svc = DocumentService::new(&fx.storage, fx.owner);
        let file = svc
            .attach_bytes(doc_box.id, DocType::TaxInvoice, "inv.jpg", b"jpeg")
            .unwrap();

        svc.remove_file(file.id).unwrap();
        let stored = fx.storage.boxes.get(doc_box.id).unwrap().unwrap();
        assert_eq!(stored.vat_status, VatStatus::Pending);
        assert!(svc.list_for_box(doc_box.id).unwrap().is_empty());
    }

    #[test]
    fn test_reclassify_moves_file_and_updates_wht() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(false, Some(300));
        let svc = DocumentService::new(&fx.storage, fx.owner);
        let file = svc
            .attach_bytes(doc_box.id, DocType::Other, "50tawi.pdf", b"pdf")
            .unwrap();

        let target = svc.reclassify(file.id, DocType::WhtCertificate).unwrap();
        assert_eq!(target.doc_type, DocType::WhtCertificate);
        let stored = fx.storage.boxes.get(doc_box.id).unwrap().unwrap();
        assert_eq!(stored.wht_status, WhtStatus::Issued);
    }

    #[test]
    fn test_file_name_is_sanitized() {
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("ใบกำกับภาษี.pdf"), "ใบกำกับภาษี.pdf");
        assert_eq!(safe_file_name(""), "file");
    }

    #[test]
    fn test_viewer_cannot_attach() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(false, None);
        let viewer = fx.member("viewer@example.com", MemberRole::Viewer);
        let err = DocumentService::new(&fx.storage, viewer)
            .attach_bytes(doc_box.id, DocType::Receipt, "r.png", b"png")
            .unwrap_err();
        assert!(err.is_permission_denied());
    }
}
