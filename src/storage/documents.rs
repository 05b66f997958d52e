//! Document slot repository, persisted to documents.json

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{BoxId, DocType, Document, DocumentId, SubDocumentId};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for Document {
    type Key = DocumentId;

    fn key(&self) -> DocumentId {
        self.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DocumentData {
    documents: Vec<Document>,
}

pub struct DocumentRepository {
    path: PathBuf,
    documents: Table<Document>,
}

impl DocumentRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            documents: Table::new(),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: DocumentData = read_json(&self.path)?;
        self.documents.replace_all(file_data.documents)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let documents = self.documents.sorted_by_key(|d| (d.box_id, d.doc_type))?;
        write_json_atomic(&self.path, &DocumentData { documents })
    }

    pub fn get(&self, id: DocumentId) -> Result<Option<Document>, TaxboxError> {
        self.documents.get(id)
    }

    /// Slots of a box, ordered by document type
    pub fn get_by_box(&self, box_id: BoxId) -> Result<Vec<Document>, TaxboxError> {
        let mut docs = self.documents.filter(|d| d.box_id == box_id)?;
        docs.sort_by_key(|d| d.doc_type);
        Ok(docs)
    }

    pub fn slot(&self, box_id: BoxId, doc_type: DocType) -> Result<Option<Document>, TaxboxError> {
        self.documents
            .find(|d| d.box_id == box_id && d.doc_type == doc_type)
    }

    /// The slot holding an uploaded file
    pub fn find_by_file(&self, file_id: SubDocumentId) -> Result<Option<Document>, TaxboxError> {
        self.documents.find(|d| d.find_file(file_id).is_some())
    }

    pub fn upsert(&self, document: Document) -> Result<(), TaxboxError> {
        self.documents.upsert(document)
    }

    pub fn delete(&self, id: DocumentId) -> Result<Option<Document>, TaxboxError> {
        self.documents.remove(id)
    }

    pub fn delete_for_box(&self, box_id: BoxId) -> Result<Vec<Document>, TaxboxError> {
        self.documents.remove_where(|d| d.box_id == box_id)
    }

    pub fn get_all(&self) -> Result<Vec<Document>, TaxboxError> {
        self.documents.sorted_by_key(|d| (d.box_id, d.doc_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubDocument, UserId};
    use tempfile::TempDir;

    #[test]
    fn test_slot_and_file_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let repo = DocumentRepository::new(temp_dir.path().join("documents.json"));
        let box_id = BoxId::new();

        let mut doc = Document::new(box_id, DocType::TaxInvoice);
        let file = SubDocument::new("inv.pdf", "x/inv.pdf", 3, UserId::new());
        let file_id = file.id;
        doc.files.push(file);
        repo.upsert(doc.clone()).unwrap();
        repo.upsert(Document::new(box_id, DocType::Receipt)).unwrap();

        assert_eq!(repo.slot(box_id, DocType::TaxInvoice).unwrap().map(|d| d.id), Some(doc.id));
        assert!(repo.slot(box_id, DocType::Invoice).unwrap().is_none());
        assert_eq!(repo.find_by_file(file_id).unwrap().map(|d| d.id), Some(doc.id));

        let types: Vec<DocType> = repo.get_by_box(box_id).unwrap().iter().map(|d| d.doc_type).collect();
        assert_eq!(types, vec![DocType::Receipt, DocType::TaxInvoice]);

        assert_eq!(repo.delete_for_box(box_id).unwrap().len(), 2);
        assert!(repo.get_all().unwrap().is_empty());
    }
}
