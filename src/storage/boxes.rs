//! Box repository, persisted to boxes.json
//!
//! Keeps a per-organization index and enforces box number uniqueness within
//! an organization.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::doc_box::box_number_sequence;
use crate::models::{BoxId, BoxType, DocBox, OrganizationId};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for DocBox {
    type Key = BoxId;

    fn key(&self) -> BoxId {
        self.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BoxData {
    boxes: Vec<DocBox>,
}

pub struct BoxRepository {
    path: PathBuf,
    boxes: Table<DocBox>,
    /// Index: organization -> box ids
    by_organization: RwLock<HashMap<OrganizationId, Vec<BoxId>>>,
}

impl BoxRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            boxes: Table::new(),
            by_organization: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: BoxData = read_json(&self.path)?;

        let mut index = self.by_organization.write().map_err(|e| {
            TaxboxError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        index.clear();
        for b in &file_data.boxes {
            index.entry(b.organization_id).or_default().push(b.id);
        }

        self.boxes.replace_all(file_data.boxes)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let boxes = self
            .boxes
            .sorted_by_key(|b| (b.organization_id, b.box_number.clone()))?;
        write_json_atomic(&self.path, &BoxData { boxes })
    }

    pub fn get(&self, id: BoxId) -> Result<Option<DocBox>, TaxboxError> {
        self.boxes.get(id)
    }

    pub fn get_by_number(
        &self,
        organization_id: OrganizationId,
        box_number: &str,
    ) -> Result<Option<DocBox>, TaxboxError> {
        let number = box_number.trim().to_uppercase();
        Ok(self
            .get_by_organization(organization_id)?
            .into_iter()
            .find(|b| b.box_number == number))
    }

    /// Boxes of one organization, ordered by document date then number
    pub fn get_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<DocBox>, TaxboxError> {
        let ids = {
            let index = self.by_organization.read().map_err(|e| {
                TaxboxError::Storage(format!("Failed to acquire read lock: {}", e))
            })?;
            index.get(&organization_id).cloned().unwrap_or_default()
        };

        let mut boxes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(b) = self.boxes.get(id)? {
                boxes.push(b);
            }
        }
        boxes.sort_by(|a, b| {
            a.document_date
                .cmp(&b.document_date)
                .then_with(|| a.box_number.cmp(&b.box_number))
        });
        Ok(boxes)
    }

    /// Box whose ID starts with `identifier`, optionally within one organization
    pub fn find_by_short_id(
        &self,
        organization_id: Option<OrganizationId>,
        identifier: &str,
    ) -> Result<Option<DocBox>, TaxboxError> {
        self.boxes.find(|b| {
            b.id.matches_short(identifier)
                && organization_id.map_or(true, |org| b.organization_id == org)
        })
    }

    pub fn get_all(&self) -> Result<Vec<DocBox>, TaxboxError> {
        self.boxes.sorted_by_key(|b| (b.document_date, b.box_number.clone()))
    }

    /// Next free sequence number for a type and month within an organization
    pub fn next_sequence(
        &self,
        organization_id: OrganizationId,
        box_type: BoxType,
        document_date: NaiveDate,
    ) -> Result<u32, TaxboxError> {
        let highest = self
            .get_by_organization(organization_id)?
            .iter()
            .filter_map(|b| box_number_sequence(&b.box_number, box_type, document_date))
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    /// Insert or update a box, rejecting a number already used in its organization
    pub fn upsert(&self, doc_box: DocBox) -> Result<(), TaxboxError> {
        if let Some(existing) = self.get_by_number(doc_box.organization_id, &doc_box.box_number)? {
            if existing.id != doc_box.id {
                return Err(TaxboxError::Duplicate {
                    entity_type: "Box",
                    identifier: doc_box.box_number.clone(),
                });
            }
        }

        let mut index = self.by_organization.write().map_err(|e| {
            TaxboxError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        let ids = index.entry(doc_box.organization_id).or_default();
        if !ids.contains(&doc_box.id) {
            ids.push(doc_box.id);
        }
        self.boxes.upsert(doc_box)
    }

    pub fn delete(&self, id: BoxId) -> Result<Option<DocBox>, TaxboxError> {
        let removed = self.boxes.remove(id)?;
        if let Some(b) = &removed {
            let mut index = self.by_organization.write().map_err(|e| {
                TaxboxError::Storage(format!("Failed to acquire write lock: {}", e))
            })?;
            if let Some(ids) = index.get_mut(&b.organization_id) {
                ids.retain(|existing| *existing != id);
            }
        }
        Ok(removed)
    }

    pub fn count(&self) -> Result<usize, TaxboxError> {
        self.boxes.count()
    }
}
