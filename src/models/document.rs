//! Document slots and uploaded files
//!
//! A box holds at most one `Document` per `DocType`; each slot carries the
//! uploaded files (`SubDocument`) classified as that type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::doc_box::{BoxType, DocBox};
use super::ids::{BoxId, DocumentId, SubDocumentId, UserId};

/// Classification of an uploaded source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    Receipt,
    TaxInvoice,
    Invoice,
    WhtCertificate,
    PaymentSlip,
    Quotation,
    Contract,
    Other,
}

impl DocType {
    pub fn all() -> &'static [DocType] {
        &[
            Self::Receipt,
            Self::TaxInvoice,
            Self::Invoice,
            Self::WhtCertificate,
            Self::PaymentSlip,
            Self::Quotation,
            Self::Contract,
            Self::Other,
        ]
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "receipt" => Some(Self::Receipt),
            "tax_invoice" | "taxinvoice" => Some(Self::TaxInvoice),
            "invoice" => Some(Self::Invoice),
            "wht_certificate" | "wht" | "50tawi" => Some(Self::WhtCertificate),
            "payment_slip" | "slip" => Some(Self::PaymentSlip),
            "quotation" | "quote" => Some(Self::Quotation),
            "contract" => Some(Self::Contract),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Receipt => "Receipt",
            Self::TaxInvoice => "Tax Invoice",
            Self::Invoice => "Invoice",
            Self::WhtCertificate => "WHT Certificate",
            Self::PaymentSlip => "Payment Slip",
            Self::Quotation => "Quotation",
            Self::Contract => "Contract",
            Self::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// One uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubDocument {
    pub id: SubDocumentId,
    /// Original file name as uploaded
    pub file_name: String,
    /// Path relative to the store's files directory
    pub stored_path: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_by: UserId,
    pub uploaded_at: DateTime<Utc>,
}

impl SubDocument {
    pub fn new(
        file_name: impl Into<String>,
        stored_path: impl Into<String>,
        size_bytes: u64,
        uploaded_by: UserId,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            id: SubDocumentId::new(),
            mime_type: mime_for(&file_name).to_string(),
            file_name,
            stored_path: stored_path.into(),
            size_bytes,
            uploaded_by,
            uploaded_at: Utc::now(),
        }
    }
}

/// Classification slot of a box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub box_id: BoxId,
    pub doc_type: DocType,
    #[serde(default)]
    pub files: Vec<SubDocument>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(box_id: BoxId, doc_type: DocType) -> Self {
        Self {
            id: DocumentId::new(),
            box_id,
            doc_type,
            files: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn find_file(&self, id: SubDocumentId) -> Option<&SubDocument> {
        self.files.iter().find(|f| f.id == id)
    }

    /// Remove a file from the slot, returning it
    pub fn take_file(&mut self, id: SubDocumentId) -> Option<SubDocument> {
        let index = self.files.iter().position(|f| f.id == id)?;
        Some(self.files.remove(index))
    }
}

/// A requirement satisfied by any one of the listed types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub any_of: Vec<DocType>,
}

impl Requirement {
    fn one(doc_type: DocType) -> Self {
        Self {
            any_of: vec![doc_type],
        }
    }

    fn either(a: DocType, b: DocType) -> Self {
        Self { any_of: vec![a, b] }
    }

    pub fn is_met_by(&self, present: &[DocType]) -> bool {
        self.any_of.iter().any(|t| present.contains(t))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.any_of.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", names.join(" or "))
    }
}

/// Documents a box needs before it can be booked
pub fn required_documents(doc_box: &DocBox) -> Vec<Requirement> {
    let mut required = Vec::new();
    match doc_box.box_type {
        BoxType::Expense => {
            if doc_box.has_vat {
                required.push(Requirement::one(DocType::TaxInvoice));
            } else {
                required.push(Requirement::either(DocType::Receipt, DocType::TaxInvoice));
            }
            if doc_box.has_wht {
                required.push(Requirement::one(DocType::WhtCertificate));
            }
            if doc_box.paid_amount.is_positive() {
                required.push(Requirement::one(DocType::PaymentSlip));
            }
        }
        BoxType::Income => {
            required.push(Requirement::either(DocType::Invoice, DocType::TaxInvoice));
            if doc_box.has_wht {
                required.push(Requirement::one(DocType::WhtCertificate));
            }
        }
    }
    required
}

/// Requirements not met by the box's documents (only slots with files count)
pub fn missing_documents(doc_box: &DocBox, documents: &[Document]) -> Vec<Requirement> {
    let present: Vec<DocType> = documents
        .iter()
        .filter(|d| d.box_id == doc_box.id && d.has_files())
        .map(|d| d.doc_type)
        .collect();

    required_documents(doc_box)
        .into_iter()
        .filter(|r| !r.is_met_by(&present))
        .collect()
}

/// Guess a MIME type from a file extension
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ids::OrganizationId;
    use crate::models::money::Money;
    use chrono::NaiveDate;

    fn expense_box() -> DocBox {
        DocBox::new(
            OrganizationId::new(),
            "EXP-202501-0001",
            BoxType::Expense,
            "Printer paper",
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            Money::from_satang(107_000),
            UserId::new(),
        )
    }

    fn slot_with_file(box_id: BoxId, doc_type: DocType) -> Document {
        let mut doc = Document::new(box_id, doc_type);
        doc.files
            .push(SubDocument::new("scan.pdf", "a/b/scan.pdf", 10, UserId::new()));
        doc
    }

    #[test]
    fn test_expense_without_vat_accepts_receipt() {
        let b = expense_box();
        let missing = missing_documents(&b, &[]);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].to_string(), "Receipt or Tax Invoice");

        let docs = vec![slot_with_file(b.id, DocType::Receipt)];
        assert!(missing_documents(&b, &docs).is_empty());
    }

    #[test]
    fn test_expense_with_vat_wht_and_payment() {
        let mut b = expense_box();
        b.set_taxes(true, true, 700, true, 300);
        b.apply_paid(Money::from_satang(1_000));

        let docs = vec![slot_with_file(b.id, DocType::Receipt)];
        let missing = missing_documents(&b, &docs);
        let types: Vec<DocType> = missing.iter().flat_map(|r| r.any_of.clone()).collect();
        assert_eq!(
            types,
            vec![DocType::TaxInvoice, DocType::WhtCertificate, DocType::PaymentSlip]
        );
    }

    #[test]
    fn test_empty_slot_does_not_count() {
        let b = expense_box();
        let docs = vec![Document::new(b.id, DocType::Receipt)];
        assert_eq!(missing_documents(&b, &docs).len(), 1);
    }

    #[test]
    fn test_income_requires_invoice() {
        let mut b = expense_box();
        b.box_type = BoxType::Income;
        let docs = vec![slot_with_file(b.id, DocType::TaxInvoice)];
        assert!(missing_documents(&b, &docs).is_empty());
    }

    #[test]
    fn test_take_file() {
        let mut doc = slot_with_file(BoxId::new(), DocType::Other);
        let id = doc.files[0].id;
        assert!(doc.find_file(id).is_some());
        assert!(doc.take_file(id).is_some());
        assert!(!doc.has_files());
        assert!(doc.take_file(id).is_none());
    }

    #[test]
    fn test_mime_and_parse() {
        assert_eq!(mime_for("Scan.PDF"), "application/pdf");
        assert_eq!(mime_for("noext"), "application/octet-stream");
        assert_eq!(DocType::parse("tax-invoice"), Some(DocType::TaxInvoice));
        assert_eq!(DocType::parse("bogus"), None);
    }
}
