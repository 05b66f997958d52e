//! Mapping boxes to export rows
//!
//! `map_box` is a pure function of the record and target; everything it
//! reads is loaded up front into a `BoxRecord`.

use crate::models::{
    format_rate, Category, Contact, ContactKind, CostCenter, DocBox, Document, ExportTarget,
    Money, WhtForm,
};

use super::columns::{columns_for, ColumnKey, DateStyle};

/// A box with the catalog entries and documents it refers to
#[derive(Debug, Clone)]
pub struct BoxRecord {
    pub doc_box: DocBox,
    pub contact: Option<Contact>,
    pub category: Option<Category>,
    pub cost_center: Option<CostCenter>,
    pub documents: Vec<Document>,
}

impl BoxRecord {
    pub fn file_count(&self) -> usize {
        self.documents.iter().map(|d| d.files.len()).sum()
    }

    /// Form the WHT on this box is reported on
    pub fn wht_form(&self) -> Option<WhtForm> {
        if !self.doc_box.has_wht {
            return None;
        }
        let kind = self
            .contact
            .as_ref()
            .map(|c| c.kind)
            .unwrap_or(ContactKind::Juristic);
        Some(WhtForm::for_contact(kind))
    }
}

/// One output cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// Written as a number in spreadsheets
    Money(Money),
    Integer(i64),
    Empty,
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    fn opt_text(value: Option<&str>) -> Self {
        value.map(Self::text).unwrap_or(Self::Empty)
    }

    /// Plain-text rendering used by CSV and the manifest
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Money(m) => m.to_plain_string(),
            Self::Integer(n) => n.to_string(),
            Self::Empty => String::new(),
        }
    }
}

pub type ExportRow = Vec<Cell>;

/// Map one box to a row in the target's column order
pub fn map_box(record: &BoxRecord, target: ExportTarget) -> ExportRow {
    let dates = DateStyle::for_target(target);
    let b = &record.doc_box;
    let breakdown = b.breakdown();

    columns_for(target)
        .iter()
        .map(|(key, _)| match key {
            ColumnKey::BoxNumber => Cell::text(b.box_number.as_str()),
            ColumnKey::DocumentDate => Cell::Text(dates.format(b.document_date)),
            ColumnKey::DueDate => b
                .due_date
                .map(|d| Cell::Text(dates.format(d)))
                .unwrap_or(Cell::Empty),
            ColumnKey::BoxType => Cell::Text(b.box_type.to_string()),
            ColumnKey::Title => Cell::text(b.title.as_str()),
            ColumnKey::Reference => Cell::opt_text(b.reference.as_deref()),
            ColumnKey::ContactName => Cell::opt_text(record.contact.as_ref().map(|c| c.name.as_str())),
            ColumnKey::ContactTaxId => {
                Cell::opt_text(record.contact.as_ref().and_then(|c| c.tax_id.as_deref()))
            }
            ColumnKey::ContactBranch => {
                Cell::opt_text(record.contact.as_ref().and_then(|c| c.branch.as_deref()))
            }
            ColumnKey::Category => Cell::opt_text(record.category.as_ref().map(|c| c.name.as_str())),
            ColumnKey::AccountCode => {
                Cell::opt_text(record.category.as_ref().map(|c| c.account_code.as_str()))
            }
            ColumnKey::CostCenter => {
                Cell::opt_text(record.cost_center.as_ref().map(|c| c.code.as_str()))
            }
            ColumnKey::Subtotal => Cell::Money(breakdown.subtotal),
            ColumnKey::VatRate => {
                if b.has_vat {
                    Cell::Text(format_rate(b.vat_rate_bp))
                } else {
                    Cell::Empty
                }
            }
            ColumnKey::VatAmount => Cell::Money(b.vat_amount),
            ColumnKey::Total => Cell::Money(breakdown.gross),
            ColumnKey::WhtRate => {
                if b.has_wht {
                    Cell::Text(format_rate(b.wht_rate_bp))
                } else {
                    Cell::Empty
                }
            }
            ColumnKey::WhtAmount => Cell::Money(b.wht_amount),
            ColumnKey::WhtForm => record
                .wht_form()
                .map(|f| Cell::Text(f.to_string()))
                .unwrap_or(Cell::Empty),
            ColumnKey::NetPayable => Cell::Money(breakdown.net_payable),
            ColumnKey::PaidAmount => Cell::Money(b.paid_amount),
            ColumnKey::PaymentStatus => Cell::Text(b.payment_status.to_string()),
            ColumnKey::Status => Cell::Text(b.status.to_string()),
            ColumnKey::FileCount => Cell::Integer(record.file_count() as i64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoxType, DocType, OrganizationId, SubDocument, UserId};
    use chrono::NaiveDate;

    fn record() -> BoxRecord {
        let org = OrganizationId::new();
        let mut doc_box = DocBox::new(
            org,
            "EXP-202501-0007",
            BoxType::Expense,
            "Consulting fee",
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            Money::from_satang(107_000),
            UserId::new(),
        );
        doc_box.set_taxes(true, true, 700, true, 300);

        let mut contact = Contact::new(org, "Somchai Consulting", ContactKind::Individual);
        contact.tax_id = Some("1234567890121".into());

        let mut document = Document::new(doc_box.id, DocType::Receipt);
        document.files.push(SubDocument::new(
            "receipt.pdf",
            "x/receipt.pdf",
            10,
            UserId::new(),
        ));

        BoxRecord {
            doc_box,
            contact: Some(contact),
            category: Some(Category::new(org, "Professional fees", BoxType::Expense, "5320")),
            cost_center: None,
            documents: vec![document],
        }
    }

    fn cell(target: ExportTarget, key: ColumnKey, row: &ExportRow) -> Cell {
        let index = columns_for(target)
            .iter()
            .position(|(k, _)| *k == key)
            .unwrap();
        row[index].clone()
    }

    #[test]
    fn test_generic_row() {
        let rec = record();
        let row = map_box(&rec, ExportTarget::Generic);
        assert_eq!(row.len(), columns_for(ExportTarget::Generic).len());
        assert_eq!(row[0], Cell::Text("EXP-202501-0007".into()));
        let t = ExportTarget::Generic;
        assert_eq!(cell(t, ColumnKey::DocumentDate, &row).to_text(), "2025-01-31");
        assert_eq!(cell(t, ColumnKey::Subtotal, &row), Cell::Money(Money::from_satang(100_000)));
        assert_eq!(cell(t, ColumnKey::VatAmount, &row), Cell::Money(Money::from_satang(7_000)));
        assert_eq!(cell(t, ColumnKey::WhtAmount, &row), Cell::Money(Money::from_satang(3_000)));
        assert_eq!(cell(t, ColumnKey::NetPayable, &row).to_text(), "1040.00");
        assert_eq!(cell(t, ColumnKey::FileCount, &row), Cell::Integer(1));
        assert_eq!(cell(t, ColumnKey::CostCenter, &row), Cell::Empty);
    }

    #[test]
    fn test_express_uses_buddhist_era_and_form() {
        let rec = record();
        let t = ExportTarget::Express;
        let row = map_box(&rec, t);
        assert_eq!(cell(t, ColumnKey::DocumentDate, &row).to_text(), "31/01/2568");
        assert_eq!(cell(t, ColumnKey::WhtForm, &row).to_text(), "PND.3");
        assert_eq!(cell(t, ColumnKey::AccountCode, &row).to_text(), "5320");
    }

    #[test]
    fn test_peak_rates_and_dates() {
        let rec = record();
        let t = ExportTarget::Peak;
        let row = map_box(&rec, t);
        assert_eq!(cell(t, ColumnKey::DocumentDate, &row).to_text(), "31/01/2025");
        assert_eq!(cell(t, ColumnKey::VatRate, &row).to_text(), "7%");
        assert_eq!(cell(t, ColumnKey::WhtRate, &row).to_text(), "3%");
        assert_eq!(cell(t, ColumnKey::ContactTaxId, &row).to_text(), "1234567890121");
    }

    #[test]
    fn test_mapping_is_pure() {
        let rec = record();
        for target in ExportTarget::all() {
            assert_eq!(map_box(&rec, *target), map_box(&rec, *target));
        }
    }
}
