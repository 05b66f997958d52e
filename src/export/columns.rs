//! Column dictionaries for each export target
//!
//! Each target lists its columns in output order. PEAK and EXPRESS import
//! sheets use Thai headers and day-first dates; EXPRESS also expects
//! Buddhist Era years.

use chrono::{Datelike, NaiveDate};

use crate::models::ExportTarget;

/// A value a column can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKey {
    BoxNumber,
    DocumentDate,
    DueDate,
    BoxType,
    Title,
    Reference,
    ContactName,
    ContactTaxId,
    ContactBranch,
    Category,
    AccountCode,
    CostCenter,
    /// Amount before VAT
    Subtotal,
    VatRate,
    VatAmount,
    /// Amount including VAT
    Total,
    WhtRate,
    WhtAmount,
    WhtForm,
    NetPayable,
    PaidAmount,
    PaymentStatus,
    Status,
    FileCount,
}

/// How dates are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `2025-01-31`
    Iso,
    /// `31/01/2025`
    DayFirst,
    /// `31/01/2568`
    BuddhistEra,
}

impl DateStyle {
    pub fn for_target(target: ExportTarget) -> Self {
        match target {
            ExportTarget::Generic | ExportTarget::FlowAccount => Self::Iso,
            ExportTarget::Peak => Self::DayFirst,
            ExportTarget::Express => Self::BuddhistEra,
        }
    }

    pub fn format(&self, date: NaiveDate) -> String {
        match self {
            Self::Iso => date.format("%Y-%m-%d").to_string(),
            Self::DayFirst => date.format("%d/%m/%Y").to_string(),
            Self::BuddhistEra => format!(
                "{:02}/{:02}/{}",
                date.day(),
                date.month(),
                date.year() + 543
            ),
        }
    }
}

const GENERIC: &[(ColumnKey, &str)] = &[
    (ColumnKey::BoxNumber, "Box Number"),
    (ColumnKey::DocumentDate, "Document Date"),
    (ColumnKey::DueDate, "Due Date"),
    (ColumnKey::BoxType, "Type"),
    (ColumnKey::Title, "Title"),
    (ColumnKey::Reference, "Reference"),
    (ColumnKey::ContactName, "Contact"),
    (ColumnKey::ContactTaxId, "Tax ID"),
    (ColumnKey::Category, "Category"),
    (ColumnKey::AccountCode, "Account Code"),
    (ColumnKey::CostCenter, "Cost Center"),
    (ColumnKey::Subtotal, "Subtotal"),
    (ColumnKey::VatAmount, "VAT"),
    (ColumnKey::Total, "Total"),
    (ColumnKey::WhtRate, "WHT Rate"),
    (ColumnKey::WhtAmount, "WHT"),
    (ColumnKey::NetPayable, "Net Payable"),
    (ColumnKey::PaidAmount, "Paid"),
    (ColumnKey::PaymentStatus, "Payment Status"),
    (ColumnKey::Status, "Status"),
    (ColumnKey::FileCount, "Files"),
];

const PEAK: &[(ColumnKey, &str)] = &[
    (ColumnKey::DocumentDate, "วันที่เอกสาร"),
    (ColumnKey::BoxNumber, "เลขที่เอกสาร"),
    (ColumnKey::Reference, "เลขที่อ้างอิง"),
    (ColumnKey::ContactName, "ชื่อผู้ติดต่อ"),
    (ColumnKey::ContactTaxId, "เลขประจำตัวผู้เสียภาษี"),
    (ColumnKey::ContactBranch, "สาขา"),
    (ColumnKey::AccountCode, "รหัสบัญชี"),
    (ColumnKey::Title, "คำอธิบาย"),
    (ColumnKey::Subtotal, "มูลค่าก่อนภาษี"),
    (ColumnKey::VatRate, "อัตราภาษีมูลค่าเพิ่ม"),
    (ColumnKey::VatAmount, "ภาษีมูลค่าเพิ่ม"),
    (ColumnKey::Total, "ยอดรวม"),
    (ColumnKey::WhtRate, "อัตราภาษีหัก ณ ที่จ่าย"),
    (ColumnKey::WhtAmount, "ภาษีหัก ณ ที่จ่าย"),
    (ColumnKey::DueDate, "วันครบกำหนด"),
];

const FLOWACCOUNT: &[(ColumnKey, &str)] = &[
    (ColumnKey::DocumentDate, "Document Date"),
    (ColumnKey::BoxNumber, "Document No."),
    (ColumnKey::ContactName, "Contact Name"),
    (ColumnKey::ContactTaxId, "Tax ID"),
    (ColumnKey::ContactBranch, "Branch"),
    (ColumnKey::Title, "Description"),
    (ColumnKey::Category, "Category"),
    (ColumnKey::Subtotal, "Amount Before VAT"),
    (ColumnKey::VatAmount, "VAT Amount"),
    (ColumnKey::Total, "Grand Total"),
    (ColumnKey::WhtRate, "WHT %"),
    (ColumnKey::WhtAmount, "WHT Amount"),
    (ColumnKey::Reference, "Reference"),
    (ColumnKey::DueDate, "Due Date"),
];

const EXPRESS: &[(ColumnKey, &str)] = &[
    (ColumnKey::DocumentDate, "วันที่"),
    (ColumnKey::BoxNumber, "เลขที่"),
    (ColumnKey::AccountCode, "รหัสบัญชี"),
    (ColumnKey::Category, "ชื่อบัญชี"),
    (ColumnKey::Title, "รายละเอียด"),
    (ColumnKey::ContactName, "ผู้ติดต่อ"),
    (ColumnKey::ContactTaxId, "เลขผู้เสียภาษี"),
    (ColumnKey::Subtotal, "จำนวนเงิน"),
    (ColumnKey::VatAmount, "ภาษีมูลค่าเพิ่ม"),
    (ColumnKey::Total, "ยอดสุทธิ"),
    (ColumnKey::WhtAmount, "ภาษีหัก ณ ที่จ่าย"),
    (ColumnKey::WhtForm, "แบบ ภ.ง.ด."),
    (ColumnKey::CostCenter, "แผนก"),
];

/// Ordered columns for a target
pub fn columns_for(target: ExportTarget) -> &'static [(ColumnKey, &'static str)] {
    match target {
        ExportTarget::Generic => GENERIC,
        ExportTarget::Peak => PEAK,
        ExportTarget::FlowAccount => FLOWACCOUNT,
        ExportTarget::Express => EXPRESS,
    }
}

pub fn headers(target: ExportTarget) -> Vec<&'static str> {
    columns_for(target).iter().map(|(_, h)| *h).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_styles() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(DateStyle::Iso.format(d), "2025-01-05");
        assert_eq!(DateStyle::DayFirst.format(d), "05/01/2025");
        assert_eq!(DateStyle::BuddhistEra.format(d), "05/01/2568");
    }

    #[test]
    fn test_every_target_has_number_and_date() {
        for target in ExportTarget::all() {
            let keys: Vec<ColumnKey> = columns_for(*target).iter().map(|(k, _)| *k).collect();
            assert!(keys.contains(&ColumnKey::BoxNumber), "{}", target);
            assert!(keys.contains(&ColumnKey::DocumentDate), "{}", target);
        }
    }

    #[test]
    fn test_thai_headers_for_peak() {
        assert_eq!(headers(ExportTarget::Peak)[0], "วันที่เอกสาร");
        assert_eq!(DateStyle::for_target(ExportTarget::Express), DateStyle::BuddhistEra);
    }
}
