//! Thai VAT and withholding-tax arithmetic
//!
//! All derivations work on integer satang with rates in basis points, and
//! round half away from zero. Nothing here touches storage.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::catalog::ContactKind;
use super::money::Money;

/// Standard Thai VAT rate (7%)
pub const DEFAULT_VAT_RATE_BP: u32 = 700;

/// Basis points in 100%
pub const BP_SCALE: i64 = 10_000;

/// VAT contained in a VAT-inclusive total: `round(total * rate / (100 + rate))`
///
/// With the standard rate this is `round(total * 7 / 107)`.
pub fn vat_from_inclusive(total: Money, rate_bp: u32) -> Money {
    total.mul_ratio(rate_bp as i64, BP_SCALE + rate_bp as i64)
}

/// VAT charged on top of a pre-tax amount: `round(base * rate / 100)`
pub fn vat_from_exclusive(base: Money, rate_bp: u32) -> Money {
    base.mul_ratio(rate_bp as i64, BP_SCALE)
}

/// Withholding tax on the pre-VAT portion: `round((total - vat) * rate / 100)`
pub fn wht_amount(total: Money, vat: Money, rate_bp: u32) -> Money {
    (total - vat).mul_ratio(rate_bp as i64, BP_SCALE)
}

/// Format a basis-point rate as a percentage, e.g. 700 -> "7%", 150 -> "1.5%"
pub fn format_rate(rate_bp: u32) -> String {
    let whole = rate_bp / 100;
    let frac = rate_bp % 100;
    if frac == 0 {
        format!("{}%", whole)
    } else if frac % 10 == 0 {
        format!("{}.{}%", whole, frac / 10)
    } else {
        format!("{}.{:02}%", whole, frac)
    }
}

/// Parse a percentage such as "3", "1.5" or "3%" into basis points
pub fn parse_rate(s: &str) -> Option<u32> {
    let s = s.trim().trim_end_matches('%').trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: u32 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac: u32 = match frac.len() {
        0 => 0,
        1 => frac.parse::<u32>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    let bp = whole.checked_mul(100)?.checked_add(frac)?;
    (bp <= BP_SCALE as u32).then_some(bp)
}

/// Inputs that determine a box's tax amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxInput {
    /// Amount as written on the document
    pub total: Money,
    pub has_vat: bool,
    /// Whether `total` already contains VAT
    pub vat_inclusive: bool,
    pub vat_rate_bp: u32,
    pub has_wht: bool,
    pub wht_rate_bp: u32,
}

/// Derived tax amounts for a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Amount before VAT
    pub subtotal: Money,
    pub vat: Money,
    /// Amount including VAT
    pub gross: Money,
    pub wht: Money,
    /// Gross less withholding tax, the cash that changes hands
    pub net_payable: Money,
}

impl TaxBreakdown {
    /// Derive VAT, gross and WHT from the document total and flags
    pub fn derive(input: TaxInput) -> Self {
        let vat = match (input.has_vat, input.vat_inclusive) {
            (false, _) => Money::zero(),
            (true, true) => vat_from_inclusive(input.total, input.vat_rate_bp),
            (true, false) => vat_from_exclusive(input.total, input.vat_rate_bp),
        };

        let gross = if input.has_vat && !input.vat_inclusive {
            input.total + vat
        } else {
            input.total
        };

        let wht = if input.has_wht {
            wht_amount(gross, vat, input.wht_rate_bp)
        } else {
            Money::zero()
        };

        Self {
            subtotal: gross - vat,
            vat,
            gross,
            wht,
            net_payable: gross - wht,
        }
    }
}

/// Settlement state of a box derived from what has been paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
    Overpaid,
}

impl PaymentStatus {
    /// Total function of `(total, paid)`; `paid <= 0` is always Unpaid
    pub fn derive(total: Money, paid: Money) -> Self {
        if !paid.is_positive() {
            Self::Unpaid
        } else if paid < total {
            Self::Partial
        } else if paid == total {
            Self::Paid
        } else {
            Self::Overpaid
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unpaid" => Some(Self::Unpaid),
            "partial" => Some(Self::Partial),
            "paid" => Some(Self::Paid),
            "overpaid" => Some(Self::Overpaid),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unpaid => write!(f, "Unpaid"),
            Self::Partial => write!(f, "Partial"),
            Self::Paid => write!(f, "Paid"),
            Self::Overpaid => write!(f, "Overpaid"),
        }
    }
}

/// Withholding-tax return a payment is reported on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WhtForm {
    /// PND.3, payments to individuals
    Pnd3,
    /// PND.53, payments to juristic persons
    Pnd53,
}

impl WhtForm {
    pub fn for_contact(kind: ContactKind) -> Self {
        match kind {
            ContactKind::Individual => Self::Pnd3,
            ContactKind::Juristic => Self::Pnd53,
        }
    }
}

impl fmt::Display for WhtForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pnd3 => write!(f, "PND.3"),
            Self::Pnd53 => write!(f, "PND.53"),
        }
    }
}

/// Filing deadline on `day` of the month after `document_date`
pub fn filing_deadline(document_date: NaiveDate, day: u32) -> NaiveDate {
    let month = TaxMonth::of(document_date).next();
    NaiveDate::from_ymd_opt(month.year, month.month, day.clamp(1, 28)).unwrap_or(document_date)
}

/// A calendar month used for tax returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxMonth {
    pub year: i32,
    pub month: u32,
}

impl TaxMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse "YYYY-MM"
    pub fn parse(s: &str) -> Option<Self> {
        let (year, month) = s.trim().split_once('-')?;
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for TaxMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(total: i64) -> TaxInput {
        TaxInput {
            total: Money::from_satang(total),
            has_vat: true,
            vat_inclusive: true,
            vat_rate_bp: DEFAULT_VAT_RATE_BP,
            has_wht: true,
            wht_rate_bp: 300,
        }
    }

    #[test]
    fn test_inclusive_vat_standard_rate() {
        // 1,070.00 incl. VAT -> 70.00 VAT
        assert_eq!(
            vat_from_inclusive(Money::from_satang(107_000), DEFAULT_VAT_RATE_BP),
            Money::from_satang(7_000)
        );
        // 100.00 * 7/107 = 6.542... -> 6.54
        assert_eq!(
            vat_from_inclusive(Money::from_satang(10_000), DEFAULT_VAT_RATE_BP),
            Money::from_satang(654)
        );
    }

    #[test]
    fn test_inclusive_vat_bounded_by_total() {
        for total in [0, 1, 7, 53, 99, 10_000, 1_234_567, 999_999_999] {
            let total = Money::from_satang(total);
            let vat = vat_from_inclusive(total, DEFAULT_VAT_RATE_BP);
            assert!(!vat.is_negative());
            assert!(vat <= total);
        }
    }

    #[test]
    fn test_wht_on_pre_vat_amount() {
        // (1,070 - 70) * 3% = 30.00
        let wht = wht_amount(Money::from_satang(107_000), Money::from_satang(7_000), 300);
        assert_eq!(wht, Money::from_satang(3_000));
        assert!(!wht_amount(Money::zero(), Money::zero(), 500).is_negative());
    }

    #[test]
    fn test_breakdown_inclusive() {
        let b = TaxBreakdown::derive(input(107_000));
        assert_eq!(b.vat.satang(), 7_000);
        assert_eq!(b.subtotal.satang(), 100_000);
        assert_eq!(b.gross.satang(), 107_000);
        assert_eq!(b.wht.satang(), 3_000);
        assert_eq!(b.net_payable.satang(), 104_000);
    }

    #[test]
    fn test_breakdown_exclusive_adds_vat() {
        let mut i = input(100_000);
        i.vat_inclusive = false;
        let b = TaxBreakdown::derive(i);
        assert_eq!(b.vat.satang(), 7_000);
        assert_eq!(b.gross.satang(), 107_000);
        assert_eq!(b.wht.satang(), 3_000);
    }

    #[test]
    fn test_breakdown_without_taxes() {
        let mut i = input(50_000);
        i.has_vat = false;
        i.has_wht = false;
        let b = TaxBreakdown::derive(i);
        assert_eq!(b.vat, Money::zero());
        assert_eq!(b.wht, Money::zero());
        assert_eq!(b.net_payable.satang(), 50_000);
    }

    #[test]
    fn test_payment_status_boundaries() {
        let total = Money::from_satang(10_000);
        assert_eq!(PaymentStatus::derive(total, Money::zero()), PaymentStatus::Unpaid);
        assert_eq!(
            PaymentStatus::derive(total, Money::from_satang(1)),
            PaymentStatus::Partial
        );
        assert_eq!(PaymentStatus::derive(total, total), PaymentStatus::Paid);
        assert_eq!(
            PaymentStatus::derive(total, Money::from_satang(10_001)),
            PaymentStatus::Overpaid
        );
        assert_eq!(
            PaymentStatus::derive(Money::zero(), Money::zero()),
            PaymentStatus::Unpaid
        );
    }

    #[test]
    fn test_rate_format_and_parse() {
        assert_eq!(format_rate(700), "7%");
        assert_eq!(format_rate(150), "1.5%");
        assert_eq!(format_rate(75), "0.75%");
        assert_eq!(parse_rate("3"), Some(300));
        assert_eq!(parse_rate("1.5%"), Some(150));
        assert_eq!(parse_rate("0.75"), Some(75));
        assert_eq!(parse_rate("101"), None);
        assert_eq!(parse_rate("x"), None);
    }

    #[test]
    fn test_filing_deadline_rolls_year() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 20).unwrap();
        assert_eq!(
            filing_deadline(date, 7),
            NaiveDate::from_ymd_opt(2026, 1, 7).unwrap()
        );
        let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(
            filing_deadline(date, 15),
            NaiveDate::from_ymd_opt(2025, 4, 15).unwrap()
        );
    }

    #[test]
    fn test_wht_form_for_contact() {
        assert_eq!(WhtForm::for_contact(ContactKind::Individual), WhtForm::Pnd3);
        assert_eq!(WhtForm::for_contact(ContactKind::Juristic), WhtForm::Pnd53);
    }

    #[test]
    fn test_tax_month() {
        let m = TaxMonth::parse("2025-01").unwrap();
        assert_eq!(m.to_string(), "2025-01");
        assert!(m.contains(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()));
        assert_eq!(TaxMonth::parse("2025-12").unwrap().next().to_string(), "2026-01");
        assert!(TaxMonth::parse("2025-13").is_none());
    }
}
