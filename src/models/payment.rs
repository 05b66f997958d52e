//! Payments recorded against a box

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BoxId, PaymentId, UserId};
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    #[default]
    Transfer,
    Cheque,
    CreditCard,
    Other,
}

impl PaymentMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "cash" => Some(Self::Cash),
            "transfer" | "bank_transfer" => Some(Self::Transfer),
            "cheque" | "check" => Some(Self::Cheque),
            "credit_card" | "card" => Some(Self::CreditCard),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "Cash"),
            Self::Transfer => write!(f, "Transfer"),
            Self::Cheque => write!(f, "Cheque"),
            Self::CreditCard => write!(f, "Credit Card"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A (possibly partial) settlement of a box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub box_id: BoxId,
    pub amount: Money,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    #[serde(default)]
    pub note: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        box_id: BoxId,
        amount: Money,
        paid_on: NaiveDate,
        method: PaymentMethod,
        created_by: UserId,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            box_id,
            amount,
            paid_on,
            method,
            reference: None,
            note: String::new(),
            created_by,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), PaymentValidationError> {
        if !self.amount.is_positive() {
            return Err(PaymentValidationError::NonPositiveAmount);
        }
        if self.note.len() > 500 {
            return Err(PaymentValidationError::NoteTooLong(self.note.len()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentValidationError {
    NonPositiveAmount,
    NoteTooLong(usize),
}

impl fmt::Display for PaymentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount => write!(f, "Payment amount must be greater than zero"),
            Self::NoteTooLong(len) => write!(f, "Payment note too long ({} chars, max 500)", len),
        }
    }
}

impl std::error::Error for PaymentValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let ok = Payment::new(
            BoxId::new(),
            Money::from_satang(100),
            date,
            PaymentMethod::Cash,
            UserId::new(),
        );
        assert!(ok.validate().is_ok());

        let zero = Payment::new(BoxId::new(), Money::zero(), date, PaymentMethod::Cash, UserId::new());
        assert_eq!(zero.validate(), Err(PaymentValidationError::NonPositiveAmount));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(PaymentMethod::parse("credit-card"), Some(PaymentMethod::CreditCard));
        assert_eq!(PaymentMethod::parse("check"), Some(PaymentMethod::Cheque));
        assert_eq!(PaymentMethod::parse("iou"), None);
    }
}
