//! Payment repository, persisted to payments.json

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{BoxId, Money, Payment, PaymentId};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for Payment {
    type Key = PaymentId;

    fn key(&self) -> PaymentId {
        self.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PaymentData {
    payments: Vec<Payment>,
}

pub struct PaymentRepository {
    path: PathBuf,
    payments: Table<Payment>,
}

impl PaymentRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            payments: Table::new(),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: PaymentData = read_json(&self.path)?;
        self.payments.replace_all(file_data.payments)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let payments = self.payments.sorted_by_key(|p| (p.paid_on, p.created_at))?;
        write_json_atomic(&self.path, &PaymentData { payments })
    }

    pub fn get(&self, id: PaymentId) -> Result<Option<Payment>, TaxboxError> {
        self.payments.get(id)
    }

    /// Payments of a box in date order
    pub fn get_by_box(&self, box_id: BoxId) -> Result<Vec<Payment>, TaxboxError> {
        let mut payments = self.payments.filter(|p| p.box_id == box_id)?;
        payments.sort_by_key(|p| (p.paid_on, p.created_at));
        Ok(payments)
    }

    pub fn total_for_box(&self, box_id: BoxId) -> Result<Money, TaxboxError> {
        Ok(self.get_by_box(box_id)?.iter().map(|p| p.amount).sum())
    }

    pub fn upsert(&self, payment: Payment) -> Result<(), TaxboxError> {
        self.payments.upsert(payment)
    }

    pub fn delete(&self, id: PaymentId) -> Result<Option<Payment>, TaxboxError> {
        self.payments.remove(id)
    }

    pub fn delete_for_box(&self, box_id: BoxId) -> Result<Vec<Payment>, TaxboxError> {
        self.payments.remove_where(|p| p.box_id == box_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentMethod, UserId};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_total_for_box() {
        let temp_dir = TempDir::new().unwrap();
        let repo = PaymentRepository::new(temp_dir.path().join("payments.json"));
        let box_id = BoxId::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        for satang in [10_000, 25_050] {
            repo.upsert(Payment::new(
                box_id,
                Money::from_satang(satang),
                date,
                PaymentMethod::Transfer,
                UserId::new(),
            ))
            .unwrap();
        }
        repo.upsert(Payment::new(
            BoxId::new(),
            Money::from_satang(999),
            date,
            PaymentMethod::Cash,
            UserId::new(),
        ))
        .unwrap();

        assert_eq!(repo.total_for_box(box_id).unwrap().satang(), 35_050);
        assert_eq!(repo.delete_for_box(box_id).unwrap().len(), 2);
        assert_eq!(repo.total_for_box(box_id).unwrap(), Money::zero());
    }
}
