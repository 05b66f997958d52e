//! Payment service
//!
//! Payments may be recorded at any stage of a box, including after it is
//! completed. Every change re-totals the box's `paid_amount`.

use chrono::NaiveDate;

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{BoxId, DocBox, Money, Payment, PaymentId, PaymentMethod, UserId};
use crate::storage::{AuditScope, Storage};

use super::access::{AccessService, Capability};

pub struct PaymentService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> PaymentService<'a> {
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

    /// Re-total the box from its payments and persist it
    fn retotal(&self, mut doc_box: DocBox) -> TaxboxResult<DocBox> {
        let before = doc_box.clone();
        let paid = self.storage.payments.total_for_box(doc_box.id)?;
        doc_box.apply_paid(paid);
        self.storage.boxes.upsert(doc_box.clone())?;
        self.storage.boxes.save()?;
        self.storage.log_update(
            AuditScope::new(self.actor).org(doc_box.organization_id),
            EntityType::Box,
            doc_box.id.to_string(),
            Some(doc_box.box_number.clone()),
            &before,
            &doc_box,
            Some(format!(
                "paid_amount: {} -> {}, payment_status: {} -> {}",
                before.paid_amount, doc_box.paid_amount, before.payment_status, doc_box.payment_status
            )),
        )?;
        Ok(doc_box)
    }

    pub fn record(
        &self,
        box_id: BoxId,
        amount: Money,
        paid_on: NaiveDate,
        method: PaymentMethod,
        reference: Option<String>,
        note: &str,
    ) -> TaxboxResult<(Payment, DocBox)> {
        let doc_box = self.load_box(box_id, Capability::Edit)?;

        let mut payment = Payment::new(box_id, amount, paid_on, method, self.actor);
        payment.reference = reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        payment.note = note.trim().to_string();
        payment
            .validate()
            .map_err(|e| TaxboxError::Validation(e.to_string()))?;

        self.storage.payments.upsert(payment.clone())?;
        self.storage.payments.save()?;
        self.storage.log_create(
            AuditScope::new(self.actor).org(doc_box.organization_id),
            EntityType::Payment,
            payment.id.to_string(),
            Some(format!("{} {}", doc_box.box_number, payment.amount)),
            &payment,
        )?;

        let doc_box = self.retotal(doc_box)?;
        tracing::info!(
            box_number = %doc_box.box_number,
            amount = %payment.amount,
            status = %doc_box.payment_status,
            "payment recorded"
        );
        Ok((payment, doc_box))
    }

    pub fn delete(&self, id: PaymentId) -> TaxboxResult<DocBox> {
        let payment = self
            .storage
            .payments
            .get(id)?
            .ok_or_else(|| TaxboxError::payment_not_found(id.to_string()))?;
        let doc_box = self.load_box(payment.box_id, Capability::Edit)?;

        self.storage.payments.delete(id)?;
        self.storage.payments.save()?;
        self.storage.log_delete(
            AuditScope::new(self.actor).org(doc_box.organization_id),
            EntityType::Payment,
            payment.id.to_string(),
            Some(format!("{} {}", doc_box.box_number, payment.amount)),
            &payment,
        )?;
        self.retotal(doc_box)
    }

    /// Payments of a box, oldest first
    pub fn list_for_box(&self, box_id: BoxId) -> TaxboxResult<Vec<Payment>> {
        self.load_box(box_id, Capability::View)?;
        let mut payments = self.storage.payments.get_by_box(box_id)?;
        payments.sort_by(|a, b| {
            a.paid_on
                .cmp(&b.paid_on)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(payments)
    }

    /// Find a payment of a box by full or short ID
    pub fn find(&self, box_id: BoxId, identifier: &str) -> TaxboxResult<Payment> {
        self.list_for_box(box_id)?
            .into_iter()
            .find(|p| p.id.to_string() == identifier || p.id.matches_short(identifier))
            .ok_or_else(|| TaxboxError::payment_not_found(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberRole, PaymentStatus};
    use crate::services::testutil::{date, Fixture};

    #[test]
    fn test_partial_then_full_payment() {
        let fx = Fixture::new();
        // 1,070.00 incl. VAT, 3% WHT on 1,000.00 leaves 1,040.00 payable
        let doc_box = fx.expense_box(true, Some(300));
        let svc = PaymentService::new(&fx.storage, fx.owner);

        let (_, partial) = svc
            .record(doc_box.id, Money::from_satang(40_000), date(2025, 1, 20), PaymentMethod::Transfer, None, "")
            .unwrap();
        assert_eq!(partial.payment_status, PaymentStatus::Partial);
        assert_eq!(partial.paid_amount, Money::from_satang(40_000));

        let (_, paid) = svc
            .record(doc_box.id, Money::from_satang(64_000), date(2025, 1, 25), PaymentMethod::Cash, Some("RCPT-1".into()), "balance")
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(svc.list_for_box(doc_box.id).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_recomputes_status() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(false, None);
        let svc = PaymentService::new(&fx.storage, fx.owner);
        let (payment, over) = svc
            .record(doc_box.id, Money::from_satang(200_000), date(2025, 1, 20), PaymentMethod::Transfer, None, "")
            .unwrap();
        assert_eq!(over.payment_status, PaymentStatus::Overpaid);

        let after = svc.delete(payment.id).unwrap();
        assert_eq!(after.payment_status, PaymentStatus::Unpaid);
        assert!(after.paid_amount.is_zero());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(false, None);
        let err = PaymentService::new(&fx.storage, fx.owner)
            .record(doc_box.id, Money::zero(), date(2025, 1, 20), PaymentMethod::Cash, None, "")
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_viewer_cannot_record() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(false, None);
        let viewer = fx.member("viewer@example.com", MemberRole::Viewer);
        let err = PaymentService::new(&fx.storage, viewer)
            .record(doc_box.id, Money::from_satang(100), date(2025, 1, 20), PaymentMethod::Cash, None, "")
            .unwrap_err();
        assert!(err.is_permission_denied());
    }
}
