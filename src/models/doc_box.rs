//! Box model
//!
//! A box groups the source documents of one accounting transaction and moves
//! through a review lifecycle. VAT and WHT compliance are tracked as parallel
//! sub-statuses next to the main status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BoxId, CategoryId, ContactId, CostCenterId, OrganizationId, UserId};
use super::money::Money;
use super::tax::{filing_deadline, PaymentStatus, TaxBreakdown, TaxInput, DEFAULT_VAT_RATE_BP};

/// Direction of the transaction a box records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoxType {
    /// Money going out: purchases, services, rent
    #[default]
    Expense,
    /// Money coming in: sales
    Income,
}

impl BoxType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "expense" | "exp" => Some(Self::Expense),
            "income" | "inc" => Some(Self::Income),
            _ => None,
        }
    }

    /// Prefix used in box numbers
    pub fn number_prefix(&self) -> &'static str {
        match self {
            Self::Expense => "EXP",
            Self::Income => "INC",
        }
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expense => write!(f, "Expense"),
            Self::Income => write!(f, "Income"),
        }
    }
}

/// Review lifecycle of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoxStatus {
    /// Being prepared by the organization
    #[default]
    Draft,
    /// Submitted and waiting for review
    #[serde(alias = "SUBMITTED")]
    Pending,
    /// Reviewer asked for more documents
    NeedDocs,
    /// Reviewed and booked
    Completed,
}

impl BoxStatus {
    /// Statuses reachable from this one
    pub fn allowed_next(&self) -> &'static [BoxStatus] {
        match self {
            Self::Draft => &[Self::Pending],
            Self::Pending => &[Self::Draft, Self::NeedDocs, Self::Completed],
            Self::NeedDocs => &[Self::Pending],
            Self::Completed => &[Self::Pending],
        }
    }

    pub fn can_transition_to(&self, next: BoxStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "draft" => Some(Self::Draft),
            "pending" | "submitted" => Some(Self::Pending),
            "need_docs" | "needdocs" => Some(Self::NeedDocs),
            "completed" | "complete" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::Pending => write!(f, "Pending"),
            Self::NeedDocs => write!(f, "Need Docs"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

/// VAT document state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VatStatus {
    #[default]
    NotRequired,
    /// Tax invoice not on file yet
    Pending,
    /// Tax invoice on file
    Received,
    /// Reported on PP.30
    Filed,
}

impl fmt::Display for VatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequired => write!(f, "-"),
            Self::Pending => write!(f, "Pending"),
            Self::Received => write!(f, "Received"),
            Self::Filed => write!(f, "Filed"),
        }
    }
}

/// Withholding-tax certificate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WhtStatus {
    #[default]
    NotRequired,
    /// Certificate not on file yet
    Pending,
    /// Certificate on file
    Issued,
    /// Reported on PND.3/PND.53
    Filed,
}

impl fmt::Display for WhtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequired => write!(f, "-"),
            Self::Pending => write!(f, "Pending"),
            Self::Issued => write!(f, "Issued"),
            Self::Filed => write!(f, "Filed"),
        }
    }
}

/// A folder of source documents for one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocBox {
    pub id: BoxId,
    pub organization_id: OrganizationId,

    /// `EXP-202501-0001`; unique per organization
    pub box_number: String,

    pub box_type: BoxType,
    pub title: String,

    pub contact_id: Option<ContactId>,
    pub category_id: Option<CategoryId>,
    pub cost_center_id: Option<CostCenterId>,

    pub document_date: NaiveDate,
    pub due_date: Option<NaiveDate>,

    /// Supplier invoice number or other external reference
    pub reference: Option<String>,

    /// Amount as written on the document
    pub total_amount: Money,

    pub has_vat: bool,
    pub vat_inclusive: bool,
    pub vat_rate_bp: u32,
    pub vat_amount: Money,

    pub has_wht: bool,
    pub wht_rate_bp: u32,
    pub wht_amount: Money,

    pub status: BoxStatus,
    pub vat_status: VatStatus,
    pub wht_status: WhtStatus,

    pub paid_amount: Money,
    pub payment_status: PaymentStatus,

    /// Reviewer's note when documents were requested
    pub need_docs_reason: Option<String>,

    pub assignee: Option<UserId>,
    pub created_by: UserId,

    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub exported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocBox {
    /// Create a draft box with no taxes; call `set_taxes` to apply VAT/WHT
    pub fn new(
        organization_id: OrganizationId,
        box_number: impl Into<String>,
        box_type: BoxType,
        title: impl Into<String>,
        document_date: NaiveDate,
        total_amount: Money,
        created_by: UserId,
    ) -> Self {
        let now = Utc::now();
        let mut doc_box = Self {
            id: BoxId::new(),
            organization_id,
            box_number: box_number.into(),
            box_type,
            title: title.into().trim().to_string(),
            contact_id: None,
            category_id: None,
            cost_center_id: None,
            document_date,
            due_date: None,
            reference: None,
            total_amount,
            has_vat: false,
            vat_inclusive: true,
            vat_rate_bp: DEFAULT_VAT_RATE_BP,
            vat_amount: Money::zero(),
            has_wht: false,
            wht_rate_bp: 0,
            wht_amount: Money::zero(),
            status: BoxStatus::Draft,
            vat_status: VatStatus::NotRequired,
            wht_status: WhtStatus::NotRequired,
            paid_amount: Money::zero(),
            payment_status: PaymentStatus::Unpaid,
            need_docs_reason: None,
            assignee: None,
            created_by,
            submitted_at: None,
            completed_at: None,
            exported_at: None,
            created_at: now,
            updated_at: now,
        };
        doc_box.recalculate();
        doc_box
    }

    pub fn tax_input(&self) -> TaxInput {
        TaxInput {
            total: self.total_amount,
            has_vat: self.has_vat,
            vat_inclusive: self.vat_inclusive,
            vat_rate_bp: self.vat_rate_bp,
            has_wht: self.has_wht,
            wht_rate_bp: self.wht_rate_bp,
        }
    }

    pub fn breakdown(&self) -> TaxBreakdown {
        TaxBreakdown::derive(self.tax_input())
    }

    /// Set VAT/WHT flags and re-derive every dependent amount
    pub fn set_taxes(
        &mut self,
        has_vat: bool,
        vat_inclusive: bool,
        vat_rate_bp: u32,
        has_wht: bool,
        wht_rate_bp: u32,
    ) {
        self.has_vat = has_vat;
        self.vat_inclusive = vat_inclusive;
        self.vat_rate_bp = vat_rate_bp;
        self.has_wht = has_wht;
        self.wht_rate_bp = if has_wht { wht_rate_bp } else { 0 };
        self.recalculate();
    }

    /// Re-derive tax amounts and payment status from the current fields
    pub fn recalculate(&mut self) {
        let breakdown = self.breakdown();
        self.vat_amount = breakdown.vat;
        self.wht_amount = breakdown.wht;
        self.payment_status = PaymentStatus::derive(breakdown.net_payable, self.paid_amount);

        if !self.has_vat {
            self.vat_status = VatStatus::NotRequired;
        } else if self.vat_status == VatStatus::NotRequired {
            self.vat_status = VatStatus::Pending;
        }

        if !self.has_wht {
            self.wht_status = WhtStatus::NotRequired;
        } else if self.wht_status == WhtStatus::NotRequired {
            self.wht_status = WhtStatus::Pending;
        }
    }

    /// Record the sum of payments against this box
    pub fn apply_paid(&mut self, paid: Money) {
        self.paid_amount = paid;
        self.payment_status = PaymentStatus::derive(self.breakdown().net_payable, paid);
        self.touch();
    }

    /// Update sub-statuses from which supporting documents are on file
    ///
    /// Filed statuses are never downgraded by document changes.
    pub fn refresh_document_statuses(&mut self, has_tax_invoice: bool, has_wht_certificate: bool) {
        self.vat_status = match (self.has_vat, self.vat_status) {
            (false, _) => VatStatus::NotRequired,
            (true, VatStatus::Filed) => VatStatus::Filed,
            (true, _) if has_tax_invoice => VatStatus::Received,
            (true, _) => VatStatus::Pending,
        };
        self.wht_status = match (self.has_wht, self.wht_status) {
            (false, _) => WhtStatus::NotRequired,
            (true, WhtStatus::Filed) => WhtStatus::Filed,
            (true, _) if has_wht_certificate => WhtStatus::Issued,
            (true, _) => WhtStatus::Pending,
        };
    }

    /// Move to `next`, stamping lifecycle timestamps
    pub fn transition(&mut self, next: BoxStatus) -> Result<(), BoxValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(BoxValidationError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let now = Utc::now();
        match next {
            BoxStatus::Pending => {
                self.submitted_at = Some(now);
                self.need_docs_reason = None;
                self.completed_at = None;
            }
            BoxStatus::Completed => self.completed_at = Some(now),
            BoxStatus::Draft => self.submitted_at = None,
            BoxStatus::NeedDocs => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Completed boxes cannot be edited until reopened
    pub fn is_locked(&self) -> bool {
        self.status == BoxStatus::Completed
    }

    /// Last day to file withholding tax for this box
    pub fn wht_deadline(&self, filing_day: u32) -> Option<NaiveDate> {
        self.has_wht
            .then(|| filing_deadline(self.document_date, filing_day))
    }

    /// WHT is still pending and its filing deadline has passed
    pub fn is_wht_overdue(&self, today: NaiveDate, filing_day: u32) -> bool {
        self.wht_status == WhtStatus::Pending
            && self
                .wht_deadline(filing_day)
                .map(|deadline| today > deadline)
                .unwrap_or(false)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn validate(&self) -> Result<(), BoxValidationError> {
        if self.title.is_empty() {
            return Err(BoxValidationError::EmptyTitle);
        }
        if self.title.len() > 300 {
            return Err(BoxValidationError::TitleTooLong(self.title.len()));
        }
        if self.total_amount.is_negative() {
            return Err(BoxValidationError::NegativeAmount);
        }
        if self.vat_rate_bp > 10_000 || self.wht_rate_bp > 10_000 {
            return Err(BoxValidationError::RateOutOfRange);
        }
        if self.has_wht && self.wht_rate_bp == 0 {
            return Err(BoxValidationError::MissingWhtRate);
        }
        if let Some(due) = self.due_date {
            if due < self.document_date {
                return Err(BoxValidationError::DueBeforeDocumentDate);
            }
        }
        Ok(())
    }
}

impl fmt::Display for DocBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.box_number, self.title)
    }
}

/// Format a box number: `{EXP|INC}-{YYYYMM}-{seq:04}`
pub fn format_box_number(box_type: BoxType, document_date: NaiveDate, seq: u32) -> String {
    format!(
        "{}-{}-{:04}",
        box_type.number_prefix(),
        document_date.format("%Y%m"),
        seq
    )
}

/// Sequence part of `number` if it belongs to the same type and month
pub fn box_number_sequence(number: &str, box_type: BoxType, document_date: NaiveDate) -> Option<u32> {
    let prefix = format!(
        "{}-{}-",
        box_type.number_prefix(),
        document_date.format("%Y%m")
    );
    number.strip_prefix(&prefix)?.parse().ok()
}

/// Validation errors for boxes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxValidationError {
    EmptyTitle,
    TitleTooLong(usize),
    NegativeAmount,
    RateOutOfRange,
    MissingWhtRate,
    DueBeforeDocumentDate,
    InvalidTransition { from: BoxStatus, to: BoxStatus },
}

impl fmt::Display for BoxValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Box title cannot be empty"),
            Self::TitleTooLong(len) => write!(f, "Box title too long ({} chars, max 300)", len),
            Self::NegativeAmount => write!(f, "Total amount cannot be negative"),
            Self::RateOutOfRange => write!(f, "Tax rates must be between 0% and 100%"),
            Self::MissingWhtRate => write!(f, "A WHT rate is required when WHT applies"),
            Self::DueBeforeDocumentDate => write!(f, "Due date is before the document date"),
            Self::InvalidTransition { from, to } => {
                write!(f, "Cannot move box from {} to {}", from, to)
            }
        }
    }
}

impl std::error::Error for BoxValidationError {}
