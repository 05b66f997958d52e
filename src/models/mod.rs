//! Core data models for taxbox
//!
//! Organizations and firms, boxes with their documents and payments, the
//! per-organization catalog, tasks, export profiles and integrations, plus the
//! tax arithmetic shared by all of them.

pub mod catalog;
pub mod doc_box;
pub mod document;
pub mod export_profile;
pub mod firm;
pub mod ids;
pub mod integration;
pub mod money;
pub mod organization;
pub mod payment;
pub mod task;
pub mod tax;

pub use catalog::{CatalogValidationError, Category, Contact, ContactKind, ContactRole, CostCenter};
pub use doc_box::{
    box_number_sequence, format_box_number, BoxStatus, BoxType, BoxValidationError, DocBox,
    VatStatus, WhtStatus,
};
pub use document::{
    mime_for, missing_documents, required_documents, DocType, Document, Requirement, SubDocument,
};
pub use export_profile::{ExportFormat, ExportHistory, ExportProfile, ExportTarget};
pub use firm::{AccountingFirm, FirmClientRelation, FirmMember, FirmRole, RelationStatus};
pub use ids::{
    BoxId, CategoryId, ContactId, CostCenterId, DocumentId, ExportHistoryId, ExportProfileId,
    FirmId, IntegrationId, OrganizationId, PaymentId, RelationId, SubDocumentId, TaskId, UserId,
};
pub use integration::{Integration, IntegrationKind, NotificationEvent};
pub use money::{Money, MoneyParseError};
pub use organization::{MemberRole, Organization, OrganizationMember, User};
pub use payment::{Payment, PaymentMethod};
pub use task::{Task, TaskStatus};
pub use tax::{
    filing_deadline, format_rate, parse_rate, PaymentStatus, TaxBreakdown, TaxInput, TaxMonth,
    WhtForm, DEFAULT_VAT_RATE_BP,
};
