//! Reports module for taxbox
//!
//! Read-only aggregations over the store: the firm dashboard with client
//! health scores and the monthly VAT/WHT summary of an organization.

pub mod firm_dashboard;
pub mod tax_summary;

pub use firm_dashboard::{health_score, ClientHealth, FirmDashboardReport, HealthLevel, StatusCounts};
pub use tax_summary::{TaxSummaryReport, WhtLine};
