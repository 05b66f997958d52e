//! Audit logging
//!
//! Every mutation made through the services is appended to `audit.log` as one
//! JSON line carrying the acting user, the organization and before/after
//! snapshots. `generate_diff` produces the one-line change summary.

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
