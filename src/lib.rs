//! taxbox - accounting document boxes for Thai SMEs and accounting firms
//!
//! Organizations collect the source documents of each transaction in a box,
//! submit it for review, and an in-house accountant or an outside accounting
//! firm completes it. Boxes carry the VAT and withholding-tax (WHT) figures
//! and the payment status derived from them, and completed work is exported
//! to bookkeeping programs.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Paths and settings
//! - `error`: Custom error types
//! - `models`: Core data models (organizations, firms, boxes, documents, tax math)
//! - `storage`: JSON file storage layer and stored files
//! - `audit`: Audit logging system
//! - `services`: Business logic layer with role checks
//! - `export`: Bookkeeping exports (xlsx, csv, zip) and snapshots
//! - `reports`: Firm dashboard and monthly tax summary
//! - `notify`: LINE, Slack, Discord, webhook and e-mail notifications
//! - `display`: Terminal tables
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use taxbox::config::paths::TaxboxPaths;
//! use taxbox::storage::Storage;
//!
//! let storage = Storage::open(TaxboxPaths::new()?)?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod notify;
pub mod reports;
pub mod services;
pub mod storage;

pub use error::{TaxboxError, TaxboxResult};
