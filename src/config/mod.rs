//! Configuration module for taxbox
//!
//! This module provides configuration management including:
//! - Platform config-dir path resolution
//! - Settings persistence (tax defaults, dashboard weights, delivery options)

pub mod paths;
pub mod settings;

pub use paths::TaxboxPaths;
pub use settings::Settings;
