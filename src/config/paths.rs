//! Path management for taxbox
//!
//! ## Path Resolution Order
//!
//! 1. `TAXBOX_DATA_DIR` environment variable (if set)
//! 2. The platform config directory from `directories`
//!    (`~/.config/taxbox` on Linux, `%APPDATA%\taxbox` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::TaxboxError;
use crate::models::{BoxId, OrganizationId};

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "TAXBOX_DATA_DIR";

/// Manages all paths used by taxbox
#[derive(Debug, Clone)]
pub struct TaxboxPaths {
    /// Base directory for all taxbox data
    base_dir: PathBuf,
}

impl TaxboxPaths {
    /// Create a new TaxboxPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform config directory can be determined.
    pub fn new() -> Result<Self, TaxboxError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            ProjectDirs::from("", "", "taxbox")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    TaxboxError::Config("Could not determine a config directory".into())
                })?
        };

        Ok(Self { base_dir })
    }

    /// Create TaxboxPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Directory holding the JSON collections
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Directory holding uploaded document files
    pub fn files_dir(&self) -> PathBuf {
        self.base_dir.join("files")
    }

    /// Directory a box's files are copied into
    pub fn box_files_dir(&self, organization_id: OrganizationId, box_id: BoxId) -> PathBuf {
        self.files_dir()
            .join(organization_id.as_uuid().to_string())
            .join(box_id.as_uuid().to_string())
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir().join("users.json")
    }

    pub fn organizations_file(&self) -> PathBuf {
        self.data_dir().join("organizations.json")
    }

    pub fn firms_file(&self) -> PathBuf {
        self.data_dir().join("firms.json")
    }

    pub fn boxes_file(&self) -> PathBuf {
        self.data_dir().join("boxes.json")
    }

    pub fn documents_file(&self) -> PathBuf {
        self.data_dir().join("documents.json")
    }

    pub fn payments_file(&self) -> PathBuf {
        self.data_dir().join("payments.json")
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.data_dir().join("catalog.json")
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir().join("tasks.json")
    }

    pub fn exports_file(&self) -> PathBuf {
        self.data_dir().join("exports.json")
    }

    pub fn integrations_file(&self) -> PathBuf {
        self.data_dir().join("integrations.json")
    }

    /// Ensure the base, data and files directories exist
    pub fn ensure_directories(&self) -> Result<(), TaxboxError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| TaxboxError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| TaxboxError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.files_dir())
            .map_err(|e| TaxboxError::Io(format!("Failed to create files directory: {}", e)))?;

        Ok(())
    }

    /// Check if taxbox has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.files_dir(), temp_dir.path().join("files"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.files_dir().exists());
        assert!(!paths.is_initialized());
    }

    #[test]
    fn test_box_files_dir_is_nested_by_organization() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());
        let org = OrganizationId::new();
        let box_id = BoxId::new();

        let dir = paths.box_files_dir(org, box_id);
        assert!(dir.starts_with(paths.files_dir().join(org.as_uuid().to_string())));
        assert!(dir.ends_with(box_id.as_uuid().to_string()));
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(
            paths.boxes_file(),
            temp_dir.path().join("data").join("boxes.json")
        );
    }
}
