//! Custom error types for taxbox
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for taxbox operations
#[derive(Error, Debug)]
pub enum TaxboxError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// The acting user lacks the role required for an operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A box status change that the workflow does not allow
    #[error("Cannot move box from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Box is completed and must be reopened before editing
    #[error("Box is locked: {0}")]
    Locked(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TaxboxError {
    /// Create a "not found" error for organizations
    pub fn organization_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Organization",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for users
    pub fn user_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "User",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for firms
    pub fn firm_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Firm",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for boxes
    pub fn box_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Box",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for documents
    pub fn document_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Document",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for payments
    pub fn payment_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Payment",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for tasks
    pub fn task_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Task",
            identifier: identifier.into(),
        }
    }

    /// Create a permission error naming the missing capability
    pub fn denied(action: impl Into<String>) -> Self {
        Self::PermissionDenied(action.into())
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a permission error
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for TaxboxError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TaxboxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for TaxboxError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for TaxboxError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<zip::result::ZipError> for TaxboxError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Export(err.to_string())
    }
}

/// Result type alias for taxbox operations
pub type TaxboxResult<T> = Result<T, TaxboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaxboxError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = TaxboxError::box_not_found("EXP-202501-0001");
        assert_eq!(err.to_string(), "Box not found: EXP-202501-0001");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = TaxboxError::InvalidTransition {
            from: "Draft".into(),
            to: "Completed".into(),
        };
        assert_eq!(err.to_string(), "Cannot move box from Draft to Completed");
    }

    #[test]
    fn test_permission_denied() {
        let err = TaxboxError::denied("review boxes");
        assert!(err.is_permission_denied());
        assert_eq!(err.to_string(), "Permission denied: review boxes");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TaxboxError = io_err.into();
        assert!(matches!(err, TaxboxError::Io(_)));
    }
}
