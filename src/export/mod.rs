//! Export pipeline
//!
//! Boxes are loaded into `BoxRecord`s, mapped to rows through the target's
//! column dictionary, and written as:
//! - XLSX: one worksheet for spreadsheet import
//! - CSV: UTF-8 with BOM
//! - ZIP: the boxes' files plus a manifest
//!
//! An organization can also be dumped whole as a JSON or YAML snapshot.

pub mod bundle;
pub mod columns;
pub mod csv;
pub mod record;
pub mod snapshot;
pub mod xlsx;

pub use bundle::{write_bundle, Bundle, Manifest, ManifestRow, SkippedFile, MANIFEST_NAME};
pub use columns::{columns_for, headers, ColumnKey, DateStyle};
pub use csv::write_csv;
pub use record::{map_box, BoxRecord, Cell, ExportRow};
pub use snapshot::{write_json, write_yaml, OrganizationSnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use xlsx::write_xlsx;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// A finished export ready to save or download
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn to_data_url(&self) -> String {
        to_data_url(&self.mime_type, &self.bytes)
    }
}

/// `data:{mime};base64,...` URL for a browser download
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        assert_eq!(to_data_url("text/csv", b"a,b"), "data:text/csv;base64,YSxi");
        assert_eq!(to_data_url("application/zip", b""), "data:application/zip;base64,");
    }
}
