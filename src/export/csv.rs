//! CSV writer
//!
//! Output starts with a UTF-8 byte order mark so spreadsheet programs
//! detect Thai headers correctly.

use crate::error::{TaxboxError, TaxboxResult};
use crate::models::ExportTarget;

use super::columns::headers;
use super::record::ExportRow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write a header row and `rows` as CSV bytes
pub fn write_csv(target: ExportTarget, rows: &[ExportRow]) -> TaxboxResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(headers(target))?;
    for row in rows {
        writer.write_record(row.iter().map(|cell| cell.to_text()))?;
    }
    writer
        .into_inner()
        .map_err(|e| TaxboxError::Export(format!("Failed to finish CSV: {}", e)))
}
