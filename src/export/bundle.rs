//! Zip bundle writer
//!
//! Each box's files are stored under `{box_number}/` and a `manifest.json`
//! at the root lists every mapped row and its files. A file that cannot be
//! read is recorded in the manifest's `skipped` list and left out.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::TaxboxResult;
use crate::models::{ExportTarget, SubDocument};

use super::columns::headers;
use super::record::{BoxRecord, ExportRow};

pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub app_version: String,
    pub organization: String,
    pub target: ExportTarget,
    pub columns: Vec<String>,
    pub rows: Vec<ManifestRow>,
    #[serde(default)]
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRow {
    pub box_number: String,
    pub cells: Vec<String>,
    /// Paths inside the archive
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub box_number: String,
    pub file_name: String,
    pub reason: String,
}

impl SkippedFile {
    pub fn label(&self) -> String {
        format!("{}/{}", self.box_number, self.file_name)
    }
}

pub struct Bundle {
    pub bytes: Vec<u8>,
    pub manifest: Manifest,
}

/// Pick a name not yet used in the folder: `a.pdf`, `a (2).pdf`, ...
fn unique_name(used: &mut HashSet<String>, name: &str) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Build a zip of the boxes' files plus manifest
///
/// `records` and `rows` are parallel. `read_file` loads a stored file's bytes.
pub fn write_bundle<F>(
    organization: &str,
    target: ExportTarget,
    records: &[BoxRecord],
    rows: &[ExportRow],
    generated_at: DateTime<Utc>,
    mut read_file: F,
) -> TaxboxResult<Bundle>
where
    F: FnMut(&SubDocument) -> std::io::Result<Vec<u8>>,
{
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let mut manifest = Manifest {
        generated_at,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        organization: organization.to_string(),
        target,
        columns: headers(target).iter().map(|h| h.to_string()).collect(),
        rows: Vec::with_capacity(rows.len()),
        skipped: Vec::new(),
    };

    for (record, row) in records.iter().zip(rows) {
        let box_number = &record.doc_box.box_number;
        let mut used = HashSet::new();
        let mut files = Vec::new();

        for document in &record.documents {
            for file in &document.files {
                let bytes = match read_file(file) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(
                            box_number = %box_number,
                            file = %file.file_name,
                            error = %e,
                            "skipping unreadable file"
                        );
                        manifest.skipped.push(SkippedFile {
                            box_number: box_number.clone(),
                            file_name: file.file_name.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };
                let entry = format!("{}/{}", box_number, unique_name(&mut used, &file.file_name));
                zip.start_file(entry.as_str(), options)?;
                zip.write_all(&bytes)?;
                files.push(entry);
            }
        }

        manifest.rows.push(ManifestRow {
            box_number: box_number.clone(),
            cells: row.iter().map(|c| c.to_text()).collect(),
            files,
        });
    }

    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
    let bytes = zip.finish()?.into_inner();

    Ok(Bundle { bytes, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::record::map_box;
    use crate::models::{BoxType, DocBox, DocType, Document, Money, OrganizationId, UserId};
    use chrono::NaiveDate;
    use std::io::Read;

    fn record_with_files(names: &[&str]) -> BoxRecord {
        let doc_box = DocBox::new(
            OrganizationId::new(),
            "EXP-202501-0001",
            BoxType::Expense,
            "Taxi",
            NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            Money::from_satang(25_000),
            UserId::new(),
        );
        let mut document = Document::new(doc_box.id, DocType::Receipt);
        for name in names {
            document
                .files
                .push(SubDocument::new(*name, format!("x/{}", name), 3, UserId::new()));
        }
        BoxRecord {
            doc_box,
            contact: None,
            category: None,
            cost_center: None,
            documents: vec![document],
        }
    }

    #[test]
    fn test_unique_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_name(&mut used, "a.pdf"), "a.pdf");
        assert_eq!(unique_name(&mut used, "a.pdf"), "a (2).pdf");
        assert_eq!(unique_name(&mut used, "a.pdf"), "a (3).pdf");
        assert_eq!(unique_name(&mut used, "notes"), "notes");
        assert_eq!(unique_name(&mut used, "notes"), "notes (2)");
    }

    #[test]
    fn test_bundle_layout_and_skips() {
        let record = record_with_files(&["slip.jpg", "slip.jpg", "missing.pdf"]);
        let rows = vec![map_box(&record, ExportTarget::Generic)];

        let bundle = write_bundle(
            "Siam Widgets",
            ExportTarget::Generic,
            std::slice::from_ref(&record),
            &rows,
            Utc::now(),
            |file| {
                if file.file_name == "missing.pdf" {
                    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
                } else {
                    Ok(b"img".to_vec())
                }
            },
        )
        .unwrap();

        assert_eq!(bundle.manifest.rows.len(), 1);
        assert_eq!(
            bundle.manifest.rows[0].files,
            vec!["EXP-202501-0001/slip.jpg", "EXP-202501-0001/slip (2).jpg"]
        );
        assert_eq!(bundle.manifest.skipped.len(), 1);
        assert_eq!(bundle.manifest.skipped[0].label(), "EXP-202501-0001/missing.pdf");

        let mut archive = zip::ZipArchive::new(Cursor::new(bundle.bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        let mut manifest = String::new();
        archive
            .by_name(MANIFEST_NAME)
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        let parsed: Manifest = serde_json::from_str(&manifest).unwrap();
        assert_eq!(parsed.organization, "Siam Widgets");
        assert_eq!(parsed.columns[0], "Box Number");
        assert_eq!(parsed.rows[0].cells[0], "EXP-202501-0001");
    }
}
