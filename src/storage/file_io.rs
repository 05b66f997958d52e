//! File I/O with atomic writes
//!
//! Collections and uploaded files are written to a temp file in the target
//! directory and renamed into place, so a crash never leaves a torn file.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::TaxboxError;

/// Read JSON from a file, returning the default value if it doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, TaxboxError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| TaxboxError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| TaxboxError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), TaxboxError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    write_atomic(path, "tmp", |writer| {
        serde_json::to_writer_pretty(writer, data)
            .map_err(|e| TaxboxError::Storage(format!("Failed to serialize data: {}", e)))
    })
}

/// Write raw bytes atomically, used for uploaded documents
pub fn write_bytes_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), TaxboxError> {
    write_atomic(path.as_ref(), "part", |writer| {
        writer
            .write_all(bytes)
            .map_err(|e| TaxboxError::Storage(format!("Failed to write data: {}", e)))
    })
}

fn write_atomic<F>(path: &Path, temp_extension: &str, fill: F) -> Result<(), TaxboxError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), TaxboxError>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            TaxboxError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = temp_path_for(path, temp_extension);

    let file = File::create(&temp_path)
        .map_err(|e| TaxboxError::Storage(format!("Failed to create temp file: {}", e)))?;
    let mut writer = BufWriter::new(file);

    if let Err(e) = fill(&mut writer) {
        drop(writer);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    writer
        .flush()
        .map_err(|e| TaxboxError::Storage(format!("Failed to flush data: {}", e)))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| TaxboxError::Storage(format!("Failed to sync data: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        TaxboxError::Storage(format!("Failed to rename temp file: {}", e))
    })
}

fn temp_path_for(path: &Path, temp_extension: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(temp_extension);
    path.with_file_name(name)
}
