//! Append-only JSONL audit logger

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::error::{TaxboxError, TaxboxResult};

use super::entry::AuditEntry;

/// Writes one JSON object per line to the audit log, flushing every write
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    pub fn log(&self, entry: &AuditEntry) -> TaxboxResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| TaxboxError::Io(format!("Failed to open audit log: {}", e)))?;

        let json = serde_json::to_string(entry)
            .map_err(|e| TaxboxError::Json(format!("Failed to serialize audit entry: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| TaxboxError::Io(format!("Failed to write audit entry: {}", e)))?;

        file.flush()
            .map_err(|e| TaxboxError::Io(format!("Failed to flush audit log: {}", e)))
    }

    /// All entries, oldest first
    pub fn read_all(&self) -> TaxboxResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| TaxboxError::Io(format!("Failed to open audit log: {}", e)))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                TaxboxError::Io(format!("Failed to read audit log line {}: {}", line_num + 1, e))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                TaxboxError::Json(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// The most recent `count` entries, optionally limited to one organization
    pub fn read_recent(
        &self,
        count: usize,
        organization_id: Option<&str>,
    ) -> TaxboxResult<Vec<AuditEntry>> {
        let mut entries = self.read_all()?;
        if let Some(org) = organization_id {
            entries.retain(|e| e.organization_id.as_deref() == Some(org));
        }
        let start = entries.len().saturating_sub(count);
        Ok(entries.split_off(start))
    }

    /// History of one entity, by display ID
    pub fn read_for_entity(&self, entity_id: &str) -> TaxboxResult<Vec<AuditEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.entity_id == entity_id)
            .collect())
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{EntityType, Operation};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_logger() -> (AuditLogger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp_dir.path().join("audit.log"));
        (logger, temp_dir)
    }

    #[test]
    fn test_empty_log() {
        let (logger, _temp) = create_test_logger();
        assert!(logger.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_log_and_read_back() {
        let (logger, temp) = create_test_logger();
        let entry = AuditEntry::create(EntityType::Box, "box-1", None, &json!({"a": 1}));
        logger.log(&entry).unwrap();

        // A second logger on the same file sees the entry
        let reopened = AuditLogger::new(temp.path().join("audit.log"));
        let entries = reopened.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, Operation::Create);
    }

    #[test]
    fn test_read_recent_filters_by_organization() {
        let (logger, _temp) = create_test_logger();
        for i in 0..6 {
            let org = if i % 2 == 0 { "org-a" } else { "org-b" };
            let entry = AuditEntry::create(EntityType::Task, format!("task-{}", i), None, &json!({}))
                .in_organization(org);
            logger.log(&entry).unwrap();
        }

        let recent = logger.read_recent(2, Some("org-a")).unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["task-2", "task-4"]);

        assert_eq!(logger.read_recent(10, None).unwrap().len(), 6);
        assert_eq!(logger.read_for_entity("task-5").unwrap().len(), 1);
    }
}
