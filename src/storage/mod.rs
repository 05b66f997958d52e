//! Storage layer for taxbox
//!
//! JSON file collections with atomic writes, loaded into `RwLock`-guarded
//! tables, plus the uploaded-file store and the audit log.

pub mod boxes;
pub mod catalog;
pub mod documents;
pub mod exports;
pub mod file_io;
pub mod firms;
pub mod init;
pub mod integrations;
pub mod organizations;
pub mod payments;
pub mod table;
pub mod tasks;
pub mod users;

pub use boxes::BoxRepository;
pub use catalog::CatalogRepository;
pub use documents::DocumentRepository;
pub use exports::ExportRepository;
pub use file_io::{read_json, write_bytes_atomic, write_json_atomic};
pub use firms::FirmRepository;
pub use init::{default_categories, initialize_storage};
pub use integrations::IntegrationRepository;
pub use organizations::OrganizationRepository;
pub use payments::PaymentRepository;
pub use tasks::TaskRepository;
pub use users::UserRepository;

use serde::Serialize;

use crate::audit::{generate_diff, AuditEntry, AuditLogger, EntityType};
use crate::config::paths::TaxboxPaths;
use crate::config::settings::Settings;
use crate::error::TaxboxError;
use crate::models::{OrganizationId, UserId};

/// Who performed a mutation and which organization it belongs to
#[derive(Debug, Clone, Copy)]
pub struct AuditScope {
    pub actor: UserId,
    pub organization_id: Option<OrganizationId>,
}

impl AuditScope {
    pub fn new(actor: UserId) -> Self {
        Self {
            actor,
            organization_id: None,
        }
    }

    pub fn org(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    fn stamp(&self, entry: AuditEntry) -> AuditEntry {
        let entry = entry.by(self.actor.to_string());
        match self.organization_id {
            Some(org) => entry.in_organization(org.to_string()),
            None => entry,
        }
    }
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: TaxboxPaths,
    pub settings: Settings,
    pub users: UserRepository,
    pub organizations: OrganizationRepository,
    pub firms: FirmRepository,
    pub boxes: BoxRepository,
    pub documents: DocumentRepository,
    pub payments: PaymentRepository,
    pub catalog: CatalogRepository,
    pub tasks: TaskRepository,
    pub exports: ExportRepository,
    pub integrations: IntegrationRepository,
    audit: AuditLogger,
}

impl Storage {
    /// Create a new Storage instance; call `load_all` before use
    pub fn new(paths: TaxboxPaths) -> Result<Self, TaxboxError> {
        paths.ensure_directories()?;
        let settings = Settings::load_or_create(&paths)?;

        Ok(Self {
            settings,
            users: UserRepository::new(paths.users_file()),
            organizations: OrganizationRepository::new(paths.organizations_file()),
            firms: FirmRepository::new(paths.firms_file()),
            boxes: BoxRepository::new(paths.boxes_file()),
            documents: DocumentRepository::new(paths.documents_file()),
            payments: PaymentRepository::new(paths.payments_file()),
            catalog: CatalogRepository::new(paths.catalog_file()),
            tasks: TaskRepository::new(paths.tasks_file()),
            exports: ExportRepository::new(paths.exports_file()),
            integrations: IntegrationRepository::new(paths.integrations_file()),
            audit: AuditLogger::new(paths.audit_log()),
            paths,
        })
    }

    /// Open and load a store in one step
    pub fn open(paths: TaxboxPaths) -> Result<Self, TaxboxError> {
        let storage = Self::new(paths)?;
        storage.load_all()?;
        Ok(storage)
    }

    pub fn paths(&self) -> &TaxboxPaths {
        &self.paths
    }

    pub fn load_all(&self) -> Result<(), TaxboxError> {
        self.users.load()?;
        self.organizations.load()?;
        self.firms.load()?;
        self.boxes.load()?;
        self.documents.load()?;
        self.payments.load()?;
        self.catalog.load()?;
        self.tasks.load()?;
        self.exports.load()?;
        self.integrations.load()?;
        Ok(())
    }

    pub fn save_all(&self) -> Result<(), TaxboxError> {
        self.users.save()?;
        self.organizations.save()?;
        self.firms.save()?;
        self.boxes.save()?;
        self.documents.save()?;
        self.payments.save()?;
        self.catalog.save()?;
        self.tasks.save()?;
        self.exports.save()?;
        self.integrations.save()?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn log_create<T: Serialize>(
        &self,
        scope: AuditScope,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Result<(), TaxboxError> {
        let entry = AuditEntry::create(entity_type, entity_id, entity_name, entity);
        self.audit.log(&scope.stamp(entry))
    }

    /// Log an update; without an explicit summary one is derived from the snapshots
    #[allow(clippy::too_many_arguments)]
    pub fn log_update<T: Serialize>(
        &self,
        scope: AuditScope,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) -> Result<(), TaxboxError> {
        let mut entry =
            AuditEntry::update(entity_type, entity_id, entity_name, before, after, diff_summary);
        if entry.diff_summary.is_none() {
            if let (Some(b), Some(a)) = (&entry.before, &entry.after) {
                entry.diff_summary = generate_diff(b, a);
            }
        }
        self.audit.log(&scope.stamp(entry))
    }

    pub fn log_delete<T: Serialize>(
        &self,
        scope: AuditScope,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Result<(), TaxboxError> {
        let entry = AuditEntry::delete(entity_type, entity_id, entity_name, entity);
        self.audit.log(&scope.stamp(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Operation;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_storage_creation() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();

        assert!(temp_dir.path().join("data").exists());
        assert!(temp_dir.path().join("files").exists());
        assert!(!storage.is_initialized());
        assert_eq!(storage.boxes.count().unwrap(), 0);
    }

    #[test]
    fn test_log_update_derives_diff_and_scope() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TaxboxPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        let actor = UserId::new();
        let org = OrganizationId::new();

        storage
            .log_update(
                AuditScope::new(actor).org(org),
                EntityType::Box,
                "box-1",
                None,
                &json!({"status": "DRAFT"}),
                &json!({"status": "PENDING"}),
                None,
            )
            .unwrap();

        let entries = storage.audit().read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, Operation::Update);
        assert_eq!(entries[0].actor, Some(actor.to_string()));
        assert_eq!(entries[0].organization_id, Some(org.to_string()));
        assert_eq!(
            entries[0].diff_summary.as_deref(),
            Some("status: \"DRAFT\" -> \"PENDING\"")
        );
    }
}
