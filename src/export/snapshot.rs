//! Full snapshot of one organization's data as JSON or YAML

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{
    Category, Contact, CostCenter, DocBox, Document, ExportProfile, Integration, Organization,
    OrganizationId, OrganizationMember, Payment, Task,
};
use crate::storage::Storage;

/// Current snapshot schema version
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSnapshot {
    pub schema_version: String,
    pub exported_at: DateTime<Utc>,
    pub app_version: String,

    pub organization: Organization,
    pub members: Vec<OrganizationMember>,
    pub boxes: Vec<DocBox>,
    pub documents: Vec<Document>,
    pub payments: Vec<Payment>,
    pub categories: Vec<Category>,
    pub contacts: Vec<Contact>,
    pub cost_centers: Vec<CostCenter>,
    pub tasks: Vec<Task>,
    pub export_profiles: Vec<ExportProfile>,
    /// Tokens are masked
    pub integrations: Vec<Integration>,

    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub box_count: usize,
    pub file_count: usize,
    pub payment_count: usize,
    pub earliest_box: Option<String>,
    pub latest_box: Option<String>,
}

impl OrganizationSnapshot {
    /// Collect everything stored for an organization
    pub fn collect(storage: &Storage, organization_id: OrganizationId) -> TaxboxResult<Self> {
        let organization = storage
            .organizations
            .get(organization_id)?
            .ok_or_else(|| TaxboxError::organization_not_found(organization_id.to_string()))?;

        let boxes = storage.boxes.get_by_organization(organization_id)?;
        let mut documents = Vec::new();
        let mut payments = Vec::new();
        for doc_box in &boxes {
            documents.extend(storage.documents.get_by_box(doc_box.id)?);
            payments.extend(storage.payments.get_by_box(doc_box.id)?);
        }

        let metadata = SnapshotMetadata {
            box_count: boxes.len(),
            file_count: documents.iter().map(|d| d.files.len()).sum(),
            payment_count: payments.len(),
            earliest_box: boxes.iter().map(|b| b.document_date).min().map(|d| d.to_string()),
            latest_box: boxes.iter().map(|b| b.document_date).max().map(|d| d.to_string()),
        };

        Ok(Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            members: storage.organizations.members_of(organization_id)?,
            categories: storage.catalog.categories_of(organization_id, true)?,
            contacts: storage.catalog.contacts_of(organization_id, true)?,
            cost_centers: storage.catalog.cost_centers_of(organization_id, true)?,
            tasks: storage.tasks.get_by_organization(organization_id)?,
            export_profiles: storage.exports.profiles_of(organization_id)?,
            integrations: storage
                .integrations
                .get_by_organization(organization_id)?
                .iter()
                .map(Integration::redacted)
                .collect(),
            organization,
            boxes,
            documents,
            payments,
            metadata,
        })
    }
}

pub fn write_json<W: Write>(snapshot: &OrganizationSnapshot, writer: &mut W) -> TaxboxResult<()> {
    serde_json::to_writer_pretty(writer, snapshot)
        .map_err(|e| TaxboxError::Export(e.to_string()))
}

pub fn write_yaml<W: Write>(snapshot: &OrganizationSnapshot, writer: &mut W) -> TaxboxResult<()> {
    let export_err = |e: std::io::Error| TaxboxError::Export(e.to_string());
    writeln!(writer, "# taxbox snapshot: {}", snapshot.organization.name).map_err(export_err)?;
    writeln!(writer, "# Generated: {}", snapshot.exported_at).map_err(export_err)?;
    writeln!(writer, "# App Version: {}", snapshot.app_version).map_err(export_err)?;
    writeln!(writer).map_err(export_err)?;

    serde_yaml::to_writer(writer, snapshot).map_err(|e| TaxboxError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::Fixture;
    use crate::services::{IntegrationService, NewIntegration};
    use crate::models::IntegrationKind;

    #[test]
    fn test_snapshot_collects_organization_data() {
        let fx = Fixture::new();
        fx.expense_box(true, None);
        fx.expense_box(false, Some(300));
        IntegrationService::new(&fx.storage, fx.owner)
            .create(
                fx.org,
                NewIntegration {
                    kind: IntegrationKind::Line,
                    name: "Team LINE".into(),
                    target: "https://notify-api.line.me/api/notify".into(),
                    token: Some("secret-token".into()),
                    events: Vec::new(),
                },
            )
            .unwrap();

        let snapshot = OrganizationSnapshot::collect(&fx.storage, fx.org).unwrap();
        assert_eq!(snapshot.organization.name, "Siam Widgets");
        assert_eq!(snapshot.metadata.box_count, 2);
        assert_eq!(snapshot.metadata.earliest_box.as_deref(), Some("2025-01-15"));
        assert!(!snapshot.categories.is_empty());
        assert_eq!(snapshot.integrations[0].token.as_deref(), Some("***"));

        let mut json = Vec::new();
        write_json(&snapshot, &mut json).unwrap();
        let parsed: OrganizationSnapshot = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed.boxes.len(), 2);
        assert!(!String::from_utf8(json).unwrap().contains("secret-token"));
    }

    #[test]
    fn test_yaml_has_header() {
        let fx = Fixture::new();
        let snapshot = OrganizationSnapshot::collect(&fx.storage, fx.org).unwrap();
        let mut out = Vec::new();
        write_yaml(&snapshot, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("# taxbox snapshot: Siam Widgets"));
        assert!(text.contains("schema_version: 1.0.0"));
    }
}
