//! Integration repository, persisted to integrations.json

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{Integration, IntegrationId, NotificationEvent, OrganizationId};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for Integration {
    type Key = IntegrationId;

    fn key(&self) -> IntegrationId {
        self.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IntegrationData {
    integrations: Vec<Integration>,
}

pub struct IntegrationRepository {
    path: PathBuf,
    integrations: Table<Integration>,
}

impl IntegrationRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            integrations: Table::new(),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: IntegrationData = read_json(&self.path)?;
        self.integrations.replace_all(file_data.integrations)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let integrations = self.integrations.sorted_by_key(|i| i.created_at)?;
        write_json_atomic(&self.path, &IntegrationData { integrations })
    }

    pub fn get(&self, id: IntegrationId) -> Result<Option<Integration>, TaxboxError> {
        self.integrations.get(id)
    }

    pub fn get_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Integration>, TaxboxError> {
        let mut list = self
            .integrations
            .filter(|i| i.organization_id == organization_id)?;
        list.sort_by_key(|i| i.created_at);
        Ok(list)
    }

    /// Enabled integrations of an organization subscribed to `event`
    pub fn subscribers(
        &self,
        organization_id: OrganizationId,
        event: NotificationEvent,
    ) -> Result<Vec<Integration>, TaxboxError> {
        Ok(self
            .get_by_organization(organization_id)?
            .into_iter()
            .filter(|i| i.wants(event))
            .collect())
    }

    pub fn upsert(&self, integration: Integration) -> Result<(), TaxboxError> {
        self.integrations.upsert(integration)
    }

    pub fn delete(&self, id: IntegrationId) -> Result<Option<Integration>, TaxboxError> {
        self.integrations.remove(id)
    }
}
