//! Integration service
//!
//! Notification channels of an organization. Managing them needs the
//! manage capability; sending a test message goes through the notifier.

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{
    Integration, IntegrationId, IntegrationKind, NotificationEvent, OrganizationId, UserId,
};
use crate::notify::{Notifier, WebhookTransport};
use crate::storage::{AuditScope, Storage};

use super::access::{AccessService, Capability};

/// Input for a new integration
#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub kind: IntegrationKind,
    pub name: String,
    pub target: String,
    pub token: Option<String>,
    /// Every event when empty
    pub events: Vec<NotificationEvent>,
}

pub struct IntegrationService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> IntegrationService<'a> {
    pub fn new(storage: &'a Storage, actor: UserId) -> Self {
        Self { storage, actor }
    }

    fn require(&self, organization_id: OrganizationId, capability: Capability) -> TaxboxResult<()> {
        AccessService::new(self.storage).require(self.actor, organization_id, capability)?;
        Ok(())
    }

    fn get(&self, id: IntegrationId, capability: Capability) -> TaxboxResult<Integration> {
        let integration = self
            .storage
            .integrations
            .get(id)?
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Integration",
                identifier: id.to_string(),
            })?;
        self.require(integration.organization_id, capability)?;
        Ok(integration)
    }

    pub fn create(&self, organization_id: OrganizationId, input: NewIntegration) -> TaxboxResult<Integration> {
        self.require(organization_id, Capability::Manage)?;
        let mut integration = Integration::new(organization_id, input.kind, input.name, input.target);
        integration.token = input.token.filter(|t| !t.trim().is_empty());
        if !input.events.is_empty() {
            let mut events = input.events;
            events.dedup();
            integration.events = events;
        }
        integration.validate().map_err(TaxboxError::Validation)?;

        self.storage.integrations.upsert(integration.clone())?;
        self.storage.integrations.save()?;
        self.storage.log_create(
            AuditScope::new(self.actor).org(organization_id),
            EntityType::Integration,
            integration.id.to_string(),
            Some(integration.name.clone()),
            &integration.redacted(),
        )?;
        tracing::info!(kind = %integration.kind, name = %integration.name, "integration added");
        Ok(integration)
    }

    pub fn list(&self, organization_id: OrganizationId) -> TaxboxResult<Vec<Integration>> {
        self.require(organization_id, Capability::View)?;
        self.storage.integrations.get_by_organization(organization_id)
    }

    /// Find by name or ID within an organization
    pub fn find(&self, organization_id: OrganizationId, identifier: &str) -> TaxboxResult<Integration> {
        self.list(organization_id)?
            .into_iter()
            .find(|i| {
                i.name.eq_ignore_ascii_case(identifier)
                    || i.id.to_string() == identifier
                    || i.id.matches_short(identifier)
            })
            .ok_or_else(|| TaxboxError::NotFound {
                entity_type: "Integration",
                identifier: identifier.to_string(),
            })
    }

    pub fn set_enabled(&self, id: IntegrationId, enabled: bool) -> TaxboxResult<Integration> {
        let mut integration = self.get(id, Capability::Manage)?;
        let before = integration.redacted();
        integration.enabled = enabled;
        self.storage.integrations.upsert(integration.clone())?;
        self.storage.integrations.save()?;
        self.storage.log_update(
            AuditScope::new(self.actor).org(integration.organization_id),
            EntityType::Integration,
            integration.id.to_string(),
            Some(integration.name.clone()),
            &before,
            &integration.redacted(),
            Some(format!("enabled: {} -> {}", before.enabled, enabled)),
        )?;
        Ok(integration)
    }

    pub fn remove(&self, id: IntegrationId) -> TaxboxResult<Integration> {
        let integration = self.get(id, Capability::Manage)?;
        self.storage.integrations.delete(id)?;
        self.storage.integrations.save()?;
        self.storage.log_delete(
            AuditScope::new(self.actor).org(integration.organization_id),
            EntityType::Integration,
            integration.id.to_string(),
            Some(integration.name.clone()),
            &integration.redacted(),
        )?;
        Ok(integration)
    }

    /// Send a test message, even if the integration is disabled
    pub fn test(&self, id: IntegrationId, transport: &dyn WebhookTransport) -> TaxboxResult<()> {
        let integration = self.get(id, Capability::Manage)?;
        let event = integration
            .events
            .first()
            .copied()
            .unwrap_or(NotificationEvent::BoxSubmitted);
        Notifier::new(self.storage, transport).send_to(
            &integration,
            event,
            &format!("Test message from taxbox for '{}'", integration.name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberRole;
    use crate::notify::testing::RecordingTransport;
    use crate::services::testutil::Fixture;

    fn slack() -> NewIntegration {
        NewIntegration {
            kind: IntegrationKind::Slack,
            name: "Ops channel".into(),
            target: "https://hooks.slack.com/services/T/B/X".into(),
            token: None,
            events: vec![],
        }
    }

    #[test]
    fn test_create_defaults_to_all_events() {
        let fx = Fixture::new();
        let svc = IntegrationService::new(&fx.storage, fx.owner);
        let integration = svc.create(fx.org, slack()).unwrap();
        assert_eq!(integration.events.len(), NotificationEvent::all().len());
        assert_eq!(svc.find(fx.org, "ops channel").unwrap().id, integration.id);
    }

    #[test]
    fn test_invalid_target_rejected() {
        let fx = Fixture::new();
        let mut input = slack();
        input.target = "hooks.slack.com".into();
        let err = IntegrationService::new(&fx.storage, fx.owner)
            .create(fx.org, input)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_only_managers_configure() {
        let fx = Fixture::new();
        let accountant = fx.member("acct@example.com", MemberRole::Accountant);
        let err = IntegrationService::new(&fx.storage, accountant)
            .create(fx.org, slack())
            .unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_disable_and_send_test_message() {
        let fx = Fixture::new();
        let svc = IntegrationService::new(&fx.storage, fx.owner);
        let integration = svc.create(fx.org, slack()).unwrap();
        let disabled = svc.set_enabled(integration.id, false).unwrap();
        assert!(!disabled.enabled);

        let transport = RecordingTransport::default();
        svc.test(integration.id, &transport).unwrap();
        assert_eq!(transport.sent.borrow().len(), 1);

        svc.remove(integration.id).unwrap();
        assert!(svc.list(fx.org).unwrap().is_empty());
    }
}
