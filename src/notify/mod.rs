//! Outbound notifications
//!
//! Events are posted to every enabled integration of an organization that
//! subscribes to them. Delivery is best effort: a failed integration is
//! logged and reported, and the rest are still tried. Nothing is retried.

pub mod payload;
pub mod transport;

pub use payload::{build_request, describe_box, event_title, OutboundRequest, RequestBody};
pub use transport::{HttpTransport, WebhookTransport};

use chrono::Utc;
use serde::Serialize;

use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{Integration, IntegrationId, NotificationEvent, OrganizationId};
use crate::storage::Storage;

/// An integration that could not be reached
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub integration_id: IntegrationId,
    pub name: String,
    pub error: String,
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub delivered: Vec<IntegrationId>,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Notifier<'a> {
    storage: &'a Storage,
    transport: &'a dyn WebhookTransport,
}

impl<'a> Notifier<'a> {
    pub fn new(storage: &'a Storage, transport: &'a dyn WebhookTransport) -> Self {
        Self { storage, transport }
    }

    fn organization_name(&self, organization_id: OrganizationId) -> TaxboxResult<String> {
        self.storage
            .organizations
            .get(organization_id)?
            .map(|o| o.name)
            .ok_or_else(|| TaxboxError::organization_not_found(organization_id.to_string()))
    }

    /// Deliver one event to a single integration
    pub fn send_to(
        &self,
        integration: &Integration,
        event: NotificationEvent,
        message: &str,
    ) -> TaxboxResult<()> {
        let org_name = self.organization_name(integration.organization_id)?;
        let request = build_request(
            integration,
            event,
            &org_name,
            message,
            Utc::now(),
            self.storage.settings.email_relay_url.as_deref(),
        )?;
        self.transport.send(&request)
    }

    /// Post `event` to every subscribed integration of an organization
    pub fn dispatch(
        &self,
        organization_id: OrganizationId,
        event: NotificationEvent,
        message: &str,
    ) -> TaxboxResult<DispatchReport> {
        let mut report = DispatchReport::default();
        for integration in self.storage.integrations.subscribers(organization_id, event)? {
            match self.send_to(&integration, event, message) {
                Ok(()) => report.delivered.push(integration.id),
                Err(e) => {
                    tracing::warn!(
                        integration = %integration.name,
                        kind = %integration.kind,
                        %event,
                        error = %e,
                        "notification failed"
                    );
                    report.failures.push(DispatchFailure {
                        integration_id: integration.id,
                        name: integration.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        if report.attempted() > 0 {
            tracing::info!(
                %event,
                delivered = report.delivered.len(),
                failed = report.failures.len(),
                "notifications dispatched"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Records requests; URLs containing `fail` are rejected
    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: RefCell<Vec<OutboundRequest>>,
    }

    impl WebhookTransport for RecordingTransport {
        fn send(&self, request: &OutboundRequest) -> TaxboxResult<()> {
            if request.url.contains("fail") {
                return Err(TaxboxError::Notification(format!("{} responded with 500", request.url)));
            }
            self.sent.borrow_mut().push(request.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;
    use crate::models::IntegrationKind;
    use crate::services::testutil::Fixture;

    fn add(fx: &Fixture, kind: IntegrationKind, target: &str, events: Vec<NotificationEvent>) -> Integration {
        let mut integration = Integration::new(fx.org, kind, target, target);
        integration.events = events;
        fx.storage.integrations.upsert(integration.clone()).unwrap();
        integration
    }

    #[test]
    fn test_dispatch_only_to_subscribers() {
        let fx = Fixture::new();
        add(&fx, IntegrationKind::Slack, "https://hooks.slack.com/a", vec![NotificationEvent::BoxSubmitted]);
        add(&fx, IntegrationKind::Discord, "https://discord.com/b", vec![NotificationEvent::BoxCompleted]);

        let transport = RecordingTransport::default();
        let report = Notifier::new(&fx.storage, &transport)
            .dispatch(fx.org, NotificationEvent::BoxSubmitted, "EXP-202501-0001 submitted")
            .unwrap();

        assert_eq!(report.delivered.len(), 1);
        assert!(report.is_clean());
        let sent = transport.sent.borrow();
        assert_eq!(sent[0].url, "https://hooks.slack.com/a");
    }

    #[test]
    fn test_failures_collected_and_others_still_sent() {
        let fx = Fixture::new();
        let broken = add(&fx, IntegrationKind::Webhook, "https://example.com/fail", NotificationEvent::all().to_vec());
        add(&fx, IntegrationKind::Webhook, "https://example.com/ok", NotificationEvent::all().to_vec());
        let mut disabled = add(&fx, IntegrationKind::Slack, "https://hooks.slack.com/off", NotificationEvent::all().to_vec());
        disabled.enabled = false;
        fx.storage.integrations.upsert(disabled).unwrap();

        let transport = RecordingTransport::default();
        let report = Notifier::new(&fx.storage, &transport)
            .dispatch(fx.org, NotificationEvent::ExportCompleted, "export ready")
            .unwrap();

        assert_eq!(report.attempted(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].integration_id, broken.id);
        assert_eq!(transport.sent.borrow().len(), 1);
    }

    #[test]
    fn test_email_without_relay_is_a_failure_not_an_error() {
        let fx = Fixture::new();
        add(&fx, IntegrationKind::Email, "acct@example.com", NotificationEvent::all().to_vec());
        let transport = RecordingTransport::default();
        let report = Notifier::new(&fx.storage, &transport)
            .dispatch(fx.org, NotificationEvent::BoxCompleted, "done")
            .unwrap();
        assert_eq!(report.failures.len(), 1);
    }
}
