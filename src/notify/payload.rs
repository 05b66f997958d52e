//! Request bodies for each integration kind

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{DocBox, Integration, IntegrationKind, NotificationEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// One POST to deliver
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub bearer_token: Option<String>,
    pub body: RequestBody,
}

/// Short human title of an event, used as the e-mail subject
pub fn event_title(event: NotificationEvent) -> &'static str {
    match event {
        NotificationEvent::BoxSubmitted => "Box submitted for review",
        NotificationEvent::DocsRequested => "Documents requested",
        NotificationEvent::BoxCompleted => "Box completed",
        NotificationEvent::PaymentRecorded => "Payment recorded",
        NotificationEvent::TaskAssigned => "Task assigned",
        NotificationEvent::ExportCompleted => "Export ready",
    }
}

/// One-line description of a box event
pub fn describe_box(event: NotificationEvent, doc_box: &DocBox) -> String {
    let head = format!("{} {}", doc_box.box_number, doc_box.title);
    match event {
        NotificationEvent::BoxSubmitted => {
            format!("{} was submitted for review ({})", head, doc_box.total_amount)
        }
        NotificationEvent::DocsRequested => format!(
            "{} needs more documents: {}",
            head,
            doc_box.need_docs_reason.as_deref().unwrap_or("-")
        ),
        NotificationEvent::BoxCompleted => format!("{} was completed", head),
        NotificationEvent::PaymentRecorded => format!(
            "{} payment recorded, {} of {} paid ({})",
            head,
            doc_box.paid_amount,
            doc_box.breakdown().net_payable,
            doc_box.payment_status
        ),
        NotificationEvent::TaskAssigned | NotificationEvent::ExportCompleted => head,
    }
}

/// Build the request for one integration
///
/// E-mail is posted to `email_relay_url`; without one, e-mail cannot be sent.
pub fn build_request(
    integration: &Integration,
    event: NotificationEvent,
    organization_name: &str,
    message: &str,
    occurred_at: DateTime<Utc>,
    email_relay_url: Option<&str>,
) -> TaxboxResult<OutboundRequest> {
    let text = format!("[{}] {}", organization_name, message);
    let request = match integration.kind {
        IntegrationKind::Line => OutboundRequest {
            url: integration.target.clone(),
            bearer_token: integration.token.clone(),
            body: RequestBody::Form(vec![("message".to_string(), text)]),
        },
        IntegrationKind::Slack => OutboundRequest {
            url: integration.target.clone(),
            bearer_token: None,
            body: RequestBody::Json(json!({ "text": text })),
        },
        IntegrationKind::Discord => OutboundRequest {
            url: integration.target.clone(),
            bearer_token: None,
            body: RequestBody::Json(json!({ "content": text })),
        },
        IntegrationKind::Webhook => OutboundRequest {
            url: integration.target.clone(),
            bearer_token: integration.token.clone(),
            body: RequestBody::Json(json!({
                "event": event.key(),
                "organization_id": integration.organization_id.as_uuid().to_string(),
                "message": message,
                "occurred_at": occurred_at.to_rfc3339(),
            })),
        },
        IntegrationKind::Email => {
            let relay = email_relay_url.ok_or_else(|| {
                TaxboxError::Notification("no e-mail relay URL is configured".into())
            })?;
            OutboundRequest {
                url: relay.to_string(),
                bearer_token: integration.token.clone(),
                body: RequestBody::Json(json!({
                    "to": integration.target,
                    "subject": format!("[{}] {}", organization_name, event_title(event)),
                    "text": message,
                })),
            }
        }
    };
    Ok(request)
}
