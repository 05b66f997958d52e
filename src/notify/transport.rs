//! HTTP delivery of outbound requests

use std::time::Duration;

use crate::error::{TaxboxError, TaxboxResult};

use super::payload::{OutboundRequest, RequestBody};

/// Sends one request; implementations do not retry
pub trait WebhookTransport {
    fn send(&self, request: &OutboundRequest) -> TaxboxResult<()>;
}

/// Blocking `reqwest` client with a fixed timeout
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> TaxboxResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("taxbox/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TaxboxError::Notification(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl WebhookTransport for HttpTransport {
    fn send(&self, request: &OutboundRequest) -> TaxboxResult<()> {
        let mut builder = self.client.post(&request.url);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let response = builder
            .send()
            .map_err(|e| TaxboxError::Notification(format!("{}: {}", request.url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TaxboxError::Notification(format!(
                "{} responded with {}",
                request.url, status
            )));
        }
        tracing::debug!(url = %request.url, %status, "notification delivered");
        Ok(())
    }
}
