//! SendGrid v3 `mail/send` client.
//!
//! One POST per envelope, no retries. Any non-2xx answer is a failure.
//! Reference: https://www.twilio.com/docs/sendgrid/api-reference/mail-send/mail-send

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use super::types::Envelope;
use crate::Config;

/// Errors from a single send attempt.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("SendGrid request timed out after {0:?}")]
    Timeout(Duration),

    #[error("SendGrid request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("SendGrid rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// SendGrid API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct SendGridClient {
    http: Client,
    inner: Arc<SendGridInner>,
}

struct SendGridInner {
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl SendGridClient {
    /// Create a client for the given API base URL.
    pub fn new(
        base_url: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;

        Ok(Self {
            http,
            inner: Arc::new(SendGridInner {
                endpoint: format!("{}/v3/mail/send", base_url.trim_end_matches('/')),
                api_key,
                timeout,
            }),
        })
    }

    /// Create a client from application configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.sendgrid_api_url,
            config.sendgrid_api_key.clone(),
            config.sendgrid_timeout,
        )
    }

    /// Submit one envelope.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), DispatchError> {
        let timeout = self.inner.timeout;

        info!(
            to = ?envelope.to,
            has_subject = envelope.subject.is_some(),
            text_length = envelope.text.as_ref().map(|s| s.len()).unwrap_or(0),
            "sendgrid_send_starting"
        );

        let response = self
            .http
            .post(&self.inner.endpoint)
            .bearer_auth(&self.inner.api_key)
            .timeout(timeout)
            .json(&SendGridMail::from(envelope))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!(timeout_ms = timeout.as_millis() as u64, "sendgrid_send_timeout");
                    DispatchError::Timeout(timeout)
                } else {
                    error!(error = %e, "sendgrid_send_request_error");
                    DispatchError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                status_code = status.as_u16(),
                body = %body,
                "sendgrid_send_rejected"
            );
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            to = ?envelope.to,
            status_code = status.as_u16(),
            "sendgrid_send_complete"
        );

        Ok(())
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Serialize)]
struct SendGridMail<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

impl<'a> From<&'a Envelope> for SendGridMail<'a> {
    fn from(envelope: &'a Envelope) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: envelope
                    .to
                    .as_deref()
                    .map(|email| Address { email })
                    .into_iter()
                    .collect(),
            }],
            from: Address {
                email: &envelope.from,
            },
            subject: envelope.subject.as_deref(),
            content: envelope
                .text
                .as_deref()
                .map(|value| Content {
                    content_type: "text/plain",
                    value,
                })
                .into_iter()
                .collect(),
        }
    }
}
