//! Mail request and envelope types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::ValidateEmail;

/// Inbound mail request, as posted to `/sendmail`.
///
/// Every field is optional: absent fields are passed through to the
/// provider unless strict validation is enabled. Non-string values are
/// forwarded as their JSON text and left for the provider to judge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailRequest {
    /// Recipient email address
    #[serde(default, rename = "mailRecipient", deserialize_with = "lenient_text")]
    pub recipient: Option<String>,
    /// Email subject
    #[serde(default, rename = "mailSubject", deserialize_with = "lenient_text")]
    pub subject: Option<String>,
    /// Plain text body
    #[serde(default, rename = "mailText", deserialize_with = "lenient_text")]
    pub body: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl MailRequest {
    /// Strict-mode checks. Returns the reason for the first failed check.
    pub fn check_strict(&self) -> Result<(), &'static str> {
        match self.recipient.as_deref() {
            None => return Err("missing_recipient"),
            Some(r) if !r.validate_email() => return Err("invalid_recipient"),
            Some(_) => {}
        }

        if self.subject.is_none() {
            return Err("missing_subject");
        }

        if self.body.is_none() {
            return Err("missing_text");
        }

        Ok(())
    }
}

/// The message handed to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub to: Option<String>,
    pub from: String,
    pub subject: Option<String>,
    pub text: Option<String>,
}

impl Envelope {
    /// Build an envelope from a request, sent from the configured sender.
    pub fn new(request: MailRequest, sender: &str) -> Self {
        Self {
            to: request.recipient,
            from: sender.to_string(),
            subject: request.subject,
            text: request.body,
        }
    }
}
