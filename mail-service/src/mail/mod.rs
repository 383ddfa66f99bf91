//! Outbound mail dispatch.
//!
//! This module provides:
//! - The inbound mail request and the envelope built from it
//! - A SendGrid client that submits one envelope per call
//!
//! ```text
//! MailRequest → Envelope (from = configured sender) → SendGridClient::send()
//! ```

pub mod sendgrid;
pub mod types;

pub use sendgrid::{DispatchError, SendGridClient};
pub use types::{Envelope, MailRequest};
