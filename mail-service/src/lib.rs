//! Mail Service - bearer-token authenticated proxy to SendGrid.
//!
//! This library provides the modules behind the `mail-service` binary:
//! - `config`: environment configuration, fail-fast on missing values
//! - `mail`: envelope construction and the SendGrid client
//! - `web`: routes, token verification, access log, CORS and security headers
//! - `telemetry`: tracing subscriber setup
//! - `shutdown`: SIGINT/SIGTERM handling for graceful shutdown
//!
//! ## Request Flow
//!
//! ```text
//! Request → CORS → Access Log → Security Headers → Route
//!         → (POST /sendmail) Token Verifier → Mail Dispatcher → SendGrid
//! ```

pub mod config;
pub mod mail;
pub mod shutdown;
pub mod telemetry;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use mail::{DispatchError, Envelope, MailRequest, SendGridClient};
pub use web::{router, ApiError, AppState, Identity, TokenVerifier};
