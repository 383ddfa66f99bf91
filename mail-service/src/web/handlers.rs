//! Endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use super::error::ApiError;
use super::token::{Identity, TokenVerifier};
use crate::mail::{Envelope, MailRequest, SendGridClient};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<TokenVerifier>,
    pub mailer: SendGridClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let mailer = SendGridClient::from_config(&config)?;
        let verifier = TokenVerifier::new(&config.jwt_secret);

        Ok(Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            mailer,
        })
    }
}

/// JSON body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check endpoint.
pub async fn health() -> Json<ApiResponse> {
    Json(ApiResponse::message("The Mail Service"))
}

// =============================================================================
// Send Mail
// =============================================================================

/// Send-mail endpoint. Runs behind the bearer token middleware.
///
/// A body without a JSON content type is treated as an empty request, so
/// every field is absent and the body is never read. A malformed or
/// oversized JSON body is rejected.
pub async fn send_mail(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<MailRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => MailRequest::default(),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(limit = super::access_log::MAX_BODY_BYTES, "sendmail_body_too_large");
            return Err(ApiError::PayloadTooLarge);
        }
        Err(rejection) => {
            warn!(error = %rejection, "sendmail_body_invalid");
            return Err(ApiError::InvalidBody);
        }
    };

    info!(
        subject_claim = ?identity.subject(),
        recipient = ?request.recipient,
        has_subject = request.subject.is_some(),
        has_text = request.body.is_some(),
        "sendmail_received"
    );

    if state.config.strict_validation {
        if let Err(reason) = request.check_strict() {
            warn!(reason = reason, recipient = ?request.recipient, "sendmail_validation_failed");
            return Err(ApiError::InvalidMailRequest);
        }
    }

    let envelope = Envelope::new(request, &state.config.sender);

    if let Err(e) = state.mailer.send(&envelope).await {
        error!(error = %e, to = ?envelope.to, "sendmail_dispatch_failed");
        return Err(ApiError::MailDispatch);
    }

    info!(to = ?envelope.to, "sendmail_sent");

    Ok(Json(ApiResponse::message("Email sent")))
}
