//! Bearer token verification.
//!
//! Callers authenticate with an HS256-signed JWT issued by another service
//! that shares `JWT_SECRET`. The claims are opaque to us: a token is accepted
//! as long as its signature checks out and any `exp`/`nbf` claims hold.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::{error, info, warn};

use super::{error::ApiError, AppState};

/// Decoded claims of a verified token.
///
/// Inserted into request extensions by [`require_bearer_token`].
#[derive(Debug, Clone, PartialEq)]
pub struct Identity(pub Value);

impl Identity {
    /// The `sub` claim, when the issuer set one.
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }
}

/// Why a token was refused.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("no bearer token in Authorization header")]
    Missing,

    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("token verification failed: {0}")]
    Fault(#[source] jsonwebtoken::errors::Error),
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Missing => ApiError::NoToken,
            TokenError::Invalid(_) => ApiError::InvalidToken,
            TokenError::Fault(_) => ApiError::TokenVerification,
        }
    }
}

/// Verifies tokens against the shared signing secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is checked when present but not mandatory
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a raw token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        match jsonwebtoken::decode::<Value>(token, &self.key, &self.validation) {
            Ok(data) => Ok(Identity(data.claims)),
            Err(e) if is_verifier_fault(e.kind()) => Err(TokenError::Fault(e)),
            Err(e) => Err(TokenError::Invalid(e)),
        }
    }
}

/// Errors that come from our own key material rather than the presented token.
fn is_verifier_fault(kind: &ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::RsaFailedSigning
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::Crypto(_)
    )
}

/// Extract the token from an `Authorization` header.
///
/// The token is the second space-separated segment of the header value; the
/// scheme word itself is not checked.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(' ').nth(1))
        .filter(|t| !t.is_empty())
}

/// Middleware guarding routes that require a verified bearer token.
pub async fn require_bearer_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = {
        let token = extract_bearer_token(request.headers()).ok_or_else(|| {
            warn!(path = %request.uri().path(), "bearer_token_missing");
            TokenError::Missing
        })?;

        state.verifier.verify(token).map_err(|e| {
            match &e {
                TokenError::Fault(_) => error!(error = %e, "bearer_token_verification_error"),
                _ => warn!(error = %e, "bearer_token_invalid"),
            }
            e
        })?
    };

    info!(subject = ?identity.subject(), "bearer_token_verified");

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
