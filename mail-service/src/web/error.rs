//! Request-time errors and their JSON rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::handlers::ApiResponse;

/// Every failure a request can end in.
///
/// The `Display` text is exactly what the caller sees in the `error` field;
/// internal detail is logged where the error is raised, never returned.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No token sent")]
    NoToken,

    #[error("Invalid Token")]
    InvalidToken,

    #[error("Error verifying token")]
    TokenVerification,

    #[error("Invalid request body")]
    InvalidBody,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Invalid mail request")]
    InvalidMailRequest,

    #[error("Error sending email")]
    MailDispatch,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoToken | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::InvalidBody | ApiError::InvalidMailRequest => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TokenVerification | ApiError::MailDispatch => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ApiResponse::error(self.to_string()))).into_response()
    }
}
