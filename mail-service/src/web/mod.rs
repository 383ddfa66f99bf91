//! HTTP surface.
//!
//! Two routes over one listener:
//! - `GET /`: unauthenticated health check
//! - `POST /sendmail`: bearer token verification, then mail dispatch
//!
//! Every request passes through CORS, the access log and the security
//! headers, in that order.

pub mod access_log;
pub mod error;
pub mod handlers;
pub mod security;
pub mod token;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use access_log::{access_log, AccessRecord};
pub use error::ApiError;
pub use handlers::{health, send_mail, ApiResponse, AppState};
pub use security::with_security_headers;
pub use token::{extract_bearer_token, require_bearer_token, Identity, TokenError, TokenVerifier};

/// Permissive CORS: reflects the caller's origin and allows credentials.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let routes = Router::new().route("/", get(health)).route(
        "/sendmail",
        post(send_mail).route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer_token,
        )),
    );

    with_security_headers(routes)
        .layer(DefaultBodyLimit::max(access_log::MAX_BODY_BYTES))
        .layer(middleware::from_fn(access_log))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
