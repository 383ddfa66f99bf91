//! Per-request access log.
//!
//! Every request produces one banner-delimited block on the
//! [`ACCESS_LOG_TARGET`] target. The telemetry setup prints events on that
//! target verbatim, whatever format the rest of the log uses.

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap, Version},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::{stream, StreamExt};
use tracing::{info, warn};

/// Largest JSON body a handler will parse. Also the most the access log
/// buffers for rendering.
pub const MAX_BODY_BYTES: usize = 100 * 1024;

/// Tracing target of the access log events.
pub const ACCESS_LOG_TARGET: &str = "mail_service::access";

const BANNER_START: &str = "********** MAIL SERVICE REQUEST **********";
const BANNER_END: &str = "********** END REQUEST **********";

/// One access log entry.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub date: DateTime<Utc>,
    pub method: String,
    pub uri: String,
    pub status: u16,
    pub latency: Duration,
    pub remote_addr: Option<String>,
    pub version: &'static str,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub body: String,
}

impl AccessRecord {
    fn latency_ms(&self) -> String {
        format!("{:.3}", self.latency.as_secs_f64() * 1000.0)
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

        writeln!(f, "{}", BANNER_START)?;
        writeln!(
            f,
            "Date       {}",
            self.date.to_rfc3339_opts(SecondsFormat::Millis, true)
        )?;
        writeln!(f, "Request    {} {}", self.method, self.uri)?;
        writeln!(f, "Status     {}", self.status)?;
        writeln!(f, "Response   {} ms", self.latency_ms())?;
        writeln!(f, "Remote IP  {}", dash(&self.remote_addr))?;
        writeln!(f, "HTTP ver.  {}", self.version)?;
        writeln!(f, "Referrer   {}", dash(&self.referrer))?;
        writeln!(f, "User Agent {}", dash(&self.user_agent))?;
        writeln!(f, "Body       {}", self.body)?;
        write!(f, "{}", BANNER_END)
    }
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "-",
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Whether the request declares a JSON body (`application/json` or `+json`).
pub fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

/// Render a request body for the log: compact JSON, or `{}` when the body
/// is not (valid) JSON.
pub fn render_body(is_json: bool, bytes: &Bytes) -> String {
    if !is_json || bytes.is_empty() {
        return "{}".to_string();
    }

    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "{}".to_string())
}

/// Read a JSON body for the log without consuming it.
///
/// Non-JSON bodies are never touched. JSON bodies are read up to
/// [`MAX_BODY_BYTES`]; past that the log shows `{}` and the inner service
/// gets the already-read chunks replayed ahead of the rest of the stream,
/// so size enforcement stays with whoever parses the body.
pub async fn capture_body(body: Body, is_json: bool) -> (Body, String) {
    if !is_json {
        return (body, "{}".to_string());
    }

    let mut data = body.into_data_stream();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut read = 0;

    while read <= MAX_BODY_BYTES {
        match data.next().await {
            Some(Ok(chunk)) => {
                read += chunk.len();
                chunks.push(chunk);
            }
            Some(Err(e)) => {
                warn!(error = %e, "access_log_body_read_failed");
                let replay = stream::iter(chunks.into_iter().map(Ok))
                    .chain(stream::once(async move { Err(e) }))
                    .chain(data);
                return (Body::from_stream(replay), "{}".to_string());
            }
            None => {
                let bytes = Bytes::from(chunks.concat());
                let rendered = render_body(true, &bytes);
                return (Body::from(bytes), rendered);
            }
        }
    }

    let replay = stream::iter(chunks.into_iter().map(Ok)).chain(data);
    (Body::from_stream(replay), "{}".to_string())
}

/// Access log middleware.
pub async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let date = Utc::now();

    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let version = version_label(request.version());
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());
    let referrer = header_string(request.headers(), header::REFERER);
    let user_agent = header_string(request.headers(), header::USER_AGENT);
    let is_json = is_json_content(request.headers());

    let (parts, body) = request.into_parts();
    let (body, rendered) = capture_body(body, is_json).await;

    let response = next.run(Request::from_parts(parts, body)).await;

    let record = AccessRecord {
        date,
        method,
        uri,
        status: response.status().as_u16(),
        latency: start.elapsed(),
        remote_addr,
        version,
        referrer,
        user_agent,
        body: rendered,
    };

    info!(target: ACCESS_LOG_TARGET, "\n{}\n", record);

    response
}
