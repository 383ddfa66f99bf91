//! Tracing subscriber setup.
//!
//! JSON output by default, one flattened object per event. Set
//! `LOG_FORMAT=pretty` for the human-readable formatter. `RUST_LOG`
//! overrides the default `info` filter.
//!
//! Access log blocks go through their own layer that prints only the
//! event message, so the banner block stays multi-line in either format.

use std::env;
use std::fmt as std_fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields, MakeWriter},
    layer::{Layered, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::web::access_log::ACCESS_LOG_TARGET;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Read `LOG_FORMAT`; anything but `pretty`/`text` means JSON.
    pub fn from_env() -> Self {
        Self::parse(env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "pretty" || v == "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Event formatter for the access log: the message, nothing else.
struct AccessBlockFormat;

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std_fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S, N> FormatEvent<S, N> for AccessBlockFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let mut message = MessageVisitor::default();
        event.record(&mut message);
        writeln!(writer, "{}", message.0)
    }
}

type Base = Layered<EnvFilter, Registry>;

/// Build the subscriber without installing it.
pub fn subscriber<W>(
    format: LogFormat,
    filter: EnvFilter,
    make_writer: W,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Clone + Send + Sync + 'static,
{
    let app: Box<dyn Layer<Base> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(make_writer.clone())
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_writer(make_writer.clone())
            .boxed(),
    };

    let access = fmt::layer()
        .event_format(AccessBlockFormat)
        .with_writer(make_writer)
        .with_filter(filter_fn(|meta| meta.target() == ACCESS_LOG_TARGET));

    tracing_subscriber::registry()
        .with(filter)
        .with(app.with_filter(filter_fn(|meta| meta.target() != ACCESS_LOG_TARGET)))
        .with(access)
}

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    subscriber(format, filter, std::io::stdout).init();
}
