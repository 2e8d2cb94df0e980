use crate::batch;
use crate::level::LogLevel;
use crate::logger::Logger;
use crate::record::Fields;
use crate::trace_context::{self, TraceContext, TRACEPARENT_HEADER};
use serde_json::Value;
use std::error::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Events from this crate are never forwarded, so the exporter's own
/// diagnostics cannot feed back into it.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// The HTTP client stack. Its connection tasks are spawned outside the
/// export scope, so its events are matched by target instead.
const TRANSPORT_TARGETS: &[&str] = &["hyper", "h2", "reqwest", "rustls", "want"];

fn is_exporter_event(target: &str) -> bool {
    target.starts_with(OWN_TARGET)
        || TRANSPORT_TARGETS.iter().any(|prefix| {
            target
                .strip_prefix(prefix)
                .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
        })
        || batch::in_export_scope()
}

/// `tracing_subscriber` layer that turns `tracing` events into records of a
/// [`Logger`].
///
/// `TRACE` and `DEBUG` events map to [`LogLevel::Debug`]. The logger's level
/// filter applies before any field is visited. An event field named
/// `traceparent` holding a valid header is used as the record's trace
/// context; otherwise the logger's default context is used.
///
/// Events raised while a batch is being sent, and events from the HTTP
/// client crates, are dropped. Forwarding them would make every export
/// produce more records to export.
pub struct ExportLayer {
    logger: Logger,
}

impl ExportLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl<S> Layer<S> for ExportLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_exporter_event(meta.target()) {
            return;
        }

        let level = LogLevel::from(meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut fields = Fields::new();
        let mut message: Option<String> = None;
        let mut traceparent: Option<String> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            traceparent: &mut traceparent,
        };
        event.record(&mut visitor);

        fields
            .entry("target")
            .or_insert_with(|| Value::String(meta.target().to_string()));

        let context: Option<TraceContext> = traceparent
            .as_deref()
            .and_then(|header| trace_context::parse(header).ok());

        self.logger.log(
            level,
            message.as_deref().unwrap_or_default(),
            &fields,
            context.as_ref(),
        );
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
    pub traceparent: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => *self.message = Some(value.to_string()),
            TRACEPARENT_HEADER => *self.traceparent = Some(value.to_string()),
            _ => self.insert(field, Value::String(value.to_string())),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => *self.message = Some(format!("{:?}", value)),
            TRACEPARENT_HEADER => *self.traceparent = Some(format!("{:?}", value)),
            _ => self.insert(field, Value::String(format!("{:?}", value))),
        }
    }
}
