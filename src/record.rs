use crate::config::LoggerConfig;
use crate::error::FormatError;
use crate::level::LogLevel;
use crate::trace_context::TraceContext;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;

/// Caller-supplied record fields.
pub type Fields = Map<String, Value>;

/// Replacement for the value of any sensitive field.
pub const MASKED_VALUE: &str = "***MASKED***";

/// Key fragments that mark a field as sensitive, matched case-insensitively.
pub const SENSITIVE_KEYS: [&str; 6] = ["password", "token", "secret", "apiKey", "apikey", "api_key"];

/// Field names owned by the formatter. Caller fields with these names are
/// dropped.
pub const RESERVED_FIELDS: [&str; 13] = [
    "timestamp",
    "level",
    "message",
    "service.name",
    "trace.id",
    "span.id",
    "environment",
    "host",
    "version",
    "app.name",
    "error.type",
    "error.message",
    "error.stack",
];

/// Error details attached to a record as `error.type`, `error.message` and
/// `error.stack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack: None,
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Describe `err` by its type name, its `Display` text and its chain of
    /// sources, one `caused by:` line each.
    pub fn from_error<E: Error>(err: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            kind: short_type_name(std::any::type_name::<E>()).to_string(),
            message: err.to_string(),
            stack: if causes.is_empty() {
                None
            } else {
                Some(causes.join("\n"))
            },
        }
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYS
        .iter()
        .any(|fragment| key.contains(&fragment.to_lowercase()))
}

/// Copy of `fields` with every sensitive value replaced by [`MASKED_VALUE`].
///
/// Nested objects are masked at every depth. Arrays are passed through as
/// they are, objects inside them included.
pub fn mask_sensitive_fields(fields: &Fields) -> Fields {
    fields
        .iter()
        .map(|(key, value)| {
            let masked = if is_sensitive(key) {
                Value::String(MASKED_VALUE.to_string())
            } else {
                match value {
                    Value::Object(nested) => Value::Object(mask_sensitive_fields(nested)),
                    other => other.clone(),
                }
            };
            (key.clone(), masked)
        })
        .collect()
}

/// Convert any serializable value into record fields.
///
/// `()` and other values serializing to `null` give an empty map; anything
/// else that is not a JSON object is rejected.
pub fn fields_from<T: Serialize + ?Sized>(value: &T) -> Result<Fields, FormatError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Fields::new()),
        Value::Bool(_) => Err(FormatError::NotAnObject("a boolean")),
        Value::Number(_) => Err(FormatError::NotAnObject("a number")),
        Value::String(_) => Err(FormatError::NotAnObject("a string")),
        Value::Array(_) => Err(FormatError::NotAnObject("an array")),
    }
}

/// Render one log record as a single-line JSON object.
///
/// Reserved fields come first, then the masked caller fields in their own
/// order.
pub fn format_record(
    config: &LoggerConfig,
    level: LogLevel,
    message: &str,
    context: &TraceContext,
    fields: &Fields,
    error: Option<&ErrorInfo>,
) -> Result<String, FormatError> {
    let mut record = Map::new();
    record.insert(
        "timestamp".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    record.insert("level".to_string(), Value::String(level.as_str().to_string()));
    record.insert("message".to_string(), Value::String(message.to_string()));
    record.insert(
        "service.name".to_string(),
        Value::String(config.service_name.clone()),
    );
    record.insert(
        "trace.id".to_string(),
        Value::String(context.trace_id().to_string()),
    );
    record.insert(
        "span.id".to_string(),
        Value::String(context.span_id().to_string()),
    );

    let optional = [
        ("environment", &config.environment),
        ("host", &config.host),
        ("version", &config.version),
        ("app.name", &config.app_name),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            record.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    if let Some(error) = error {
        record.insert("error.type".to_string(), Value::String(error.kind.clone()));
        record.insert(
            "error.message".to_string(),
            Value::String(error.message.clone()),
        );
        record.insert(
            "error.stack".to_string(),
            Value::String(error.stack.clone().unwrap_or_default()),
        );
    }

    for (key, value) in mask_sensitive_fields(fields) {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        record.insert(key, value);
    }

    Ok(serde_json::to_string(&Value::Object(record))?)
}
