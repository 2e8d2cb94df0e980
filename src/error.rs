/// Error returned when a logger cannot be constructed.
///
/// This is the only error kind that ever reaches application code; every
/// failure that happens while emitting a log line is handled inside the
/// crate.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("invalid export endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("failed to build export transport: {0}")]
    Transport(String),

    #[error("remote export requires a running Tokio runtime")]
    NoRuntime,

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Error returned when a `traceparent` header value is malformed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("traceparent must have exactly 4 dash-separated fields")]
    InvalidFormat,

    #[error("unsupported traceparent version")]
    UnsupportedVersion,

    #[error("trace id must be 32 hex characters")]
    InvalidTraceId,

    #[error("span id must be 16 hex characters")]
    InvalidSpanId,

    #[error("trace flags must be 2 hex characters")]
    InvalidFlags,
}

/// Error returned when a record cannot be turned into JSON.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("log fields must serialize to a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Error returned by a [`Transport`](crate::sink::Transport) when a payload
/// was not accepted.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("log export failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("log export transport error: {0}")]
    Transport(String),
}

impl ExportError {
    pub fn transport(message: impl Into<String>) -> Self {
        ExportError::Transport(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExportError::Status {
            status: 403,
            body: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "log export failed with status 403: forbidden");

        let err = ConfigError::InvalidEndpoint {
            endpoint: "nope".to_string(),
            message: "relative URL without a base".to_string(),
        };
        assert!(err.to_string().contains("'nope'"));

        assert_eq!(
            ParseError::InvalidSpanId.to_string(),
            "span id must be 16 hex characters"
        );
    }

    #[test]
    fn test_format_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: FormatError = serde_err.into();
        assert!(matches!(err, FormatError::Serialize(_)));
    }
}
