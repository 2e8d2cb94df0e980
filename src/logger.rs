use crate::batch::{BatchManager, ExportStats};
use crate::config::LoggerConfig;
use crate::env::{EnvLookup, ProcessEnv};
use crate::error::ConfigError;
use crate::level::{should_log, LogLevel};
use crate::record::{fields_from, format_record, ErrorInfo, Fields};
use crate::sink::Transport;
use crate::trace_context::TraceContext;
use serde::Serialize;
use std::error::Error;
use std::io::Write;
use std::sync::Arc;

struct LoggerInner {
    config: LoggerConfig,
    default_context: TraceContext,
    export: Option<BatchManager>,
}

/// Structured logger that prints every record to stdout and, when remote
/// export is active, ships it through a [`BatchManager`].
///
/// Logging calls never return errors and never panic on formatting or
/// delivery problems; those are reported on stderr and the record is
/// dropped. Only construction can fail.
///
/// Cloning is cheap; clones share configuration and export state.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    /// Build a logger, filling unset configuration from the process
    /// environment.
    ///
    /// Must be called inside a Tokio runtime when remote export ends up
    /// active (export enabled and a credential available).
    pub fn init(config: LoggerConfig) -> Result<Self, ConfigError> {
        Self::init_with_env(config, &ProcessEnv)
    }

    /// Same as [`init`](Self::init) with an explicit environment lookup.
    pub fn init_with_env<E: EnvLookup + ?Sized>(
        config: LoggerConfig,
        env: &E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = config.enrich_from_env(env);

        let transport = if config.remote_export_active() {
            Some(build_transport(&config)?)
        } else {
            None
        };

        Self::build(config, transport)
    }

    /// Build a logger that exports through `transport` instead of the HTTP
    /// client. The environment is not consulted.
    pub fn with_transport(
        config: LoggerConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = config.enable_remote_export.then_some(transport);
        Self::build(config, transport)
    }

    fn build(
        config: LoggerConfig,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, ConfigError> {
        let export = match transport {
            Some(transport) => Some(BatchManager::new(
                transport,
                config.effective_batch_size(),
                config.effective_flush_interval(),
                config.enable_batching,
            )?),
            None => None,
        };

        tracing::debug!(
            service = %config.service_name,
            remote_export = export.is_some(),
            "logger initialized"
        );

        Ok(Self {
            inner: Arc::new(LoggerInner {
                config,
                default_context: TraceContext::generate(),
                export,
            }),
        })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    /// Context used by calls that do not pass one. Fixed for the lifetime of
    /// the logger.
    pub fn default_context(&self) -> &TraceContext {
        &self.inner.default_context
    }

    /// New span under the logger's default trace.
    pub fn child_context(&self) -> TraceContext {
        self.inner.default_context.derive_child()
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        should_log(self.inner.config.log_level, level)
    }

    pub fn remote_export_active(&self) -> bool {
        self.inner.export.is_some()
    }

    /// Log `message` with caller fields under `context`, or under the
    /// default context when `None`.
    pub fn log(
        &self,
        level: LogLevel,
        message: &str,
        fields: &Fields,
        context: Option<&TraceContext>,
    ) {
        if !self.enabled(level) {
            return;
        }
        self.emit(level, message, fields, context, None);
    }

    /// Log with fields taken from any serializable value, typically a struct
    /// or a map.
    pub fn log_with<T: Serialize + ?Sized>(
        &self,
        level: LogLevel,
        message: &str,
        fields: &T,
        context: Option<&TraceContext>,
    ) {
        if !self.enabled(level) {
            return;
        }
        match fields_from(fields) {
            Ok(fields) => self.emit(level, message, &fields, context, None),
            Err(e) => eprintln!("dropping log record '{}': {}", message, e),
        }
    }

    /// Log at `ERROR` with `error.type`, `error.message` and `error.stack`
    /// taken from `err`.
    pub fn log_error<E: Error>(
        &self,
        message: &str,
        err: &E,
        fields: &Fields,
        context: Option<&TraceContext>,
    ) {
        if !self.enabled(LogLevel::Error) {
            return;
        }
        let info = ErrorInfo::from_error(err);
        self.emit(LogLevel::Error, message, fields, context, Some(&info));
    }

    /// Log at `ERROR` with prepared error details.
    pub fn log_error_info(
        &self,
        message: &str,
        info: &ErrorInfo,
        fields: &Fields,
        context: Option<&TraceContext>,
    ) {
        if !self.enabled(LogLevel::Error) {
            return;
        }
        self.emit(LogLevel::Error, message, fields, context, Some(info));
    }

    pub fn debug(&self, message: &str, fields: &Fields) {
        self.log(LogLevel::Debug, message, fields, None);
    }

    pub fn info(&self, message: &str, fields: &Fields) {
        self.log(LogLevel::Info, message, fields, None);
    }

    pub fn warn(&self, message: &str, fields: &Fields) {
        self.log(LogLevel::Warn, message, fields, None);
    }

    pub fn error(&self, message: &str, fields: &Fields) {
        self.log(LogLevel::Error, message, fields, None);
    }

    fn emit(
        &self,
        level: LogLevel,
        message: &str,
        fields: &Fields,
        context: Option<&TraceContext>,
        error: Option<&ErrorInfo>,
    ) {
        let context = context.unwrap_or(&self.inner.default_context);
        let line = match format_record(&self.inner.config, level, message, context, fields, error)
        {
            Ok(line) => line,
            Err(e) => {
                eprintln!("dropping log record '{}': {}", message, e);
                return;
            }
        };

        // A closed stdout must not take the application down.
        let _ = writeln!(std::io::stdout().lock(), "{}", line);

        if let Some(export) = &self.inner.export {
            export.enqueue(line);
        }
    }

    /// Send buffered records now and wait for that send.
    pub async fn flush(&self) {
        if let Some(export) = &self.inner.export {
            export.flush().await;
        }
    }

    /// Stop exporting and drain the buffer. Later calls still print to
    /// stdout but nothing more is exported.
    pub async fn shutdown(&self) {
        if let Some(export) = &self.inner.export {
            export.shutdown().await;
        }
    }

    /// Export counters; all zero when remote export is inactive.
    pub fn stats(&self) -> ExportStats {
        self.inner
            .export
            .as_ref()
            .map(BatchManager::stats)
            .unwrap_or_default()
    }
}

#[cfg(feature = "http")]
fn build_transport(config: &LoggerConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    use crate::http::HttpTransport;

    let credential = config.export_credential.as_deref().unwrap_or_default();
    let transport = HttpTransport::new(&config.resolve_endpoint(), credential)?;
    Ok(Arc::new(transport) as Arc<dyn Transport>)
}

#[cfg(not(feature = "http"))]
fn build_transport(_config: &LoggerConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    Err(ConfigError::Transport("http feature is not enabled".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env;
    use crate::error::ExportError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingTransport {
        payloads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, payload: String) -> Result<(), ExportError> {
            self.payloads.lock().push(payload);
            Ok(())
        }
    }

    fn records(transport: &RecordingTransport) -> Vec<Value> {
        transport
            .payloads
            .lock()
            .iter()
            .flat_map(|p| match serde_json::from_str::<Value>(p).unwrap() {
                Value::Array(items) => items,
                single => vec![single],
            })
            .collect()
    }

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fields must be an object"),
        }
    }

    #[test]
    fn test_rejects_blank_service_name() {
        let no_env = HashMap::<String, String>::new();
        let result = Logger::init_with_env(LoggerConfig::new(" \t"), &no_env);
        assert!(matches!(result, Err(ConfigError::EmptyServiceName)));
    }

    #[test]
    fn test_without_credential_export_is_inactive() {
        let no_env = HashMap::<String, String>::new();
        let logger = Logger::init_with_env(LoggerConfig::new("api"), &no_env).unwrap();
        assert!(!logger.remote_export_active());
        assert_eq!(logger.config().environment.as_deref(), Some("development"));
        logger.info("local only", &Fields::new());
        assert_eq!(logger.stats(), ExportStats::default());
    }

    #[test]
    fn test_export_without_runtime_is_config_error() {
        let mut env_vars = HashMap::new();
        env_vars.insert(env::LICENSE_KEY_ENV.to_string(), "abc".to_string());
        let result = Logger::init_with_env(LoggerConfig::new("api"), &env_vars);
        assert!(matches!(result, Err(ConfigError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_surfaces() {
        let config = LoggerConfig::new("api")
            .with_credential("abc")
            .with_endpoint("::not a url::");
        let result = Logger::init_with_env(config, &HashMap::<String, String>::new());
        assert!(matches!(result, Err(ConfigError::InvalidEndpoint { .. })));
    }

    #[tokio::test]
    async fn test_level_filter_drops_before_export() {
        let transport = Arc::new(RecordingTransport::default());
        let config = LoggerConfig::new("api").with_log_level(LogLevel::Warn);
        let logger = Logger::with_transport(config, transport.clone()).unwrap();

        logger.debug("hidden", &Fields::new());
        logger.info("hidden", &Fields::new());
        logger.warn("shown", &Fields::new());
        logger.error("shown", &Fields::new());
        logger.shutdown().await;

        let records = records(&transport);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], "WARN");
        assert_eq!(records[1]["level"], "ERROR");
        assert_eq!(logger.stats().enqueued, 2);
    }

    #[tokio::test]
    async fn test_default_and_explicit_context() {
        let transport = Arc::new(RecordingTransport::default());
        let logger =
            Logger::with_transport(LoggerConfig::new("api"), transport.clone()).unwrap();

        let request_ctx = logger.child_context();
        logger.info("default", &Fields::new());
        logger.log(LogLevel::Info, "explicit", &Fields::new(), Some(&request_ctx));
        logger.shutdown().await;

        let records = records(&transport);
        let default = logger.default_context();
        assert_eq!(records[0]["span.id"], default.span_id());
        assert_eq!(records[1]["trace.id"], default.trace_id());
        assert_eq!(records[1]["span.id"], request_ctx.span_id());
    }

    #[tokio::test]
    async fn test_unserializable_fields_are_dropped() {
        let transport = Arc::new(RecordingTransport::default());
        let logger =
            Logger::with_transport(LoggerConfig::new("api"), transport.clone()).unwrap();

        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple key");
        logger.log_with(LogLevel::Info, "bad", &bad, None);
        logger.log_with(LogLevel::Info, "scalar", &42, None);
        logger.log_with(LogLevel::Info, "good", &json!({"order": 1}), None);
        logger.shutdown().await;

        let records = records(&transport);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["message"], "good");
        assert_eq!(records[0]["order"], 1);
    }

    #[tokio::test]
    async fn test_log_error_attaches_error_fields() {
        let transport = Arc::new(RecordingTransport::default());
        let logger =
            Logger::with_transport(LoggerConfig::new("api"), transport.clone()).unwrap();

        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
        logger.log_error(
            "startup failed",
            &err,
            &fields(json!({"password": "hunter2"})),
            None,
        );
        logger.shutdown().await;

        let records = records(&transport);
        assert_eq!(records[0]["level"], "ERROR");
        assert_eq!(records[0]["error.type"], "Error");
        assert_eq!(records[0]["error.message"], "config.toml missing");
        assert_eq!(records[0]["error.stack"], "");
        assert_eq!(records[0]["password"], "***MASKED***");
    }

    #[tokio::test]
    async fn test_export_disabled_keeps_transport_idle() {
        let transport = Arc::new(RecordingTransport::default());
        let config = LoggerConfig::new("api").with_remote_export(false);
        let logger = Logger::with_transport(config, transport.clone()).unwrap();

        logger.info("local", &Fields::new());
        logger.shutdown().await;
        assert!(!logger.remote_export_active());
        assert!(transport.payloads.lock().is_empty());
    }
}
