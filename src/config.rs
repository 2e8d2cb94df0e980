use crate::env::{self, EnvLookup};
use crate::error::ConfigError;
use crate::level::LogLevel;
use std::fmt;
use tokio::time::Duration;

/// Ingestion endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "https://log-api.newrelic.com/log/v1";

/// Ingestion endpoint for credentials issued in the EU region.
pub const EU_ENDPOINT: &str = "https://log-api.eu.newrelic.com/log/v1";

const EU_CREDENTIAL_PREFIX: &str = "eu";

const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration of a [`Logger`](crate::logger::Logger).
///
/// Built once, validated and enriched from the environment when the logger
/// is constructed, then never changed.
///
/// **Fields**
/// - `service_name`: required, emitted as `service.name` on every record.
/// - `environment`, `host`, `version`, `app_name`: emitted only when set.
/// - `log_level`: minimum level that is formatted and exported.
/// - `enable_remote_export`: when `false`, records only go to stdout.
/// - `export_credential`: sent in the credential header; export is skipped
///   entirely when it is missing.
/// - `export_endpoint`: explicit endpoint, overrides region detection.
/// - `batch_size`: number of records that triggers a flush.
/// - `flush_interval`: maximum age of a partial batch.
/// - `enable_batching`: when `false`, every record is sent on its own.
#[derive(Clone)]
pub struct LoggerConfig {
    pub service_name: String,
    pub environment: Option<String>,
    pub log_level: LogLevel,
    pub host: Option<String>,
    pub version: Option<String>,
    pub app_name: Option<String>,
    pub enable_remote_export: bool,
    pub export_credential: Option<String>,
    pub export_endpoint: Option<String>,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_batching: bool,
}

impl LoggerConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            environment: None,
            log_level: LogLevel::Info,
            host: None,
            version: None,
            app_name: None,
            enable_remote_export: true,
            export_credential: None,
            export_endpoint: None,
            batch_size: 100,
            flush_interval: Duration::from_millis(5000),
            enable_batching: true,
        }
    }

    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    #[must_use]
    pub fn with_remote_export(mut self, enable: bool) -> Self {
        self.enable_remote_export = enable;
        self
    }

    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.export_credential = Some(credential.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.export_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    #[must_use]
    pub fn with_batching(mut self, enable: bool) -> Self {
        self.enable_batching = enable;
        self
    }

    /// Reject configurations a logger cannot be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        Ok(())
    }

    /// Fill every unset optional field from `lookup`. Fields the caller set are
    /// left alone.
    #[must_use]
    pub fn enrich_from_env<E: EnvLookup + ?Sized>(mut self, lookup: &E) -> Self {
        if self.environment.is_none() {
            self.environment = Some(env::env_or(
                lookup,
                env::ENVIRONMENT_ENV,
                env::DEFAULT_ENVIRONMENT,
            ));
        }
        if self.version.is_none() {
            self.version = lookup.var(env::APP_VERSION_ENV);
        }
        if self.export_credential.is_none() {
            self.export_credential = lookup.var(env::LICENSE_KEY_ENV);
        }
        if self.export_endpoint.is_none() {
            self.export_endpoint = lookup.var(env::LOG_ENDPOINT_ENV);
        }
        if self.app_name.is_none() {
            self.app_name = lookup.var(env::APP_NAME_ENV);
        }
        if self.host.is_none() {
            self.host = lookup.var(env::HOSTNAME_ENV);
        }
        self
    }

    /// Records leave the process only when export is enabled and a
    /// credential is available.
    pub fn remote_export_active(&self) -> bool {
        self.enable_remote_export && self.export_credential.is_some()
    }

    /// Endpoint records are posted to.
    ///
    /// An explicit endpoint always wins; otherwise a credential starting
    /// with `eu` selects the EU region.
    pub fn resolve_endpoint(&self) -> String {
        if let Some(endpoint) = &self.export_endpoint {
            return endpoint.clone();
        }
        match &self.export_credential {
            Some(credential) if credential.starts_with(EU_CREDENTIAL_PREFIX) => {
                EU_ENDPOINT.to_string()
            }
            _ => DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// `batch_size` clamped to at least one record.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// `flush_interval` clamped to a 10ms floor.
    pub fn effective_flush_interval(&self) -> Duration {
        self.flush_interval.max(MIN_FLUSH_INTERVAL)
    }
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("service_name", &self.service_name)
            .field("environment", &self.environment)
            .field("log_level", &self.log_level)
            .field("host", &self.host)
            .field("version", &self.version)
            .field("app_name", &self.app_name)
            .field("enable_remote_export", &self.enable_remote_export)
            .field(
                "export_credential",
                &self.export_credential.as_ref().map(|_| "<redacted>"),
            )
            .field("export_endpoint", &self.export_endpoint)
            .field("batch_size", &self.batch_size)
            .field("flush_interval", &self.flush_interval)
            .field("enable_batching", &self.enable_batching)
            .finish()
    }
}
