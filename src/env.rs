//! Environment variable names used to fill in logger configuration the
//! caller left unset.
//!
//! These are read once when the logger is built; the formatter and the
//! batch manager never touch the environment.

use std::collections::HashMap;

/// Deployment environment name, e.g. `production`.
pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";

/// Application version string.
pub const APP_VERSION_ENV: &str = "APP_VERSION";

/// Credential sent with every export request.
pub const LICENSE_KEY_ENV: &str = "NEW_RELIC_LICENSE_KEY";

/// Explicit ingestion endpoint, overriding region detection.
pub const LOG_ENDPOINT_ENV: &str = "NEW_RELIC_LOG_ENDPOINT";

/// Application name attached to records as `app.name`.
pub const APP_NAME_ENV: &str = "NEW_RELIC_APP_NAME";

/// Host name attached to records as `host`.
pub const HOSTNAME_ENV: &str = "HOSTNAME";

/// Environment name used when [`ENVIRONMENT_ENV`] is not set.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Key/value lookup for configuration defaults.
pub trait EnvLookup {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment. Empty values count as unset.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Read an environment variable or fall back to a provided default.
pub fn env_or<E: EnvLookup + ?Sized>(env: &E, key: &str, default: &str) -> String {
    env.var(key).unwrap_or_else(|| default.to_string())
}
