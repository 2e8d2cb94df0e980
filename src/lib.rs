//! Structured JSON logging with W3C trace correlation, shipped to a remote
//! log ingestion endpoint in batches.
//!
//! A [`Logger`] formats each call into a JSON record carrying `trace.id` and
//! `span.id`, prints it to stdout and hands it to a [`BatchManager`], which
//! posts batches through a [`Transport`] when they fill up or grow old.
//! Logging never blocks on the network and never fails the caller.

pub mod batch;
pub mod config;
pub mod env;
pub mod error;
pub mod level;
pub mod logger;
pub mod record;
pub mod sink;
pub mod trace_context;

#[cfg(feature = "http")]
pub mod http;

pub mod init;
pub mod layer;
pub mod noop_sink;

pub use batch::{BatchManager, ExportStats};
pub use config::LoggerConfig;
pub use error::{ConfigError, ExportError, FormatError, ParseError};
pub use level::LogLevel;
pub use logger::Logger;
pub use record::{ErrorInfo, Fields};
pub use sink::Transport;
pub use trace_context::TraceContext;
