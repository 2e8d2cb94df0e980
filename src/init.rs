use crate::error::ConfigError;
use crate::layer::ExportLayer;
use crate::logger::Logger;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global `tracing` subscriber installed by
/// [`init_tracing_with_config`].
///
/// **Fields**
/// - `enable_fmt`: if `true`, a `tracing_subscriber::fmt::Layer` is added
///   next to [`ExportLayer`] and events are also printed in human-readable
///   form. The logger already echoes every JSON record to stdout, so this is
///   off by default.
#[derive(Clone, Debug, Default)]
pub struct LayerConfig {
    pub enable_fmt: bool,
}

/// Install a global `tracing` subscriber that forwards events to `logger`.
///
/// **Parameters**
/// - `logger`: [`Logger`] receiving every event that passes its level
///   filter.
/// - `config`: [`LayerConfig`] selecting the extra layers.
///
/// **Returns**
/// - `Err(ConfigError::Subscriber)` if a global subscriber is already set.
pub fn init_tracing_with_config(logger: Logger, config: LayerConfig) -> Result<(), ConfigError> {
    let layer = ExportLayer::new(logger);

    // The two subscriber shapes have different types, so each branch
    // installs its own.
    let result = if config.enable_fmt {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| ConfigError::Subscriber(e.to_string()))
}

/// Install the export subscriber with [`LayerConfig::default`].
pub fn init_tracing(logger: Logger) -> Result<(), ConfigError> {
    init_tracing_with_config(logger, LayerConfig::default())
}
