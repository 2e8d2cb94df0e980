use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_log_export::{
    error::ExportError,
    init::init_tracing,
    Logger, LoggerConfig, Transport,
};

/// Ships payloads somewhere other than the HTTP ingestion endpoint by
/// implementing `Transport` directly. A real implementation would hand the
/// payload to a queue producer or an in-house collector client.
struct MyCustomTransport;

#[async_trait]
impl Transport for MyCustomTransport {
    async fn send(&self, payload: String) -> Result<(), ExportError> {
        println!("[my-custom-ingest] {}", payload);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let transport: Arc<dyn Transport> = Arc::new(MyCustomTransport);
    let config = LoggerConfig::new("custom-example").with_batch_size(2);

    let logger = Logger::with_transport(config, transport).expect("valid logger config");
    init_tracing(logger.clone()).expect("no global subscriber installed yet");

    info!("custom transport example started");
    error!(db = "my-custom-db", "simulated error sent via custom transport");

    logger.shutdown().await;
}
