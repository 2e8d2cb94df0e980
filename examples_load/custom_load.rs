use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_log_export::init::{init_tracing_with_config, LayerConfig};
use tracing_log_export::noop_sink::NoopTransport;
use tracing_log_export::{Logger, LoggerConfig};

#[tokio::main]
async fn main() {
    let transport = Arc::new(NoopTransport);

    let config = LoggerConfig::new("load-test")
        .with_batch_size(1_000)
        .with_flush_interval(Duration::from_millis(200));
    let logger = Logger::with_transport(config, transport).expect("valid logger config");

    init_tracing_with_config(logger.clone(), LayerConfig { enable_fmt: false })
        .expect("no global subscriber installed yet");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    eprintln!("custom config: logged {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    logger.shutdown().await;
    sleep(Duration::from_millis(200)).await;
    eprintln!("stats: {:?}", logger.stats());
}
