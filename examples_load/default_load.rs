use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};

use tracing_log_export::noop_sink::NoopTransport;
use tracing_log_export::{Fields, LogLevel, Logger, LoggerConfig};

#[tokio::main]
async fn main() {
    let transport = Arc::new(NoopTransport);
    let logger = Logger::with_transport(LoggerConfig::new("load-test"), transport)
        .expect("valid logger config");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let mut fields = Fields::new();
        fields.insert("iteration".to_string(), i.into());
        logger.log(LogLevel::Error, "default load test error", &fields, None);
    }

    let elapsed = start.elapsed();
    eprintln!("default config: logged {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give in-flight batch sends a little time to finish
    logger.shutdown().await;
    sleep(Duration::from_millis(200)).await;
    eprintln!("stats: {:?}", logger.stats());
}
