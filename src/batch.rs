use crate::error::{ConfigError, ExportError};
use crate::sink::Transport;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};

tokio::task_local! {
    static EXPORTING: ();
}

/// Whether the caller is running inside a transport send started by a
/// [`BatchManager`]. Events raised there must not become records.
pub fn in_export_scope() -> bool {
    EXPORTING.try_with(|_| ()).is_ok()
}

/// Everything the flush triggers race on. Guarded by one lock so that the
/// size check, the append and the buffer swap are atomic with respect to
/// each other.
struct BatchState {
    buffer: Vec<String>,
    last_flush: Instant,
    shutdown: bool,
}

impl BatchState {
    /// Move the buffered records out, leaving an empty buffer behind.
    fn take(&mut self) -> Option<Vec<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        self.last_flush = Instant::now();
        Some(std::mem::take(&mut self.buffer))
    }
}

#[derive(Default)]
struct ExportCounters {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    batches_sent: AtomicU64,
    records_sent: AtomicU64,
    records_dropped: AtomicU64,
    send_failures: AtomicU64,
}

/// Point-in-time copy of the export counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Records accepted by `enqueue`.
    pub enqueued: u64,
    /// Records refused because the manager was shutting down.
    pub rejected: u64,
    /// Payloads the transport accepted.
    pub batches_sent: u64,
    /// Records inside accepted payloads.
    pub records_sent: u64,
    /// Records lost to failed sends.
    pub records_dropped: u64,
    /// Payloads the transport rejected.
    pub send_failures: u64,
}

struct Shared {
    state: Mutex<BatchState>,
    transport: Arc<dyn Transport>,
    batch_size: usize,
    flush_interval: Duration,
    batching: bool,
    runtime: Handle,
    counters: ExportCounters,
}

enum Dispatch {
    Single(String),
    Batch(Vec<String>),
}

impl Shared {
    fn spawn(self: &Arc<Self>, dispatch: Dispatch) {
        let shared = Arc::clone(self);
        self.runtime.spawn(EXPORTING.scope((), async move {
            match dispatch {
                Dispatch::Single(record) => shared.send_single(record).await,
                Dispatch::Batch(batch) => shared.send_batch(batch).await,
            }
        }));
    }

    async fn send_batch(&self, batch: Vec<String>) {
        let count = batch.len() as u64;
        let payload = format!("[{}]", batch.join(","));
        tracing::debug!(records = count, "sending log batch");
        let result = self.transport.send(payload).await;
        self.record_result(result, count, "error sending log batch");
    }

    async fn send_single(&self, record: String) {
        let result = self.transport.send(record).await;
        self.record_result(result, 1, "error sending log record");
    }

    fn record_result(&self, result: Result<(), ExportError>, count: u64, context: &str) {
        match result {
            Ok(()) => {
                self.counters.batches_sent.fetch_add(1, Ordering::Relaxed);
                self.counters.records_sent.fetch_add(count, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.send_failures.fetch_add(1, Ordering::Relaxed);
                self.counters.records_dropped.fetch_add(count, Ordering::Relaxed);
                eprintln!("{} ({} records dropped): {}", context, count, e);
            }
        }
    }
}

/// Buffers formatted records and ships them through a [`Transport`].
///
/// Flushes are triggered by the buffer reaching `batch_size`, by a timer
/// every `flush_interval`, or explicitly via [`flush`](Self::flush) and
/// [`shutdown`](Self::shutdown). Each trigger takes the current buffer under
/// the lock and sends it outside the lock, so a record is sent at most once.
/// Failed sends are reported on stderr and dropped.
///
/// Cloning is cheap; all clones share the same buffer.
#[derive(Clone)]
pub struct BatchManager {
    shared: Arc<Shared>,
    timer: Option<Arc<JoinHandle<()>>>,
}

impl BatchManager {
    /// Create a manager on the current Tokio runtime and start its flush
    /// timer.
    ///
    /// `batch_size` is raised to at least 1 and `flush_interval` to at least
    /// 10ms. With `batching` disabled every record is sent on its own and no
    /// timer is started.
    pub fn new(
        transport: Arc<dyn Transport>,
        batch_size: usize,
        flush_interval: Duration,
        batching: bool,
    ) -> Result<Self, ConfigError> {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        Ok(Self::with_runtime(
            runtime,
            transport,
            batch_size,
            flush_interval,
            batching,
        ))
    }

    /// Same as [`new`](Self::new) with an explicit runtime handle.
    pub fn with_runtime(
        runtime: Handle,
        transport: Arc<dyn Transport>,
        batch_size: usize,
        flush_interval: Duration,
        batching: bool,
    ) -> Self {
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let shared = Arc::new(Shared {
            state: Mutex::new(BatchState {
                buffer: Vec::with_capacity(if batching { batch_size.min(1024) } else { 0 }),
                last_flush: Instant::now(),
                shutdown: false,
            }),
            transport,
            batch_size,
            flush_interval,
            batching,
            runtime: runtime.clone(),
            counters: ExportCounters::default(),
        });

        let timer = if batching {
            let weak = Arc::downgrade(&shared);
            Some(Arc::new(runtime.spawn(flush_timer(weak, flush_interval))))
        } else {
            None
        };

        Self { shared, timer }
    }

    /// Queue one serialized record. Never blocks on I/O.
    ///
    /// Ignored once shutdown has started.
    pub fn enqueue(&self, record: String) {
        let dispatch = {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return;
            }
            self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);

            if !self.shared.batching {
                Some(Dispatch::Single(record))
            } else {
                state.buffer.push(record);
                if state.buffer.len() >= self.shared.batch_size {
                    state.take().map(Dispatch::Batch)
                } else {
                    None
                }
            }
        };

        if let Some(dispatch) = dispatch {
            self.shared.spawn(dispatch);
        }
    }

    /// Send whatever is buffered right now and wait for that send.
    ///
    /// Records enqueued while the send is in flight land in a fresh buffer.
    pub async fn flush(&self) {
        let batch = {
            let mut state = self.shared.state.lock();
            state.take()
        };
        if let Some(batch) = batch {
            EXPORTING.scope((), self.shared.send_batch(batch)).await;
        }
    }

    /// Stop accepting records and drain the buffer once. Safe to call more
    /// than once.
    ///
    /// Sends already spawned by earlier triggers are not awaited.
    pub async fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.shutdown {
                tracing::debug!("batch manager shutting down");
            }
            state.shutdown = true;
        }
        self.flush().await;
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    /// Records currently waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    pub fn batch_size(&self) -> usize {
        self.shared.batch_size
    }

    pub fn flush_interval(&self) -> Duration {
        self.shared.flush_interval
    }

    /// Whether the periodic flush task has exited. Always `true` when
    /// batching is disabled.
    pub fn timer_finished(&self) -> bool {
        self.timer.as_ref().map_or(true, |t| t.is_finished())
    }

    pub fn stats(&self) -> ExportStats {
        let c = &self.shared.counters;
        ExportStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            batches_sent: c.batches_sent.load(Ordering::Relaxed),
            records_sent: c.records_sent.load(Ordering::Relaxed),
            records_dropped: c.records_dropped.load(Ordering::Relaxed),
            send_failures: c.send_failures.load(Ordering::Relaxed),
        }
    }
}

/// Periodic flush. Checks the shutdown flag only after each sleep, so it
/// may outlive `shutdown` by up to one interval. Exits early if every
/// manager handle has been dropped.
async fn flush_timer(shared: Weak<Shared>, interval: Duration) {
    loop {
        sleep(interval).await;

        let Some(strong) = shared.upgrade() else {
            break;
        };

        let batch = {
            let mut state = strong.state.lock();
            if state.shutdown {
                break;
            }
            if state.last_flush.elapsed() >= interval {
                state.take()
            } else {
                None
            }
        };

        if let Some(batch) = batch {
            strong.spawn(Dispatch::Batch(batch));
        }
    }
}
