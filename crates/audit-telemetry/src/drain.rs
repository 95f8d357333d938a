//! Background drainer and the pluggable sink it feeds.
//!
//! While running, the drainer wakes after `initial_delay` and then every
//! `interval`, removes up to `batch_size` of the oldest records from the
//! log and hands them to a [`DrainSink`]. A sink failure never loses
//! records: the batch goes back into the log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use authz_audit_types::EventRecord;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::DrainConfig;
use crate::error::{AuditError, AuditResult, SinkError};
use crate::log::BoundedEventLog;

/// Destination for drained batches.
#[async_trait]
pub trait DrainSink: Send + Sync {
    /// Persist a batch, oldest record first.
    async fn persist(&self, batch: &[Arc<EventRecord>]) -> Result<(), SinkError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Default sink: puts the batch straight back at the newest end of the
/// log. Draining then has no visible effect beyond reordering, and no
/// counters or metrics are touched.
pub struct RetainingSink {
    log: Arc<BoundedEventLog>,
}

impl RetainingSink {
    pub fn new(log: Arc<BoundedEventLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl DrainSink for RetainingSink {
    async fn persist(&self, batch: &[Arc<EventRecord>]) -> Result<(), SinkError> {
        self.log.append_batch(batch.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "retaining"
    }
}

/// Keeps every drained batch in memory.
#[derive(Default)]
pub struct CollectingSink {
    batches: RwLock<Vec<Vec<Arc<EventRecord>>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<Arc<EventRecord>>> {
        self.batches.read().clone()
    }

    /// All collected records, in drain order.
    pub fn records(&self) -> Vec<Arc<EventRecord>> {
        self.batches.read().iter().flatten().cloned().collect()
    }

    pub fn clear(&self) {
        self.batches.write().clear();
    }
}

#[async_trait]
impl DrainSink for CollectingSink {
    async fn persist(&self, batch: &[Arc<EventRecord>]) -> Result<(), SinkError> {
        self.batches.write().push(batch.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainerState {
    Stopped,
    Running,
}

/// Drainer counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainStats {
    pub cycles: u64,
    pub records_drained: u64,
    pub sink_failures: u64,
}

#[derive(Debug, Default)]
struct StatsCell {
    cycles: AtomicU64,
    records_drained: AtomicU64,
    sink_failures: AtomicU64,
}

impl StatsCell {
    fn snapshot(&self) -> DrainStats {
        DrainStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            records_drained: self.records_drained.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}

struct RunningTask {
    task: JoinHandle<()>,
    stop: mpsc::Sender<()>,
}

/// Periodic drain task over a shared log.
pub struct Drainer {
    log: Arc<BoundedEventLog>,
    sink: Arc<dyn DrainSink>,
    config: DrainConfig,
    stats: Arc<StatsCell>,
    running: Mutex<Option<RunningTask>>,
}

impl Drainer {
    pub fn new(log: Arc<BoundedEventLog>, sink: Arc<dyn DrainSink>, config: DrainConfig) -> Self {
        Self {
            log,
            sink,
            config,
            stats: Arc::new(StatsCell::default()),
            running: Mutex::new(None),
        }
    }

    pub fn state(&self) -> DrainerState {
        if self.running.lock().is_some() {
            DrainerState::Running
        } else {
            DrainerState::Stopped
        }
    }

    pub fn stats(&self) -> DrainStats {
        self.stats.snapshot()
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Spawn the periodic task. Starting a running drainer is a no-op.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> AuditResult<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AuditError::Lifecycle(format!("drainer needs a tokio runtime: {e}")))?;

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let log = Arc::clone(&self.log);
        let sink = Arc::clone(&self.sink);
        let stats = Arc::clone(&self.stats);
        let batch_size = self.config.batch_size;
        let initial_delay = self.config.initial_delay();
        let interval = self.config.interval();

        let task = runtime.spawn(async move {
            let mut delay = initial_delay;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stop_rx.recv() => {
                        debug!("drainer received stop signal");
                        break;
                    }
                }
                // Runs outside the select so a stop never interrupts a batch.
                drain_cycle(&log, sink.as_ref(), batch_size, &stats).await;
                delay = interval;
            }
        });

        *running = Some(RunningTask { task, stop: stop_tx });
        info!(
            sink = self.sink.name(),
            initial_delay_ms = self.config.initial_delay_ms,
            interval_ms = self.config.interval_ms,
            batch_size,
            "Drainer started"
        );
        Ok(())
    }

    /// Cancel the timer and wait for an in-flight batch to finish.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(RunningTask { task, stop }) = running else {
            return;
        };
        let _ = stop.send(()).await;
        if let Err(e) = task.await {
            error!(error = %e, "Drainer task ended abnormally");
        }
        info!(sink = self.sink.name(), "Drainer stopped");
    }

    /// Run one cycle immediately, independent of the schedule.
    pub async fn drain_now(&self) -> usize {
        drain_cycle(&self.log, self.sink.as_ref(), self.config.batch_size, &self.stats).await
    }
}

impl Drop for Drainer {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.task.abort();
        }
    }
}

/// Returns the number of records handed to the sink successfully.
async fn drain_cycle(
    log: &BoundedEventLog,
    sink: &dyn DrainSink,
    batch_size: usize,
    stats: &StatsCell,
) -> usize {
    stats.cycles.fetch_add(1, Ordering::Relaxed);
    let batch = log.drain_batch(batch_size);
    if batch.is_empty() {
        return 0;
    }
    let n = batch.len();
    match sink.persist(&batch).await {
        Ok(()) => {
            stats.records_drained.fetch_add(n as u64, Ordering::Relaxed);
            debug!(sink = sink.name(), records = n, "Drained batch");
            n
        }
        Err(e) => {
            stats.sink_failures.fetch_add(1, Ordering::Relaxed);
            let evicted = log.append_batch(batch);
            error!(
                sink = sink.name(),
                error = %e,
                records = n,
                evicted,
                "Drain sink failed; batch returned to log"
            );
            0
        }
    }
}
