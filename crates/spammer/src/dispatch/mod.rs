//! Lane routing and the worker pool.
//!
//! Each lane is a bounded tokio channel drained by exactly one worker task.
//! Events of one endpoint always land on the same lane, so their relative
//! order survives dispatch. A worker exits only once its lane is closed and
//! empty; closing happens when [`WorkerPool::drain_and_stop`] consumes the
//! pool, so no event can be submitted after the drain starts.

use crate::config::ConfigError;
use crate::latency::LatencyTracker;
use futures::future::join_all;
use radacct_core::{AccountingSender, SendError, SendErrorKind};
use radacct_types::{AccountingEvent, LaneId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Dispatch integrity failures. Unlike send failures these abort the run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0} closed while events were still being submitted")]
    LaneClosed(LaneId),

    #[error("Worker for {lane} failed: {reason}")]
    WorkerFailed { lane: LaneId, reason: String },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// Lane for an event: low octet of its network address modulo `lane_count`.
///
/// Stable per endpoint. Not a uniform hash; with fewer than 256 distinct low
/// octets the lanes can be uneven.
pub fn route(event: &AccountingEvent, lane_count: usize) -> LaneId {
    LaneId(event.network_address.octets()[3] as usize % lane_count)
}

/// Pool sizing and per-send deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub lane_count: usize,
    pub lane_capacity: usize,
    pub send_timeout: Duration,
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.lane_capacity == 0 {
            return Err(ConfigError::ZeroLaneCapacity);
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigError::ZeroSendTimeout);
        }
        Ok(())
    }
}

/// Run counters, shared by all workers.
#[derive(Debug, Default)]
pub struct DispatchStats {
    pub submitted: AtomicU64,
    pub processed: AtomicU64,
    pub sent: AtomicU64,
    pub timeouts: AtomicU64,
    pub transport_errors: AtomicU64,
    pub protocol_errors: AtomicU64,
}

impl DispatchStats {
    fn record_failure(&self, kind: SendErrorKind) {
        let counter = match kind {
            SendErrorKind::Timeout => &self.timeouts,
            SendErrorKind::Transport => &self.transport_errors,
            SendErrorKind::Protocol => &self.protocol_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DispatchReport {
        DispatchReport {
            submitted: self.submitted.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            sent: self.sent.load(Ordering::SeqCst),
            timeouts: self.timeouts.load(Ordering::SeqCst),
            transport_errors: self.transport_errors.load(Ordering::SeqCst),
            protocol_errors: self.protocol_errors.load(Ordering::SeqCst),
        }
    }
}

/// Counters after every worker has exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub submitted: u64,
    pub processed: u64,
    pub sent: u64,
    pub timeouts: u64,
    pub transport_errors: u64,
    pub protocol_errors: u64,
}

impl DispatchReport {
    pub fn failed(&self) -> u64 {
        self.timeouts + self.transport_errors + self.protocol_errors
    }
}

/// Fixed set of lanes, one worker task each.
pub struct WorkerPool {
    lanes: Vec<mpsc::Sender<AccountingEvent>>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<DispatchStats>,
    latency: LatencyTracker,
}

impl WorkerPool {
    /// Create the lanes and spawn one worker per lane.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: PoolConfig,
        sender: Arc<dyn AccountingSender>,
    ) -> Result<Self, DispatchError> {
        Self::start_with_tracker(config, sender, LatencyTracker::new())
    }

    /// Like [`start`](Self::start), recording send latency into `latency`.
    pub fn start_with_tracker(
        config: PoolConfig,
        sender: Arc<dyn AccountingSender>,
        latency: LatencyTracker,
    ) -> Result<Self, DispatchError> {
        config.validate()?;

        let stats = Arc::new(DispatchStats::default());
        let mut lanes = Vec::with_capacity(config.lane_count);
        let mut workers = Vec::with_capacity(config.lane_count);

        for index in 0..config.lane_count {
            let (tx, rx) = mpsc::channel(config.lane_capacity);
            let worker = Worker {
                lane: LaneId(index),
                rx,
                sender: Arc::clone(&sender),
                send_timeout: config.send_timeout,
                stats: Arc::clone(&stats),
                latency: latency.clone(),
            };
            lanes.push(tx);
            workers.push(tokio::spawn(worker.run()));
        }

        info!(
            lanes = config.lane_count,
            lane_capacity = config.lane_capacity,
            send_timeout_ms = config.send_timeout.as_millis() as u64,
            "Worker pool started"
        );

        Ok(Self {
            lanes,
            workers,
            stats,
            latency,
        })
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Shared counters, readable while the run is in progress.
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    /// Route `event` to its lane and enqueue it.
    ///
    /// Waits while the lane is full. Fails if the lane's worker is gone, in
    /// which case the event was not accepted.
    pub async fn submit(&self, event: AccountingEvent) -> Result<LaneId, DispatchError> {
        let lane = route(&event, self.lanes.len());
        self.lanes[lane.0]
            .send(event)
            .await
            .map_err(|_| DispatchError::LaneClosed(lane))?;
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(lane)
    }

    /// Close every lane and wait until each worker has drained its lane and
    /// exited.
    ///
    /// Returns only after every accepted event has been processed. A worker
    /// that panicked is reported as [`DispatchError::WorkerFailed`].
    pub async fn drain_and_stop(self) -> Result<DispatchReport, DispatchError> {
        let WorkerPool {
            lanes,
            workers,
            stats,
            ..
        } = self;

        drop(lanes);
        debug!(workers = workers.len(), "Lanes closed, waiting for workers");

        let results = join_all(workers).await;
        for (index, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                return Err(DispatchError::WorkerFailed {
                    lane: LaneId(index),
                    reason: e.to_string(),
                });
            }
        }

        let report = stats.snapshot();
        info!(
            submitted = report.submitted,
            processed = report.processed,
            sent = report.sent,
            failed = report.failed(),
            "Worker pool drained"
        );
        Ok(report)
    }
}

/// Drains one lane, sending events one at a time.
struct Worker {
    lane: LaneId,
    rx: mpsc::Receiver<AccountingEvent>,
    sender: Arc<dyn AccountingSender>,
    send_timeout: Duration,
    stats: Arc<DispatchStats>,
    latency: LatencyTracker,
}

impl Worker {
    async fn run(mut self) {
        debug!(lane = %self.lane, "Worker started");

        // recv() yields None only once the lane is closed and empty.
        while let Some(event) = self.rx.recv().await {
            self.process(&event).await;
            self.stats.processed.fetch_add(1, Ordering::Relaxed);
        }

        debug!(lane = %self.lane, "Worker finished");
    }

    async fn process(&self, event: &AccountingEvent) {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.send_timeout, self.sender.send(event)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(self.send_timeout)),
        };

        match result {
            Ok(_) => {
                self.latency.record(started.elapsed());
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                debug!(
                    lane = %self.lane,
                    status = %event.status,
                    ip = %event.network_address,
                    mac = %event.hardware_address,
                    round = event.round.get(),
                    "Accounting event sent"
                );
            }
            Err(e) => {
                self.stats.record_failure(e.kind());
                warn!(
                    lane = %self.lane,
                    status = %event.status,
                    ip = %event.network_address,
                    mac = %event.hardware_address,
                    bytes_in = event.bytes_in,
                    bytes_out = event.bytes_out,
                    round = event.round.get(),
                    error = %e,
                    "Failed to send accounting event"
                );
            }
        }
    }
}
