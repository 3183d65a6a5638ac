//! Run coordinator.
//!
//! Validates the configuration, derives the endpoints, starts the worker pool,
//! feeds it the timeline and waits for the pool to drain before reporting.

use crate::config::{ConfigError, RunConfig};
use crate::dispatch::{DispatchError, PoolConfig, WorkerPool};
use crate::endpoints::derive_endpoints;
use crate::latency::{LatencyReport, LatencyTracker};
use crate::timeline::Timeline;
use radacct_core::AccountingSender;
use radacct_types::Round;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Drives one load-test run against a sender.
pub struct Spammer {
    config: RunConfig,
    sender: Arc<dyn AccountingSender>,
}

impl Spammer {
    /// Create a spammer, rejecting configurations that cannot run.
    pub fn new(config: RunConfig, sender: Arc<dyn AccountingSender>) -> Result<Self, SpammerError> {
        config.validate()?;
        Ok(Self { config, sender })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Generate and send every event, returning once all of them have been
    /// processed.
    pub async fn run(&self) -> Result<RunSummary, SpammerError> {
        let config = &self.config;
        let endpoints = derive_endpoints(
            config.endpoint_count,
            config.min_interim_per_endpoint,
            config.max_interim_per_endpoint,
        )?;
        let timeline = Timeline::new(&endpoints);
        let rounds = timeline.max_rounds();
        let expected = timeline.total_events();

        info!(
            server = %config.target(),
            endpoints = endpoints.len(),
            events = expected,
            concurrency = config.concurrency,
            "Load test will run {} rounds",
            rounds
        );

        let latency = LatencyTracker::new();
        let pool = WorkerPool::start_with_tracker(
            PoolConfig {
                lane_count: config.concurrency,
                lane_capacity: config.lane_capacity,
                send_timeout: config.send_timeout,
            },
            Arc::clone(&self.sender),
            latency.clone(),
        )
        .map_err(SpammerError::from_dispatch)?;

        let start = Instant::now();
        let mut current_round = Round(0);
        for event in timeline {
            if event.round != current_round {
                current_round = event.round;
                debug!(round = current_round.get(), "Submitting round");
            }
            pool.submit(event).await.map_err(SpammerError::from_dispatch)?;
        }

        let report = pool
            .drain_and_stop()
            .await
            .map_err(SpammerError::from_dispatch)?;
        let duration = start.elapsed();

        if report.processed != report.submitted || report.submitted != expected {
            return Err(SpammerError::IncompleteDrain {
                expected,
                submitted: report.submitted,
                processed: report.processed,
            });
        }

        let summary = RunSummary {
            events_submitted: report.submitted,
            events_sent: report.sent,
            events_failed: report.failed(),
            timeouts: report.timeouts,
            transport_errors: report.transport_errors,
            protocol_errors: report.protocol_errors,
            endpoints: endpoints.len(),
            rounds,
            duration,
            latency: latency.report(),
        };

        info!(
            sent = summary.events_sent,
            failed = summary.events_failed,
            duration_ms = duration.as_millis() as u64,
            "Load test finished"
        );

        Ok(summary)
    }
}

/// Run `config` against `sender` once.
pub async fn run(
    config: RunConfig,
    sender: Arc<dyn AccountingSender>,
) -> Result<RunSummary, SpammerError> {
    Spammer::new(config, sender)?.run().await
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Events accepted by the pool.
    pub events_submitted: u64,
    /// Events the server acknowledged.
    pub events_sent: u64,
    /// Events whose send failed, of any kind.
    pub events_failed: u64,
    pub timeouts: u64,
    pub transport_errors: u64,
    pub protocol_errors: u64,
    /// Number of simulated endpoints.
    pub endpoints: usize,
    /// Rounds the timeline spanned.
    pub rounds: u32,
    /// Time from first submit to the end of the drain.
    pub duration: Duration,
    /// Latency of acknowledged sends.
    pub latency: LatencyReport,
}

impl RunSummary {
    /// Processed events per second.
    pub fn throughput(&self) -> f64 {
        let elapsed = self.duration.as_secs_f64();
        if elapsed > 0.0 {
            (self.events_sent + self.events_failed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// True when every event was acknowledged.
    pub fn is_clean(&self) -> bool {
        self.events_failed == 0
    }

    /// Print the summary to stdout.
    pub fn print(&self) {
        println!("\n=== Accounting Load Test Report ===");
        println!("Duration:   {:?}", self.duration);
        println!("Endpoints:  {}", self.endpoints);
        println!("Rounds:     {}", self.rounds);
        println!("Submitted:  {}", self.events_submitted);
        println!("Sent:       {}", self.events_sent);
        println!("Failed:     {}", self.events_failed);
        if !self.is_clean() {
            println!("  Timeouts:   {}", self.timeouts);
            println!("  Transport:  {}", self.transport_errors);
            println!("  Protocol:   {}", self.protocol_errors);
        }
        println!("Throughput: {:.2} events/s", self.throughput());

        self.latency.print_summary();
    }
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum SpammerError {
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Pool drained with {processed} of {submitted} events processed ({expected} generated)")]
    IncompleteDrain {
        expected: u64,
        submitted: u64,
        processed: u64,
    },
}

impl SpammerError {
    fn from_dispatch(e: DispatchError) -> Self {
        match e {
            DispatchError::InvalidConfig(c) => SpammerError::InvalidConfiguration(c),
            other => SpammerError::Dispatch(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radacct_core::SendErrorKind;
    use radacct_test_helpers::{Outcome, ScriptedSender};
    use radacct_types::StatusKind;

    fn config() -> RunConfig {
        RunConfig::new().with_send_timeout(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_single_endpoint_start_and_stop() {
        let sender = Arc::new(ScriptedSender::always_ack());
        let summary = run(
            config().with_endpoint_count(1).with_interim_bounds(0, 20),
            sender.clone(),
        )
        .await
        .unwrap();

        let events = sender.attempts();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, StatusKind::Start);
        assert_eq!(events[0].bytes_in, 1000);
        assert_eq!(events[1].status, StatusKind::Stop);
        assert_eq!(events[1].bytes_in, 2000);

        assert_eq!(summary.events_sent, 2);
        assert_eq!(summary.rounds, 2);
        assert!(summary.is_clean());
        assert_eq!(summary.latency.samples(), 2);
    }

    #[tokio::test]
    async fn test_three_endpoints_nine_events() {
        // Session counts 2, 3 and 4.
        let sender = Arc::new(ScriptedSender::always_ack());
        let summary = run(config().with_endpoint_count(3), sender.clone())
            .await
            .unwrap();

        assert_eq!(summary.events_submitted, 9);
        assert_eq!(summary.events_sent, 9);
        assert_eq!(summary.rounds, 4);

        let stops = sender
            .attempts()
            .iter()
            .filter(|e| e.status == StatusKind::Stop)
            .count();
        assert_eq!(stops, 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_sends_nothing() {
        let sender = Arc::new(ScriptedSender::always_ack());
        let result = run(config().with_concurrency(0), sender.clone()).await;

        assert!(matches!(
            result,
            Err(SpammerError::InvalidConfiguration(ConfigError::ZeroConcurrency))
        ));
        assert_eq!(sender.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_max_interim_sends_nothing() {
        let sender = Arc::new(ScriptedSender::always_ack());
        let result = run(config().with_interim_bounds(0, 0), sender.clone()).await;

        assert!(matches!(
            result,
            Err(SpammerError::InvalidConfiguration(ConfigError::ZeroMaxInterim))
        ));
        assert_eq!(sender.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let sender = Arc::new(ScriptedSender::new(|e| match e.status {
            StatusKind::InterimUpdate => Outcome::Fail(SendErrorKind::Protocol),
            _ => Outcome::Ack,
        }));
        let summary = run(
            config().with_endpoint_count(20).with_concurrency(4),
            sender.clone(),
        )
        .await
        .unwrap();

        // Endpoint i has i interim updates for i < 20.
        let interims: u64 = (0..20).sum();
        assert_eq!(summary.protocol_errors, interims);
        assert_eq!(summary.events_failed, interims);
        assert_eq!(summary.events_sent, 40);
        assert!(!summary.is_clean());
    }

    #[tokio::test]
    async fn test_no_endpoints_is_empty_run() {
        let sender = Arc::new(ScriptedSender::always_ack());
        let summary = run(config().with_endpoint_count(0), sender.clone())
            .await
            .unwrap();

        assert_eq!(summary.events_submitted, 0);
        assert_eq!(summary.rounds, 0);
        assert!(!summary.latency.has_measurements());
    }
}
