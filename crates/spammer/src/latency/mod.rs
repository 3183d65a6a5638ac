//! Send latency tracking.
//!
//! Workers record how long each successful send took. The histogram is shared
//! by every worker of a run and read once when the pool drains.

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Shared latency histogram (microseconds).
///
/// Cloning is cheap and every clone records into the same histogram.
#[derive(Clone)]
pub struct LatencyTracker {
    histogram: Arc<Mutex<Histogram<u64>>>,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self {
            histogram: Arc::new(Mutex::new(
                Histogram::new(3).expect("histogram creation should succeed"),
            )),
        }
    }

    /// Record one send latency.
    #[inline]
    pub fn record(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        // Auto-resizing histogram; a failed record only loses one sample.
        let _ = self.histogram.lock().record(micros.max(1));
    }

    /// Snapshot the histogram into a report.
    pub fn report(&self) -> LatencyReport {
        let histogram = self.histogram.lock().clone();
        LatencyReport { histogram }
    }
}

/// Latency percentiles for a run.
#[derive(Clone)]
pub struct LatencyReport {
    histogram: Histogram<u64>,
}

impl std::fmt::Debug for LatencyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyReport")
            .field("samples", &self.samples())
            .field("p50", &self.p50_latency())
            .field("p99", &self.p99_latency())
            .finish()
    }
}

impl LatencyReport {
    pub fn p50_latency(&self) -> Duration {
        Duration::from_micros(self.histogram.value_at_quantile(0.50))
    }

    pub fn p90_latency(&self) -> Duration {
        Duration::from_micros(self.histogram.value_at_quantile(0.90))
    }

    pub fn p99_latency(&self) -> Duration {
        Duration::from_micros(self.histogram.value_at_quantile(0.99))
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_micros(self.histogram.max())
    }

    pub fn min_latency(&self) -> Duration {
        Duration::from_micros(self.histogram.min())
    }

    pub fn avg_latency(&self) -> Duration {
        Duration::from_micros(self.histogram.mean() as u64)
    }

    /// Number of recorded sends.
    pub fn samples(&self) -> u64 {
        self.histogram.len()
    }

    pub fn has_measurements(&self) -> bool {
        !self.histogram.is_empty()
    }

    /// Print the latency section of the run summary.
    pub fn print_summary(&self) {
        if !self.has_measurements() {
            println!("\nNo latency measurements recorded.");
            return;
        }

        println!();
        println!("Send latency ({} samples):", self.samples());
        println!("  P50:  {:?}", self.p50_latency());
        println!("  P90:  {:?}", self.p90_latency());
        println!("  P99:  {:?}", self.p99_latency());
        println!("  Max:  {:?}", self.max_latency());
        println!("  Avg:  {:?}", self.avg_latency());
        println!("  Min:  {:?}", self.min_latency());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = LatencyTracker::new().report();
        assert!(!report.has_measurements());
        assert_eq!(report.samples(), 0);
    }

    #[test]
    fn test_clones_share_histogram() {
        let tracker = LatencyTracker::new();
        let worker = tracker.clone();

        for ms in 1..=100 {
            worker.record(Duration::from_millis(ms));
        }

        let report = tracker.report();
        assert_eq!(report.samples(), 100);

        // Three significant digits: within 0.1% of the true value.
        let p50 = report.p50_latency().as_micros() as i64;
        assert!((p50 - 50_000).abs() <= 50, "p50 was {p50}us");
        assert!(report.max_latency() >= Duration::from_micros(99_900));
        assert!(report.min_latency() <= Duration::from_micros(1_001));
    }

    #[test]
    fn test_zero_latency_is_recorded() {
        let tracker = LatencyTracker::new();
        tracker.record(Duration::ZERO);
        assert_eq!(tracker.report().samples(), 1);
    }
}
