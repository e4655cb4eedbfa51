//! Timing and outcome accumulation
//!
//! `StatsCollector` is purely additive: samples and tallies can be recorded in
//! any order and from several tasks at once. `summarize` turns the collected
//! data into a [`DispatchReport`].

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::types::{BatchResult, CorrelationId};

/// Which strategy produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One request per operation
    Single,
    /// One batch request at a time
    SequentialBatch,
    /// Every batch submitted through one concurrent executor call
    ParallelBatch,
    /// Page-by-page retrieval
    PagedRetrieve,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchMode::Single => "Execute Single",
            DispatchMode::SequentialBatch => "Execute Multiple",
            DispatchMode::ParallelBatch => "Parallel Execute Multiple",
            DispatchMode::PagedRetrieve => "Execute Multiple FetchXML",
        };
        f.write_str(name)
    }
}

/// Elapsed time of one operation, batch or page
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSample {
    /// Position in which the sample was recorded
    pub sequence: usize,

    /// Human readable label, e.g. `batch 3`
    pub label: String,

    /// Correlation id of the request the sample belongs to
    pub correlation_id: CorrelationId,

    /// Number of records covered by the sample
    pub operations: usize,

    /// Time spent
    pub elapsed: Duration,
}

/// Aggregate outcome of one dispatch run
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// Strategy that produced the report
    pub mode: DispatchMode,

    /// Operations submitted
    pub total_operations: usize,

    /// Operations the service applied
    pub successes: usize,

    /// Operations the service rejected
    pub failures: usize,

    /// Operations never attempted because their batch stopped at a fault
    pub unprocessed: usize,

    /// Wall-clock time (parallel) or sum of sample times (sequential)
    pub total_elapsed: Duration,

    /// Per-operation, per-batch or per-page timings, in recording order
    pub samples: Vec<TimingSample>,

    /// Peak number of batches in flight, as reported by the executor
    pub observed_concurrency: Option<usize>,

    /// Worker threads of the runtime the run executed on
    pub runtime_workers: Option<usize>,
}

impl DispatchReport {
    /// Operations per second over `total_elapsed`
    pub fn throughput(&self) -> f64 {
        let secs = self.total_elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_operations as f64 / secs
    }

    /// Shortest sample
    pub fn min_sample(&self) -> Option<Duration> {
        self.samples.iter().map(|s| s.elapsed).min()
    }

    /// Longest sample
    pub fn max_sample(&self) -> Option<Duration> {
        self.samples.iter().map(|s| s.elapsed).max()
    }

    /// Mean sample time
    pub fn mean_sample(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().map(|s| s.elapsed).sum();
        Some(total / self.samples.len() as u32)
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mode:            {}", self.mode)?;
        writeln!(f, "Operations:      {}", self.total_operations)?;
        writeln!(f, "Succeeded:       {}", self.successes)?;
        writeln!(f, "Failed:          {}", self.failures)?;
        writeln!(f, "Not processed:   {}", self.unprocessed)?;
        writeln!(f, "Elapsed:         {:.3}s", self.total_elapsed.as_secs_f64())?;
        writeln!(f, "Throughput:      {:.1} records/s", self.throughput())?;
        if let (Some(min), Some(mean), Some(max)) =
            (self.min_sample(), self.mean_sample(), self.max_sample())
        {
            writeln!(
                f,
                "Samples:         {} (min {:.3}s / mean {:.3}s / max {:.3}s)",
                self.samples.len(),
                min.as_secs_f64(),
                mean.as_secs_f64(),
                max.as_secs_f64()
            )?;
        }
        if let Some(concurrency) = self.observed_concurrency {
            writeln!(f, "Peak in flight:  {}", concurrency)?;
        }
        if let Some(workers) = self.runtime_workers {
            writeln!(f, "Worker threads:  {}", workers)?;
        }
        Ok(())
    }
}

/// Thread-safe accumulator behind a [`DispatchReport`]
#[derive(Debug)]
pub struct StatsCollector {
    mode: DispatchMode,
    samples: Mutex<Vec<TimingSample>>,
    operations: AtomicUsize,
    successes: AtomicUsize,
    failures: AtomicUsize,
    unprocessed: AtomicUsize,
    wall_clock: Mutex<Option<Duration>>,
    observed_concurrency: Mutex<Option<usize>>,
    runtime_workers: Mutex<Option<usize>>,
}

impl StatsCollector {
    /// Create an empty collector for the given mode
    pub fn new(mode: DispatchMode) -> Self {
        Self {
            mode,
            samples: Mutex::new(Vec::new()),
            operations: AtomicUsize::new(0),
            successes: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            unprocessed: AtomicUsize::new(0),
            wall_clock: Mutex::new(None),
            observed_concurrency: Mutex::new(None),
            runtime_workers: Mutex::new(None),
        }
    }

    /// Record the elapsed time of one operation, batch or page
    pub fn record(
        &self,
        label: impl Into<String>,
        correlation_id: CorrelationId,
        operations: usize,
        elapsed: Duration,
    ) {
        let mut samples = self.samples.lock();
        let sequence = samples.len();
        samples.push(TimingSample {
            sequence,
            label: label.into(),
            correlation_id,
            operations,
            elapsed,
        });
    }

    /// Count submitted operations
    pub fn add_operations(&self, count: usize) {
        self.operations.fetch_add(count, Ordering::Relaxed);
    }

    /// Count operations the service applied
    pub fn add_successes(&self, count: usize) {
        self.successes.fetch_add(count, Ordering::Relaxed);
    }

    /// Count operations the service rejected
    pub fn add_failures(&self, count: usize) {
        self.failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Tally a batch result against the size of the submitted batch
    pub fn add_batch_result(&self, result: &BatchResult, batch_len: usize) {
        self.add_operations(batch_len);
        self.add_successes(result.successes());
        self.add_failures(result.failures());
        self.unprocessed
            .fetch_add(result.unprocessed(batch_len), Ordering::Relaxed);
    }

    /// Use a measured wall-clock time instead of the sum of samples
    pub fn set_wall_clock(&self, elapsed: Duration) {
        *self.wall_clock.lock() = Some(elapsed);
    }

    /// Record the executor's peak concurrency
    pub fn set_observed_concurrency(&self, concurrency: Option<usize>) {
        *self.observed_concurrency.lock() = concurrency;
    }

    /// Record the runtime's worker thread count
    pub fn set_runtime_workers(&self, workers: Option<usize>) {
        *self.runtime_workers.lock() = workers;
    }

    /// Build the report from everything recorded so far
    pub fn summarize(&self) -> DispatchReport {
        let mut samples = self.samples.lock().clone();
        samples.sort_by_key(|sample| sample.sequence);

        let wall_clock = *self.wall_clock.lock();
        let total_elapsed =
            wall_clock.unwrap_or_else(|| samples.iter().map(|s| s.elapsed).sum());

        DispatchReport {
            mode: self.mode,
            total_operations: self.operations.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            unprocessed: self.unprocessed.load(Ordering::Relaxed),
            total_elapsed,
            samples,
            observed_concurrency: *self.observed_concurrency.lock(),
            runtime_workers: *self.runtime_workers.lock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{fault_code, OperationOutcome, OperationResponse, RemoteFault};
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_total_is_sum_of_samples_without_wall_clock() {
        let stats = StatsCollector::new(DispatchMode::SequentialBatch);
        stats.record("batch 0", Uuid::new_v4(), 10, Duration::from_millis(300));
        stats.record("batch 1", Uuid::new_v4(), 10, Duration::from_millis(200));
        stats.add_operations(20);

        let report = stats.summarize();

        assert_eq!(report.total_elapsed, Duration::from_millis(500));
        assert_eq!(report.samples.len(), 2);
        assert_eq!(report.min_sample(), Some(Duration::from_millis(200)));
        assert_eq!(report.max_sample(), Some(Duration::from_millis(300)));
        assert_eq!(report.mean_sample(), Some(Duration::from_millis(250)));
        assert_eq!(report.throughput(), 40.0);
    }

    #[test]
    fn test_wall_clock_overrides_sum() {
        let stats = StatsCollector::new(DispatchMode::ParallelBatch);
        stats.record("batch 0", Uuid::new_v4(), 10, Duration::from_secs(2));
        stats.record("batch 1", Uuid::new_v4(), 10, Duration::from_secs(2));
        stats.set_wall_clock(Duration::from_secs(2));
        stats.set_observed_concurrency(Some(2));

        let report = stats.summarize();

        assert_eq!(report.total_elapsed, Duration::from_secs(2));
        assert_eq!(report.observed_concurrency, Some(2));
    }

    #[test]
    fn test_add_batch_result_tallies_outcomes() {
        let stats = StatsCollector::new(DispatchMode::SequentialBatch);
        let result = BatchResult {
            correlation_id: Uuid::new_v4(),
            responses: vec![
                OperationResponse {
                    index: 0,
                    correlation_id: Uuid::new_v4(),
                    outcome: OperationOutcome::Success { id: Uuid::new_v4() },
                },
                OperationResponse {
                    index: 1,
                    correlation_id: Uuid::new_v4(),
                    outcome: OperationOutcome::Fault(RemoteFault::new(fault_code::INJECTED, "x")),
                },
            ],
            elapsed: Duration::ZERO,
        };

        stats.add_batch_result(&result, 5);
        let report = stats.summarize();

        assert_eq!(report.total_operations, 5);
        assert_eq!(report.successes, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.unprocessed, 3);
    }

    #[test]
    fn test_concurrent_recording() {
        let stats = Arc::new(StatsCollector::new(DispatchMode::ParallelBatch));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        stats.record(format!("{}-{}", t, i), Uuid::new_v4(), 1, Duration::from_micros(1));
                        stats.add_operations(1);
                        stats.add_successes(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let report = stats.summarize();
        assert_eq!(report.samples.len(), 800);
        assert_eq!(report.total_operations, 800);
        assert_eq!(report.successes, 800);
        let sequences: Vec<_> = report.samples.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, (0..800).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_report_display() {
        let report = StatsCollector::new(DispatchMode::Single).summarize();
        let rendered = report.to_string();

        assert_eq!(report.throughput(), 0.0);
        assert!(rendered.contains("Mode:            Execute Single"));
        assert!(rendered.contains("Operations:      0"));
        assert!(!rendered.contains("Samples:"));
    }
}
