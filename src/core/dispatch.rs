//! Batch dispatch engine
//!
//! This module provides the `DispatchEngine`, which submits Create, Update and
//! Delete operations to the service through one of three strategies and
//! aggregates what comes back.
//!
//! # Strategies
//!
//! - **Single**: one request per operation, strictly sequential. The first
//!   failure of any kind aborts the run.
//! - **Sequential batch**: one batch request at a time with
//!   `continue_on_error = false`. A fault ends that batch; the run moves on to
//!   the next batch. The reported total is the sum of per-batch times.
//! - **Parallel batch**: every batch gets `continue_on_error = true` and the
//!   complete set is handed to the executor in a single call. The reported
//!   total is the wall-clock time around that call.
//!
//! # Failure Handling
//!
//! Remote faults inside a batch are recorded, never thrown. Transport faults
//! abort the run. With a [`RetryPolicy`] allowing more than one attempt,
//! timeouts and connection faults of single requests and sequential batches
//! are retried with exponential backoff before giving up. The parallel call is
//! never retried: the executor drops the results of batches that already
//! committed, so a retry would apply them twice.
//!
//! # Concurrency
//!
//! The engine itself never runs requests concurrently. The parallel strategy
//! delegates all concurrency to the [`BatchExecutor`] and aggregates results
//! only after the executor call returns.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::reporter::Reporter;
use super::stats::{DispatchMode, DispatchReport, StatsCollector};
use super::traits::{BatchExecutor, SingleCallExecutor};
use crate::types::{Batch, BatchResult, BatchSettings, BenchError, Operation, RecordId};

/// Bounded retry for transport faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Never retry
    pub const NONE: Self = Self {
        max_attempts: 1,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    };

    /// Allow `retries` additional attempts starting at `initial_backoff`
    pub fn new(retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            initial_backoff,
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Delay before retry number `attempt` (one based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

/// Result of a dispatch run
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Ids of every record the run targeted, in submission order
    pub ids: Vec<RecordId>,

    /// Timings and tallies
    pub report: DispatchReport,

    /// Raw batch results in batch order (empty for the single strategy)
    pub results: Vec<BatchResult>,
}

/// Generic engine behind every workload and strategy
#[derive(Clone)]
pub struct DispatchEngine {
    batch_executor: Arc<dyn BatchExecutor>,
    single_executor: Arc<dyn SingleCallExecutor>,
    reporter: Arc<dyn Reporter>,
    retry: RetryPolicy,
}

impl DispatchEngine {
    /// Create an engine over the given executors and reporter
    pub fn new(
        batch_executor: Arc<dyn BatchExecutor>,
        single_executor: Arc<dyn SingleCallExecutor>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            batch_executor,
            single_executor,
            reporter,
            retry: RetryPolicy::NONE,
        }
    }

    /// Retry transport faults according to `retry`
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reporter receiving this engine's events
    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    /// Submit every operation as its own request, one after another
    ///
    /// # Errors
    ///
    /// The first failure of any kind, remote faults included, aborts the run
    /// and is returned.
    pub async fn execute_sequential_single(
        &self,
        label: &str,
        operations: Vec<Operation>,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, BenchError> {
        let stats = StatsCollector::new(DispatchMode::Single);
        self.reporter
            .dispatch_started(DispatchMode::Single, label, operations.len());

        let mut ids = Vec::with_capacity(operations.len());
        for (index, operation) in operations.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(BenchError::cancelled());
            }
            let correlation_id = operation.correlation_id;
            stats.add_operations(1);

            let started = Instant::now();
            let id = self
                .call_with_retry(operation, cancel, |operation| {
                    self.single_executor.execute_one(operation, cancel)
                })
                .await?;
            let elapsed = started.elapsed();

            ids.push(id);
            stats.add_successes(1);
            stats.record(format!("record {}", index), correlation_id, 1, elapsed);
            self.reporter
                .operation_completed(index, correlation_id, elapsed);
        }

        Ok(DispatchOutcome {
            ids,
            report: self.finish(&stats),
            results: Vec::new(),
        })
    }

    /// Submit batches one at a time, stopping each batch at its first fault
    ///
    /// # Errors
    ///
    /// Transport faults abort the run. Remote faults only end their batch.
    pub async fn execute_sequential_batches(
        &self,
        label: &str,
        batches: Vec<Batch>,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, BenchError> {
        let stats = StatsCollector::new(DispatchMode::SequentialBatch);
        let total: usize = batches.iter().map(Batch::len).sum();
        self.reporter
            .dispatch_started(DispatchMode::SequentialBatch, label, total);

        let mut ids = Vec::with_capacity(total);
        let mut results = Vec::with_capacity(batches.len());
        for (index, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(BenchError::cancelled());
            }
            let batch = batch.with_settings(BatchSettings::STOP_ON_ERROR);
            let len = batch.len();
            ids.extend(batch.target_ids());
            self.reporter
                .batch_prepared(index, batch.correlation_id, len);

            let key = index.to_string();
            let requests = BTreeMap::from([(key.clone(), batch)]);
            let mut responses = self
                .call_with_retry(requests, cancel, |requests| {
                    self.batch_executor.execute(requests, cancel)
                })
                .await?;

            let result = take_result(&mut responses, &key)?;
            self.tally(&stats, index, len, &result);
            results.push(result);
        }

        stats.set_observed_concurrency(self.batch_executor.peak_concurrency());
        Ok(DispatchOutcome {
            ids,
            report: self.finish(&stats),
            results,
        })
    }

    /// Submit every batch through a single concurrent executor call
    ///
    /// The complete batch mapping is built before the call; results are
    /// aggregated only after it returns.
    ///
    /// # Errors
    ///
    /// Transport faults reported by the executor abort the run.
    pub async fn execute_parallel_batches(
        &self,
        label: &str,
        batches: Vec<Batch>,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, BenchError> {
        let stats = StatsCollector::new(DispatchMode::ParallelBatch);
        let total: usize = batches.iter().map(Batch::len).sum();

        let mut ids = Vec::with_capacity(total);
        let mut order = Vec::with_capacity(batches.len());
        let mut requests = BTreeMap::new();
        for (index, batch) in batches.into_iter().enumerate() {
            let batch = batch.with_settings(BatchSettings::CONTINUE_ON_ERROR);
            ids.extend(batch.target_ids());
            self.reporter
                .batch_prepared(index, batch.correlation_id, batch.len());

            let key = index.to_string();
            order.push((key.clone(), batch.len()));
            requests.insert(key, batch);
        }

        self.reporter
            .dispatch_started(DispatchMode::ParallelBatch, label, total);
        if cancel.is_cancelled() {
            return Err(BenchError::cancelled());
        }

        // Never retried: batches that committed before the fault would be sent twice
        let started = Instant::now();
        let mut responses = self.batch_executor.execute(requests, cancel).await?;
        let wall_clock = started.elapsed();

        let mut results = Vec::with_capacity(order.len());
        for (index, (key, len)) in order.into_iter().enumerate() {
            let result = take_result(&mut responses, &key)?;
            self.tally(&stats, index, len, &result);
            results.push(result);
        }

        stats.set_wall_clock(wall_clock);
        stats.set_observed_concurrency(self.batch_executor.peak_concurrency());
        Ok(DispatchOutcome {
            ids,
            report: self.finish(&stats),
            results,
        })
    }

    /// Run `call`, retrying retryable transport faults per the policy
    async fn call_with_retry<R, T, F, Fut>(
        &self,
        request: R,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, BenchError>
    where
        R: Clone,
        F: FnMut(R) -> Fut,
        Fut: Future<Output = Result<T, BenchError>>,
    {
        let mut attempt = 1;
        let mut request = request;
        loop {
            let retained = (attempt < self.retry.max_attempts).then(|| request.clone());
            match call(request).await {
                Err(error) if error.is_retryable() && !cancel.is_cancelled() => {
                    let Some(retained) = retained else {
                        return Err(error);
                    };
                    let delay = self.retry.backoff(attempt);
                    self.reporter.retrying(attempt, delay, &error);
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(BenchError::cancelled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                    request = retained;
                }
                result => return result,
            }
        }
    }

    fn tally(&self, stats: &StatsCollector, index: usize, len: usize, result: &BatchResult) {
        stats.record(format!("batch {}", index), result.correlation_id, len, result.elapsed);
        stats.add_batch_result(result, len);
        for (position, fault) in result.faults() {
            self.reporter.operation_faulted(index, position, fault);
        }
        self.reporter
            .batch_completed(index, result.correlation_id, len, result.elapsed);
    }

    fn finish(&self, stats: &StatsCollector) -> DispatchReport {
        stats.set_runtime_workers(runtime_workers());
        let report = stats.summarize();
        self.reporter.dispatch_finished(&report);
        report
    }
}

fn take_result(
    responses: &mut BTreeMap<String, BatchResult>,
    key: &str,
) -> Result<BatchResult, BenchError> {
    responses
        .remove(key)
        .ok_or_else(|| BenchError::internal(format!("executor returned no result for batch {}", key)))
}

fn runtime_workers() -> Option<usize> {
    tokio::runtime::Handle::try_current()
        .ok()
        .map(|handle| handle.metrics().num_workers())
}
