//! Structured progress reporting
//!
//! Components receive a [`Reporter`] instead of writing to a process-wide
//! logger. The default [`TracingReporter`] turns every event into a `tracing`
//! event; tests substitute a recording implementation.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{info, warn};

use super::stats::{DispatchMode, DispatchReport};
use crate::types::{BenchError, CorrelationId, RemoteFault};

/// Sink for dispatch progress events
///
/// Every method has an empty default so implementations only override what
/// they care about.
pub trait Reporter: Send + Sync {
    /// A dispatch run is about to start
    fn dispatch_started(&self, _mode: DispatchMode, _label: &str, _operations: usize) {}

    /// A batch was built and assigned its correlation id
    fn batch_prepared(&self, _index: usize, _correlation_id: CorrelationId, _operations: usize) {}

    /// A batch came back from the executor
    fn batch_completed(
        &self,
        _index: usize,
        _correlation_id: CorrelationId,
        _operations: usize,
        _elapsed: Duration,
    ) {
    }

    /// A single-request operation completed
    fn operation_completed(&self, _index: usize, _correlation_id: CorrelationId, _elapsed: Duration) {}

    /// The service rejected one operation of a batch
    fn operation_faulted(&self, _batch: usize, _index: usize, _fault: &RemoteFault) {}

    /// A page of records was retrieved
    fn page_retrieved(
        &self,
        _page_number: usize,
        _correlation_id: CorrelationId,
        _records: usize,
        _elapsed: Duration,
    ) {
    }

    /// Fields the Update workload is about to rewrite
    fn fields_touched(&self, _fields: &BTreeSet<String>) {}

    /// A transport fault is being retried after `delay`
    fn retrying(&self, _attempt: u32, _delay: Duration, _error: &BenchError) {}

    /// A dispatch run finished
    fn dispatch_finished(&self, _report: &DispatchReport) {}
}

/// Reporter that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn dispatch_started(&self, mode: DispatchMode, label: &str, operations: usize) {
        info!(%mode, "{} mode: {}", label, mode);
        info!("Dispatching {} {} operation(s)...", operations, label);
    }

    fn batch_prepared(&self, index: usize, correlation_id: CorrelationId, operations: usize) {
        info!(
            batch = index,
            %correlation_id,
            operations,
            "Request Id for request batch number {}: {}",
            index,
            correlation_id
        );
    }

    fn batch_completed(
        &self,
        index: usize,
        correlation_id: CorrelationId,
        operations: usize,
        elapsed: Duration,
    ) {
        info!(
            batch = index,
            %correlation_id,
            "Seconds to process {} record(s) for request batch number {}: {}s",
            operations,
            index,
            elapsed.as_secs_f64()
        );
    }

    fn operation_completed(&self, index: usize, correlation_id: CorrelationId, elapsed: Duration) {
        info!(
            record = index,
            %correlation_id,
            "Seconds to process record number {}: {}s",
            index,
            elapsed.as_secs_f64()
        );
    }

    fn operation_faulted(&self, batch: usize, index: usize, fault: &RemoteFault) {
        warn!(batch, index, code = fault.code, "Operation faulted: {}", fault);
    }

    fn page_retrieved(
        &self,
        page_number: usize,
        correlation_id: CorrelationId,
        records: usize,
        elapsed: Duration,
    ) {
        info!(
            page = page_number,
            %correlation_id,
            "Seconds to retrieve {} record(s) for page number {}: {}s",
            records,
            page_number,
            elapsed.as_secs_f64()
        );
    }

    fn fields_touched(&self, fields: &BTreeSet<String>) {
        info!("Attribute(s) to be updated:");
        for (i, field) in fields.iter().enumerate() {
            info!("({}) {}", i, field);
        }
    }

    fn retrying(&self, attempt: u32, delay: Duration, error: &BenchError) {
        warn!(attempt, ?delay, "Retrying after transport fault: {}", error);
    }

    fn dispatch_finished(&self, report: &DispatchReport) {
        info!(
            "Seconds to process {} record(s): {}s",
            report.total_operations,
            report.total_elapsed.as_secs_f64()
        );
        if let Some(concurrency) = report.observed_concurrency {
            info!("Peak concurrent batches: {}", concurrency);
        }
        if let Some(workers) = report.runtime_workers {
            info!("Number of worker threads: {}", workers);
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! Reporter double used by the engine tests

    use super::*;
    use parking_lot::Mutex;

    /// Events captured by [`RecordingReporter`]
    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Started(DispatchMode, usize),
        Prepared(usize, usize),
        Completed(usize, usize),
        Operation(usize),
        Faulted(usize, usize, u32),
        Page(usize, usize),
        Fields(Vec<String>),
        Retrying(u32),
        Finished(usize),
    }

    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        pub events: Mutex<Vec<Event>>,
    }

    impl RecordingReporter {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().clone()
        }
    }

    impl Reporter for RecordingReporter {
        fn dispatch_started(&self, mode: DispatchMode, _label: &str, operations: usize) {
            self.events.lock().push(Event::Started(mode, operations));
        }

        fn batch_prepared(&self, index: usize, _correlation_id: CorrelationId, operations: usize) {
            self.events.lock().push(Event::Prepared(index, operations));
        }

        fn batch_completed(
            &self,
            index: usize,
            _correlation_id: CorrelationId,
            operations: usize,
            _elapsed: Duration,
        ) {
            self.events.lock().push(Event::Completed(index, operations));
        }

        fn operation_completed(&self, index: usize, _correlation_id: CorrelationId, _elapsed: Duration) {
            self.events.lock().push(Event::Operation(index));
        }

        fn operation_faulted(&self, batch: usize, index: usize, fault: &RemoteFault) {
            self.events.lock().push(Event::Faulted(batch, index, fault.code));
        }

        fn page_retrieved(
            &self,
            page_number: usize,
            _correlation_id: CorrelationId,
            records: usize,
            _elapsed: Duration,
        ) {
            self.events.lock().push(Event::Page(page_number, records));
        }

        fn fields_touched(&self, fields: &BTreeSet<String>) {
            self.events
                .lock()
                .push(Event::Fields(fields.iter().cloned().collect()));
        }

        fn retrying(&self, attempt: u32, _delay: Duration, _error: &BenchError) {
            self.events.lock().push(Event::Retrying(attempt));
        }

        fn dispatch_finished(&self, report: &DispatchReport) {
            self.events.lock().push(Event::Finished(report.total_operations));
        }
    }
}
