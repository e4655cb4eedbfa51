//! Connection-pooled executor over the simulated service
//!
//! `PooledExecutor` implements every capability the dispatch engine consumes.
//! Batch requests fan out into one tokio task per batch. A semaphore sized by
//! the connection limit bounds how many batches are in flight at once, and
//! every request is subject to the configured timeout.
//!
//! # Failure Handling
//!
//! The first transport fault (timeout, connection loss, cancellation) aborts
//! every task still running and fails the whole call. A panicking task is
//! reported as `BenchError::Internal`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::memory::InMemoryService;
use crate::core::{BatchExecutor, Page, PageRequest, RecordSource, SingleCallExecutor};
use crate::types::{Batch, BatchResult, BenchError, Operation, RecordId, TransportFaultKind};

/// Tracks requests in flight and the highest count seen
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Executor with a bounded connection pool and a per-request timeout
#[derive(Debug, Clone)]
pub struct PooledExecutor {
    service: Arc<InMemoryService>,
    connections: Arc<Semaphore>,
    connection_limit: usize,
    timeout: Duration,
    in_flight: Arc<InFlight>,
}

impl PooledExecutor {
    /// Create an executor allowing `connection_limit` concurrent requests
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when `connection_limit` or `timeout` is zero.
    pub fn new(
        service: Arc<InMemoryService>,
        connection_limit: usize,
        timeout: Duration,
    ) -> Result<Self, BenchError> {
        if connection_limit == 0 {
            return Err(BenchError::invalid_configuration(
                "connection limit must be at least 1",
            ));
        }
        if timeout.is_zero() {
            return Err(BenchError::invalid_configuration(
                "request timeout must be greater than zero",
            ));
        }
        Ok(Self {
            service,
            connections: Arc::new(Semaphore::new(connection_limit)),
            connection_limit,
            timeout,
            in_flight: Arc::new(InFlight::default()),
        })
    }

    /// Maximum number of concurrent requests
    pub fn connection_limit(&self) -> usize {
        self.connection_limit
    }

    /// The service requests are sent to
    pub fn service(&self) -> &Arc<InMemoryService> {
        &self.service
    }

    /// Run `request` on a pooled connection, bounded by the timeout
    async fn call<F, T>(&self, what: &str, request: F) -> Result<T, BenchError>
    where
        F: Future<Output = Result<T, BenchError>>,
    {
        pooled(&self.connections, &self.in_flight, self.timeout, what, request).await
    }
}

async fn pooled<F, T>(
    connections: &Semaphore,
    in_flight: &Arc<InFlight>,
    timeout: Duration,
    what: &str,
    request: F,
) -> Result<T, BenchError>
where
    F: Future<Output = Result<T, BenchError>>,
{
    let _permit = connections
        .acquire()
        .await
        .map_err(|e| BenchError::internal(format!("connection pool closed: {}", e)))?;
    let _guard = in_flight.enter();

    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(BenchError::transport(
            TransportFaultKind::Timeout,
            format!("{} did not complete within {:?}", what, timeout),
        )),
    }
}

#[async_trait]
impl BatchExecutor for PooledExecutor {
    async fn execute(
        &self,
        requests: BTreeMap<String, Batch>,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, BatchResult>, BenchError> {
        let mut tasks = FuturesUnordered::new();
        let mut abort_handles = Vec::with_capacity(requests.len());

        for (key, batch) in requests {
            let service = Arc::clone(&self.service);
            let connections = Arc::clone(&self.connections);
            let in_flight = Arc::clone(&self.in_flight);
            let timeout = self.timeout;

            let task = tokio::spawn(async move {
                let what = format!("request batch {}", key);
                let result = pooled(&connections, &in_flight, timeout, &what, async {
                    service.execute_batch(&batch).await
                })
                .await?;
                Ok::<_, BenchError>((key, result))
            });
            abort_handles.push(task.abort_handle());
            tasks.push(task);
        }
        debug!(batches = tasks.len(), "Spawned batch tasks");

        let abort_all = || abort_handles.iter().for_each(|handle| handle.abort());
        let mut results = BTreeMap::new();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    abort_all();
                    return Err(BenchError::cancelled());
                }
                next = tasks.next() => next,
            };
            match next {
                None => break,
                Some(Ok(Ok((key, result)))) => {
                    results.insert(key, result);
                }
                Some(Ok(Err(error))) => {
                    abort_all();
                    return Err(error);
                }
                Some(Err(join_error)) => {
                    abort_all();
                    return Err(BenchError::internal(format!(
                        "batch task failed: {}",
                        join_error
                    )));
                }
            }
        }

        Ok(results)
    }

    fn peak_concurrency(&self) -> Option<usize> {
        Some(self.in_flight.peak())
    }
}

#[async_trait]
impl SingleCallExecutor for PooledExecutor {
    async fn execute_one(
        &self,
        operation: Operation,
        cancel: &CancellationToken,
    ) -> Result<RecordId, BenchError> {
        let what = format!("request {}", operation.correlation_id);
        tokio::select! {
            _ = cancel.cancelled() => Err(BenchError::cancelled()),
            result = self.call(&what, self.service.execute_one(&operation)) => result,
        }
    }
}

#[async_trait]
impl RecordSource for PooledExecutor {
    async fn retrieve_page(
        &self,
        request: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page, BenchError> {
        let what = format!(
            "page {} of {} ({})",
            request.page_number, request.entity, request.correlation_id
        );
        tokio::select! {
            _ = cancel.cancelled() => Err(BenchError::cancelled()),
            result = self.call(&what, self.service.retrieve_page(&request)) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldValue, Record};
    use rstest::rstest;
    use uuid::Uuid;

    fn create_batches(service_latency_ms: u64, batches: usize, size: usize) -> (Arc<InMemoryService>, BTreeMap<String, Batch>) {
        let service = Arc::new(
            InMemoryService::with_default_catalog()
                .with_latency(Duration::from_millis(service_latency_ms)),
        );
        let requests = (0..batches)
            .map(|i| {
                let operations = (0..size)
                    .map(|_| {
                        Operation::create(
                            Record::new("account", Uuid::new_v4())
                                .with_field("name", FieldValue::Text("x".to_string())),
                            true,
                        )
                    })
                    .collect();
                (i.to_string(), Batch::new(operations))
            })
            .collect();
        (service, requests)
    }

    #[rstest]
    #[case::zero_connections(0, Duration::from_secs(1))]
    #[case::zero_timeout(4, Duration::ZERO)]
    fn test_rejects_invalid_settings(#[case] limit: usize, #[case] timeout: Duration) {
        let service = Arc::new(InMemoryService::with_default_catalog());
        let result = PooledExecutor::new(service, limit, timeout);
        assert!(matches!(result, Err(BenchError::InvalidConfiguration { .. })));
    }

    #[tokio::test]
    async fn test_every_batch_gets_a_result() {
        let (service, requests) = create_batches(0, 6, 10);
        let executor = PooledExecutor::new(service.clone(), 3, Duration::from_secs(5)).unwrap();

        let results = executor
            .execute(requests, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        assert!(results.values().all(|r| r.successes() == 10));
        assert_eq!(service.count("account"), 60);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_batches_bounded_by_connection_limit() {
        let (service, requests) = create_batches(20, 8, 2);
        let executor = PooledExecutor::new(service, 2, Duration::from_secs(5)).unwrap();

        executor
            .execute(requests, &CancellationToken::new())
            .await
            .unwrap();

        let peak = executor.peak_concurrency().unwrap();
        assert!(peak >= 1 && peak <= 2, "peak was {}", peak);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_batch_times_out() {
        let (service, requests) = create_batches(500, 2, 1);
        let executor = PooledExecutor::new(service, 2, Duration::from_millis(100)).unwrap();

        let result = executor.execute(requests, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(BenchError::TransportFault { kind: TransportFaultKind::Timeout, .. })
        ));
    }

    #[tokio::test]
    async fn test_unavailable_service_fails_whole_call() {
        let (service, requests) = create_batches(0, 3, 2);
        service.set_unavailable(true);
        let executor = PooledExecutor::new(service, 2, Duration::from_secs(1)).unwrap();

        let result = executor.execute(requests, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(BenchError::TransportFault { kind: TransportFaultKind::Connection, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_call() {
        let (service, requests) = create_batches(10_000, 2, 1);
        let executor = PooledExecutor::new(service, 2, Duration::from_secs(60)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = executor.execute(requests, &cancel).await;

        assert!(matches!(
            result,
            Err(BenchError::TransportFault { kind: TransportFaultKind::Cancelled, .. })
        ));
    }

    #[tokio::test]
    async fn test_single_call_returns_record_id() {
        let service = Arc::new(InMemoryService::with_default_catalog());
        let executor = PooledExecutor::new(service.clone(), 1, Duration::from_secs(1)).unwrap();
        let record = Record::new("contact", Uuid::new_v4());
        let id = record.id;

        let result = executor
            .execute_one(Operation::create(record, true), &CancellationToken::new())
            .await;

        assert_eq!(result, Ok(id));
        assert!(service.get(&id).is_some());
    }

    #[tokio::test]
    async fn test_retrieve_page_through_pool() {
        let service = Arc::new(InMemoryService::with_default_catalog());
        service.seed_synthetic("lead", 4).unwrap();
        let executor = PooledExecutor::new(service, 1, Duration::from_secs(1)).unwrap();

        let page = executor
            .retrieve_page(
                PageRequest {
                    correlation_id: Uuid::new_v4(),
                    entity: "lead".to_string(),
                    page_number: 1,
                    count: 10,
                    paging_cookie: None,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(page.records.len(), 4);
        assert!(!page.more_records);
    }
}
