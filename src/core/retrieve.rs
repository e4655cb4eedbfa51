//! Paged retrieval of an entity's records
//!
//! Pages are requested one at a time, each carrying the paging cookie of the
//! previous page, until the source reports no more records. Every page gets
//! its own correlation id and timing sample.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::reporter::Reporter;
use super::stats::{DispatchMode, DispatchReport, StatsCollector};
use super::traits::{PageRequest, RecordSource};
use crate::types::{BenchError, RecordSet};

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// Drives a [`RecordSource`] page by page
#[derive(Clone)]
pub struct PagedRetriever {
    source: Arc<dyn RecordSource>,
    reporter: Arc<dyn Reporter>,
    page_size: usize,
}

impl PagedRetriever {
    /// Create a retriever requesting `page_size` records per page
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when `page_size` is zero.
    pub fn new(
        source: Arc<dyn RecordSource>,
        reporter: Arc<dyn Reporter>,
        page_size: usize,
    ) -> Result<Self, BenchError> {
        if page_size == 0 {
            return Err(BenchError::invalid_configuration(
                "page size must be at least 1",
            ));
        }
        Ok(Self {
            source,
            reporter,
            page_size,
        })
    }

    /// Records requested per page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch every record of `entity`
    ///
    /// The report's total is the sum of the page timings. An entity without
    /// records yields an empty set, not an error.
    pub async fn retrieve_all(
        &self,
        entity: &str,
        cancel: &CancellationToken,
    ) -> Result<(RecordSet, DispatchReport), BenchError> {
        let stats = StatsCollector::new(DispatchMode::PagedRetrieve);
        self.reporter
            .dispatch_started(DispatchMode::PagedRetrieve, "retrieve", 0);

        let mut records = RecordSet::new();
        let mut paging_cookie = None;
        let mut page_number = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(BenchError::cancelled());
            }
            let correlation_id = Uuid::new_v4();
            let request = PageRequest {
                correlation_id,
                entity: entity.to_string(),
                page_number,
                count: self.page_size,
                paging_cookie: paging_cookie.take(),
            };

            let started = Instant::now();
            let page = self.source.retrieve_page(request, cancel).await?;
            let elapsed = started.elapsed();

            let fetched = page.records.len();
            stats.add_operations(fetched);
            stats.add_successes(fetched);
            stats.record(format!("page {}", page_number), correlation_id, fetched, elapsed);
            self.reporter
                .page_retrieved(page_number, correlation_id, fetched, elapsed);
            records.extend(page.records);

            if !page.more_records {
                break;
            }
            if fetched == 0 {
                return Err(BenchError::internal(format!(
                    "source announced more records after empty page {}",
                    page_number
                )));
            }
            paging_cookie = page.paging_cookie;
            page_number += 1;
        }

        let report = stats.summarize();
        self.reporter.dispatch_finished(&report);
        Ok((records, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reporter::recording::{Event, RecordingReporter};
    use crate::core::traits::Page;
    use crate::types::{Record, TransportFaultKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Source serving a fixed list of records, remembering each request
    struct FixedSource {
        records: Vec<Record>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl FixedSource {
        fn with_records(n: usize) -> Self {
            Self {
                records: (0..n)
                    .map(|_| Record::new("account", Uuid::new_v4()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RecordSource for FixedSource {
        async fn retrieve_page(
            &self,
            request: PageRequest,
            _cancel: &CancellationToken,
        ) -> Result<Page, BenchError> {
            let start = match &request.paging_cookie {
                Some(cookie) => cookie
                    .parse::<usize>()
                    .map_err(|e| BenchError::internal(e.to_string()))?,
                None => 0,
            };
            self.requests.lock().push(request.clone());

            let end = (start + request.count).min(self.records.len());
            let more_records = end < self.records.len();
            Ok(Page {
                records: self.records[start..end].to_vec(),
                more_records,
                paging_cookie: more_records.then(|| end.to_string()),
            })
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl RecordSource for BrokenSource {
        async fn retrieve_page(
            &self,
            _request: PageRequest,
            _cancel: &CancellationToken,
        ) -> Result<Page, BenchError> {
            Err(BenchError::transport(TransportFaultKind::SecurityNegotiation, "denied"))
        }
    }

    #[tokio::test]
    async fn test_retrieves_every_page_with_cookies() {
        let source = Arc::new(FixedSource::with_records(12));
        let reporter = Arc::new(RecordingReporter::default());
        let retriever = PagedRetriever::new(source.clone(), reporter.clone(), 5).unwrap();

        let (records, report) = retriever
            .retrieve_all("account", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(records.ids(), source.records.iter().map(|r| r.id).collect::<Vec<_>>());
        assert_eq!(report.total_operations, 12);
        assert_eq!(report.samples.len(), 3);
        assert_eq!(report.mode, DispatchMode::PagedRetrieve);

        let requests = source.requests.lock().clone();
        let cookies: Vec<_> = requests.iter().map(|r| r.paging_cookie.clone()).collect();
        assert_eq!(cookies, vec![None, Some("5".to_string()), Some("10".to_string())]);
        let pages: Vec<_> = requests.iter().map(|r| r.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3]);

        // Each sample carries the id its request was sent with
        let sent: Vec<_> = requests.iter().map(|r| r.correlation_id).collect();
        let sampled: Vec<_> = report.samples.iter().map(|s| s.correlation_id).collect();
        assert_eq!(sent, sampled);

        let page_events: Vec<_> = reporter
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Page(..)))
            .collect();
        assert_eq!(page_events, vec![Event::Page(1, 5), Event::Page(2, 5), Event::Page(3, 2)]);
    }

    #[tokio::test]
    async fn test_empty_entity_yields_empty_set() {
        let source = Arc::new(FixedSource::with_records(0));
        let retriever =
            PagedRetriever::new(source, Arc::new(RecordingReporter::default()), 10).unwrap();

        let (records, report) = retriever
            .retrieve_all("account", &CancellationToken::new())
            .await
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(report.samples.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_fault_propagates() {
        let retriever = PagedRetriever::new(
            Arc::new(BrokenSource),
            Arc::new(RecordingReporter::default()),
            DEFAULT_PAGE_SIZE,
        )
        .unwrap();

        let result = retriever
            .retrieve_all("account", &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(BenchError::TransportFault { kind: TransportFaultKind::SecurityNegotiation, .. })
        ));
    }

    #[test]
    fn test_zero_page_size_is_invalid() {
        let result = PagedRetriever::new(
            Arc::new(BrokenSource),
            Arc::new(RecordingReporter::default()),
            0,
        );
        assert!(matches!(result, Err(BenchError::InvalidConfiguration { .. })));
    }
}
