//! Validated benchmark settings
//!
//! `BenchConfig` is built from the command line (see
//! [`CliArgs::to_bench_config`](crate::cli::CliArgs::to_bench_config)) and
//! validated once, before anything is sent to the service.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::cli::{OperationType, StrategyType};
use crate::core::DEFAULT_PAGE_SIZE;
use crate::types::BenchError;

/// Largest batch the service accepts in one request
pub const MAX_BATCH_SIZE: usize = 1000;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings of the simulated service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceConfig {
    /// Synthetic records of the selected entity seeded before the run
    pub seed_records: usize,

    /// CSV file of records seeded before the run
    pub seed_file: Option<PathBuf>,

    /// Latency added to every request
    pub latency: Duration,

    /// Fault every Nth operation (0 disables)
    pub fail_every: usize,
}

/// Complete settings of one benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub operation: OperationType,
    pub strategy: StrategyType,

    /// Entity to work with; chosen interactively when absent
    pub entity: Option<String>,

    /// Operations per batch request
    pub batch_size: usize,

    /// Batches to create when `record_count` is absent
    pub total_batches: usize,

    /// Exact number of records to create
    pub record_count: Option<usize>,

    /// Concurrent service connections (also the runtime's worker threads)
    pub connection_limit: usize,

    pub request_timeout: Duration,

    /// Records per page when fetching the working set
    pub page_size: usize,

    pub transport_retries: u32,
    pub retry_backoff: Duration,

    /// Fields Update runs add to every record
    pub update_fields: Vec<String>,

    /// OOB entities offered in the menu (empty offers every entity)
    pub oob_entities: Vec<String>,

    /// Custom entities offered in the menu (empty offers every custom entity)
    pub custom_entities: Vec<String>,

    pub enforce_duplicate_detection: bool,

    pub service: ServiceConfig,
}

impl BenchConfig {
    /// Default settings for the given operation and strategy
    pub fn new(operation: OperationType, strategy: StrategyType) -> Self {
        Self {
            operation,
            strategy,
            entity: None,
            batch_size: MAX_BATCH_SIZE,
            total_batches: 1,
            record_count: None,
            connection_limit: num_cpus::get(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            transport_retries: 0,
            retry_backoff: Duration::from_millis(500),
            update_fields: Vec::new(),
            oob_entities: Vec::new(),
            custom_entities: Vec::new(),
            enforce_duplicate_detection: false,
            service: ServiceConfig::default(),
        }
    }

    /// Number of records a Create run synthesizes
    pub fn create_count(&self) -> usize {
        self.record_count
            .unwrap_or_else(|| self.total_batches.saturating_mul(self.batch_size))
    }

    /// Check every value is in range
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` naming the first offending setting.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(BenchError::invalid_configuration(format!(
                "batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        if self.total_batches == 0 {
            return Err(BenchError::invalid_configuration(
                "total batches must be at least 1",
            ));
        }
        if self.record_count == Some(0) {
            return Err(BenchError::invalid_configuration(
                "record count must be at least 1",
            ));
        }
        if self.connection_limit == 0 {
            return Err(BenchError::invalid_configuration(
                "connection limit must be at least 1",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(BenchError::invalid_configuration(
                "request timeout must be greater than zero",
            ));
        }
        if self.page_size == 0 {
            return Err(BenchError::invalid_configuration(
                "page size must be at least 1",
            ));
        }
        if self.entity.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(BenchError::invalid_configuration("entity name is empty"));
        }
        Ok(())
    }

    /// Log every setting at start-up
    pub fn log_settings(&self) {
        info!("Settings:");
        info!("  Operation: {}", self.operation);
        info!("  Strategy: {}", self.strategy);
        info!("  Entity: {}", self.entity.as_deref().unwrap_or("<choose>"));
        info!("  Batch size: {}", self.batch_size);
        match self.record_count {
            Some(count) => info!("  Records to create: {}", count),
            None => info!("  Total batches: {}", self.total_batches),
        }
        info!("  Connection limit: {}", self.connection_limit);
        info!("  Request timeout: {}s", self.request_timeout.as_secs());
        info!("  Page size: {}", self.page_size);
        info!(
            "  Transport retries: {} (initial backoff {}ms)",
            self.transport_retries,
            self.retry_backoff.as_millis()
        );
        info!("  Update fields: {}", join_or_none(&self.update_fields));
        info!("  OOB entities: {}", join_or_none(&self.oob_entities));
        info!("  Custom entities: {}", join_or_none(&self.custom_entities));
        info!(
            "  Duplicate detection: {}",
            if self.enforce_duplicate_detection { "enforced" } else { "suppressed" }
        );
        info!(
            "  Simulated service: {} seed record(s), {}ms latency, fault every {}",
            self.service.seed_records,
            self.service.latency.as_millis(),
            self.service.fail_every
        );
    }
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "<none>".to_string()
    } else {
        values.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config() -> BenchConfig {
        BenchConfig::new(OperationType::Create, StrategyType::ParallelExecuteMultiple)
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.total_batches, 1);
        assert_eq!(config.page_size, 5000);
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[rstest]
    #[case::from_batches(None, 4, 250, 1000)]
    #[case::explicit_count(Some(3500), 1, 1000, 3500)]
    fn test_create_count(
        #[case] record_count: Option<usize>,
        #[case] total_batches: usize,
        #[case] batch_size: usize,
        #[case] expected: usize,
    ) {
        let config = BenchConfig {
            record_count,
            total_batches,
            batch_size,
            ..config()
        };
        assert_eq!(config.create_count(), expected);
    }

    #[test]
    fn test_blank_entity_is_invalid() {
        let config = BenchConfig {
            entity: Some("  ".to_string()),
            ..config()
        };
        assert!(matches!(
            config.validate(),
            Err(BenchError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_oversized_batch_message_names_limit() {
        let config = BenchConfig {
            batch_size: 5000,
            ..config()
        };
        let error = config.validate().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid configuration: batch size must be between 1 and 1000, got 5000"
        );
    }
}
