use crate::config::{BenchConfig, ServiceConfig};
use crate::types::BenchError;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Benchmark bulk Create / Retrieve / Update / Delete against an entity service
#[derive(Parser, Debug, Clone)]
#[command(name = "crud-perf-bench")]
#[command(
    about = "Compare single, batched and parallel batched CRUD dispatch",
    long_about = None
)]
pub struct CliArgs {
    /// Operation to benchmark (asked for interactively when omitted)
    #[arg(long = "operation", value_name = "OPERATION")]
    pub operation: Option<OperationType>,

    /// Dispatch strategy (asked for interactively when omitted)
    #[arg(long = "strategy", value_name = "STRATEGY")]
    pub strategy: Option<StrategyType>,

    /// Logical name of the entity to work with (chosen from a menu when omitted)
    #[arg(long = "entity", value_name = "NAME")]
    pub entity: Option<String>,

    /// Number of operations per batch request
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch request (default: 1000, range: 1-1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of batches to create when --records is not given
    #[arg(
        long = "total-batches",
        value_name = "COUNT",
        help = "Number of batches to create when --records is not given (default: 1)"
    )]
    pub total_batches: Option<usize>,

    /// Exact number of records to create
    #[arg(long = "records", value_name = "COUNT")]
    pub record_count: Option<usize>,

    /// Maximum number of concurrent service connections
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of concurrent service connections (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(
        long = "timeout-secs",
        value_name = "SECONDS",
        help = "Per-request timeout in seconds (default: 120)"
    )]
    pub timeout_secs: Option<u64>,

    /// Extra fields written by Update runs, comma separated
    #[arg(long = "update-fields", value_name = "FIELDS", value_delimiter = ',')]
    pub update_fields: Vec<String>,

    /// Allow-list of OOB entities offered in the menu, comma separated
    #[arg(long = "oob-entities", value_name = "NAMES", value_delimiter = ',')]
    pub oob_entities: Vec<String>,

    /// Allow-list of custom entities offered in the menu, comma separated
    #[arg(long = "custom-entities", value_name = "NAMES", value_delimiter = ',')]
    pub custom_entities: Vec<String>,

    /// Let the service run duplicate detection on created records
    #[arg(long = "enforce-duplicate-detection")]
    pub enforce_duplicate_detection: bool,

    /// Records per page when fetching the working set
    #[arg(
        long = "page-size",
        value_name = "SIZE",
        help = "Records per page when fetching the working set (default: 5000)"
    )]
    pub page_size: Option<usize>,

    /// Retries for timed out or refused requests
    #[arg(long = "transport-retries", value_name = "COUNT", default_value_t = 0)]
    pub transport_retries: u32,

    /// Delay before the first transport retry, in milliseconds
    #[arg(long = "retry-backoff-ms", value_name = "MILLIS", default_value_t = 500)]
    pub retry_backoff_ms: u64,

    /// Synthetic records seeded into the simulated service before the run
    #[arg(long = "seed-records", value_name = "COUNT", default_value_t = 0)]
    pub seed_records: usize,

    /// CSV file with records seeded into the simulated service before the run
    #[arg(long = "seed-file", value_name = "PATH")]
    pub seed_file: Option<PathBuf>,

    /// Simulated service latency per request, in milliseconds
    #[arg(long = "latency-ms", value_name = "MILLIS", default_value_t = 0)]
    pub latency_ms: u64,

    /// Make the simulated service fault every Nth operation (0 disables)
    #[arg(long = "fail-every", value_name = "N", default_value_t = 0)]
    pub fail_every: usize,

    /// Write per-request timings to this CSV file
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Never prompt; missing choices are an error
    #[arg(long = "no-prompt")]
    pub no_prompt: bool,

    /// Wait for <Enter> before exiting
    #[arg(long = "pause-on-exit")]
    pub pause_on_exit: bool,
}

/// Workloads the harness can run
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OperationType {
    Create,
    Retrieve,
    Update,
    Delete,
}

impl OperationType {
    /// Every operation, in menu order
    pub const ALL: [OperationType; 4] = [
        OperationType::Create,
        OperationType::Retrieve,
        OperationType::Update,
        OperationType::Delete,
    ];
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Create => "Create",
            OperationType::Retrieve => "Retrieve",
            OperationType::Update => "Update",
            OperationType::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// Available dispatch strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Single,
    ExecuteMultiple,
    ParallelExecuteMultiple,
}

impl StrategyType {
    /// Every strategy, in menu order
    pub const ALL: [StrategyType; 3] = [
        StrategyType::Single,
        StrategyType::ExecuteMultiple,
        StrategyType::ParallelExecuteMultiple,
    ];
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyType::Single => "Execute Single",
            StrategyType::ExecuteMultiple => "Execute Multiple",
            StrategyType::ParallelExecuteMultiple => "Parallel Execute Multiple",
        };
        f.write_str(name)
    }
}

impl CliArgs {
    /// Create a BenchConfig from CLI arguments
    ///
    /// Omitted values fall back to the defaults of [`BenchConfig`]. The
    /// operation and strategy must have been chosen by now, either on the
    /// command line or through the prompt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a missing choice or any value the
    /// config validation rejects.
    pub fn to_bench_config(&self) -> Result<BenchConfig, BenchError> {
        let operation = self
            .operation
            .ok_or_else(|| BenchError::invalid_configuration("no operation selected"))?;
        let strategy = self
            .strategy
            .ok_or_else(|| BenchError::invalid_configuration("no strategy selected"))?;

        let default = BenchConfig::new(operation, strategy);
        let config = BenchConfig {
            entity: self.entity.clone(),
            batch_size: self.batch_size.unwrap_or(default.batch_size),
            total_batches: self.total_batches.unwrap_or(default.total_batches),
            record_count: self.record_count,
            connection_limit: self.max_concurrent.unwrap_or(default.connection_limit),
            request_timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(default.request_timeout),
            page_size: self.page_size.unwrap_or(default.page_size),
            transport_retries: self.transport_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            update_fields: self.update_fields.clone(),
            oob_entities: self.oob_entities.clone(),
            custom_entities: self.custom_entities.clone(),
            enforce_duplicate_detection: self.enforce_duplicate_detection,
            service: ServiceConfig {
                seed_records: self.seed_records,
                seed_file: self.seed_file.clone(),
                latency: Duration::from_millis(self.latency_ms),
                fail_every: self.fail_every,
            },
            ..default
        };

        config.validate()?;
        Ok(config)
    }
}
