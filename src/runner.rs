//! Benchmark orchestration
//!
//! The runner ties the pieces together for one run:
//!
//! 1. Resolve the entity against the catalog and the OOB / custom allow-lists.
//! 2. Seed the simulated service if asked to.
//! 3. Build the workload: synthetic records for Create, the paged working set
//!    for Update and Delete. Retrieve is the paged fetch itself.
//! 4. Dispatch through the selected strategy.
//!
//! # Entity allow-lists
//!
//! - OOB list non-empty: exactly the listed entities are offered.
//! - OOB list empty: every entity in the catalog is offered.
//! - Custom list non-empty: exactly the listed entities are offered.
//! - Custom list empty: every custom entity is offered.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::OperationType;
use crate::config::BenchConfig;
use crate::core::{
    CreateWorkload, DeleteWorkload, DispatchEngine, DispatchReport, PagedRetriever, RecordFactory,
    RecordMutator, Reporter, RetryPolicy, UpdateWorkload, Workload,
};
use crate::io::read_seed_file;
use crate::service::{InMemoryService, PooledExecutor};
use crate::strategy::create_strategy;
use crate::types::{BatchResult, BenchError, EntityMetadata, RecordId, RecordSet};

/// What a run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub operation: OperationType,
    pub entity: String,

    /// Ids of every record the run targeted (or fetched, for Retrieve)
    pub ids: Vec<RecordId>,

    /// Timings of the measured phase
    pub report: DispatchReport,

    /// Fields rewritten by an Update run
    pub touched_fields: BTreeSet<String>,

    /// Raw batch results (empty for Single and Retrieve)
    pub results: Vec<BatchResult>,
}

/// Runs one configured benchmark against the simulated service
pub struct BenchmarkRunner {
    config: BenchConfig,
    service: Arc<InMemoryService>,
    engine: DispatchEngine,
    retriever: PagedRetriever,
}

impl BenchmarkRunner {
    /// Create a runner with a fresh simulated service built from the config
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for settings the executor rejects.
    pub fn new(config: BenchConfig, reporter: Arc<dyn Reporter>) -> Result<Self, BenchError> {
        let service = InMemoryService::with_default_catalog()
            .with_latency(config.service.latency)
            .with_fail_every(config.service.fail_every);
        Self::with_service(config, Arc::new(service), reporter)
    }

    /// Create a runner over an existing service
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for settings the executor rejects.
    pub fn with_service(
        config: BenchConfig,
        service: Arc<InMemoryService>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, BenchError> {
        config.validate()?;
        let executor = Arc::new(PooledExecutor::new(
            Arc::clone(&service),
            config.connection_limit,
            config.request_timeout,
        )?);
        let engine = DispatchEngine::new(executor.clone(), executor.clone(), reporter.clone())
            .with_retry(RetryPolicy::new(config.transport_retries, config.retry_backoff));
        let retriever = PagedRetriever::new(executor, reporter, config.page_size)?;

        Ok(Self {
            config,
            service,
            engine,
            retriever,
        })
    }

    /// Settings of this runner
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// The simulated service requests go to
    pub fn service(&self) -> &Arc<InMemoryService> {
        &self.service
    }

    /// Entities offered for the given kind, honouring the allow-lists
    pub fn candidate_entities(&self, oob: bool) -> Vec<EntityMetadata> {
        let allow_list = if oob {
            &self.config.oob_entities
        } else {
            &self.config.custom_entities
        };

        self.service
            .entities()
            .filter(|metadata| {
                if allow_list.is_empty() {
                    oob || metadata.is_custom
                } else {
                    allow_list.contains(&metadata.logical_name)
                }
            })
            .cloned()
            .collect()
    }

    /// Look up an entity offered under either kind
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the entity is unknown or filtered out.
    pub fn resolve_entity(&self, name: &str) -> Result<EntityMetadata, BenchError> {
        self.candidate_entities(true)
            .into_iter()
            .chain(self.candidate_entities(false))
            .find(|metadata| metadata.logical_name == name)
            .ok_or_else(|| BenchError::not_found(format!("Entity {} is not available", name)))
    }

    /// Seed the service with the configured synthetic and file records
    ///
    /// # Errors
    ///
    /// Returns file errors from reading the seed file.
    pub fn seed(&self, entity: &EntityMetadata) -> Result<usize, BenchError> {
        let mut seeded = 0;
        if self.config.service.seed_records > 0 {
            seeded += self
                .service
                .seed_synthetic(&entity.logical_name, self.config.service.seed_records)?
                .len();
        }
        if let Some(path) = &self.config.service.seed_file {
            seeded += self.service.seed(read_seed_file(path, entity)?)?;
        }
        if seeded > 0 {
            info!("Seeded {} {} record(s)", seeded, entity.logical_name);
        }
        Ok(seeded)
    }

    /// Run the configured operation against `entity`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when Update or Delete find no records, and any fatal
    /// dispatch error.
    pub async fn run(
        &self,
        entity: &EntityMetadata,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, BenchError> {
        info!("Selected operation: {}", self.config.operation);
        info!("Selected entity: {}", entity.logical_name);

        match self.config.operation {
            OperationType::Create => {
                let count = self.config.create_count();
                let mut workload = CreateWorkload::new(
                    RecordFactory::new(entity.clone()),
                    count,
                    !self.config.enforce_duplicate_detection,
                );
                self.dispatch(entity, &mut workload, cancel).await
            }
            OperationType::Retrieve => {
                let (records, report) = self
                    .retriever
                    .retrieve_all(&entity.logical_name, cancel)
                    .await?;
                Ok(RunOutcome {
                    operation: OperationType::Retrieve,
                    entity: entity.logical_name.clone(),
                    ids: records.ids(),
                    report,
                    touched_fields: BTreeSet::new(),
                    results: Vec::new(),
                })
            }
            OperationType::Update => {
                let records = self.working_set(entity, cancel).await?;
                let mutator = RecordMutator::new(self.config.update_fields.iter().cloned());
                let mut workload = UpdateWorkload::new(records, mutator);
                self.dispatch(entity, &mut workload, cancel).await
            }
            OperationType::Delete => {
                let records = self.working_set(entity, cancel).await?;
                let mut workload = DeleteWorkload::new(records);
                self.dispatch(entity, &mut workload, cancel).await
            }
        }
    }

    async fn working_set(
        &self,
        entity: &EntityMetadata,
        cancel: &CancellationToken,
    ) -> Result<RecordSet, BenchError> {
        let (records, report) = self
            .retriever
            .retrieve_all(&entity.logical_name, cancel)
            .await?;
        if records.is_empty() {
            return Err(BenchError::not_found(format!(
                "No records found for {}. Please create a record and retry this process.",
                entity.logical_name
            )));
        }
        info!(
            "Fetched {} {} record(s) in {:.3}s",
            records.len(),
            entity.logical_name,
            report.total_elapsed.as_secs_f64()
        );
        Ok(records)
    }

    async fn dispatch(
        &self,
        entity: &EntityMetadata,
        workload: &mut dyn Workload,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, BenchError> {
        let strategy = create_strategy(self.config.strategy, self.config.batch_size)?;
        info!("Dispatching with the {} strategy", strategy.name());

        let outcome = strategy.dispatch(&self.engine, workload, cancel).await?;
        Ok(RunOutcome {
            operation: self.config.operation,
            entity: entity.logical_name.clone(),
            ids: outcome.ids,
            report: outcome.report,
            touched_fields: workload.touched_fields().cloned().unwrap_or_default(),
            results: outcome.results,
        })
    }
}
