//! In-memory stand-in for the remote entity service
//!
//! `InMemoryService` keeps records in a `DashMap` keyed by record id and
//! answers batch, single and paged requests the way the real service does:
//!
//! - Create with an existing id fails with `DUPLICATE_KEY`.
//! - Create without duplicate-detection suppression fails with
//!   `DUPLICATE_DETECTED` when another record of the entity has the same
//!   primary name.
//! - Update and Delete of a missing record fail with `RECORD_NOT_FOUND`.
//! - Fields outside the entity's attribute schema are silently dropped.
//!
//! Latency and failures can be injected so the dispatch strategies have
//! something to measure.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::{Page, PageRequest, RecordFactory};
use crate::types::{
    fault_code, Batch, BatchResult, BenchError, EntityMetadata, EntityReference, FieldValue,
    Operation, OperationKind, OperationOutcome, OperationResponse, Record, RecordId, RemoteFault,
    TransportFaultKind,
};

/// Simulated entity service
#[derive(Debug)]
pub struct InMemoryService {
    catalog: BTreeMap<String, EntityMetadata>,
    records: DashMap<RecordId, Record>,
    names: DashSet<(String, String)>,
    latency: Duration,
    fail_every: usize,
    attempts: AtomicUsize,
    poisoned: DashSet<RecordId>,
    unavailable: AtomicBool,
}

impl InMemoryService {
    /// Create an empty service knowing the given entities
    pub fn new(catalog: impl IntoIterator<Item = EntityMetadata>) -> Self {
        Self {
            catalog: catalog
                .into_iter()
                .map(|metadata| (metadata.logical_name.clone(), metadata))
                .collect(),
            records: DashMap::new(),
            names: DashSet::new(),
            latency: Duration::ZERO,
            fail_every: 0,
            attempts: AtomicUsize::new(0),
            poisoned: DashSet::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Create an empty service with a small catalog of OOB and custom entities
    pub fn with_default_catalog() -> Self {
        Self::new(default_catalog())
    }

    /// Delay every request by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fault every `n`th operation the service attempts (0 disables)
    pub fn with_fail_every(mut self, n: usize) -> Self {
        self.fail_every = n;
        self
    }

    /// Fault any operation targeting `id`
    pub fn poison(&self, id: RecordId) {
        self.poisoned.insert(id);
    }

    /// Refuse every request with a connection fault while `unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Metadata of every known entity, ordered by logical name
    pub fn entities(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.catalog.values()
    }

    /// Metadata of one entity
    pub fn metadata(&self, entity: &str) -> Option<&EntityMetadata> {
        self.catalog.get(entity)
    }

    /// Number of stored records of `entity`
    pub fn count(&self, entity: &str) -> usize {
        self.records
            .iter()
            .filter(|record| record.entity == entity)
            .count()
    }

    /// Snapshot of one stored record
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.records.get(id).map(|record| record.clone())
    }

    /// Insert records directly, bypassing faults and latency
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a record of an unknown entity.
    pub fn seed(&self, records: impl IntoIterator<Item = Record>) -> Result<usize, BenchError> {
        let mut seeded = 0;
        for record in records {
            let metadata = self.metadata(&record.entity).ok_or_else(|| {
                BenchError::not_found(format!("Unknown entity {}", record.entity))
            })?;
            let record = retain_schema(record, metadata);
            if let Some(name) = primary_name(&record, metadata) {
                self.names.insert((record.entity.clone(), name));
            }
            self.records.insert(record.id, record);
            seeded += 1;
        }
        Ok(seeded)
    }

    /// Seed `count` synthetic records of `entity`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the entity is unknown.
    pub fn seed_synthetic(&self, entity: &str, count: usize) -> Result<Vec<RecordId>, BenchError> {
        let metadata = self
            .metadata(entity)
            .ok_or_else(|| BenchError::not_found(format!("Unknown entity {}", entity)))?;
        let factory = RecordFactory::new(metadata.clone());
        let records: Vec<Record> = (0..count)
            .map(|_| with_sample_values(factory.create()))
            .collect();
        let ids = records.iter().map(|record| record.id).collect();
        self.seed(records)?;
        Ok(ids)
    }

    /// Execute one batch, honouring its settings
    ///
    /// # Errors
    ///
    /// Fails as a whole only with a transport fault.
    pub async fn execute_batch(&self, batch: &Batch) -> Result<BatchResult, BenchError> {
        let started = Instant::now();
        self.round_trip().await?;

        let mut responses = Vec::with_capacity(batch.len());
        for (index, operation) in batch.operations.iter().enumerate() {
            let outcome = match self.apply(operation) {
                Ok(id) => OperationOutcome::Success { id },
                Err(fault) => OperationOutcome::Fault(fault),
            };
            let faulted = !outcome.is_success();
            if faulted || batch.settings.return_responses {
                responses.push(OperationResponse {
                    index,
                    correlation_id: operation.correlation_id,
                    outcome,
                });
            }
            if faulted && !batch.settings.continue_on_error {
                break;
            }
        }

        Ok(BatchResult {
            correlation_id: batch.correlation_id,
            responses,
            elapsed: started.elapsed(),
        })
    }

    /// Execute one operation as its own request
    ///
    /// # Errors
    ///
    /// Service faults come back as `BenchError::RemoteFault`.
    pub async fn execute_one(&self, operation: &Operation) -> Result<RecordId, BenchError> {
        self.round_trip().await?;
        Ok(self.apply(operation)?)
    }

    /// Serve one page of `request.entity`, ordered by record id
    ///
    /// The paging cookie is the id of the last record of the previous page.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown entity and `InvalidConfiguration` for
    /// a malformed cookie.
    pub async fn retrieve_page(&self, request: &PageRequest) -> Result<Page, BenchError> {
        self.round_trip().await?;
        if self.metadata(&request.entity).is_none() {
            return Err(BenchError::not_found(format!(
                "Unknown entity {}",
                request.entity
            )));
        }
        let after = request
            .paging_cookie
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| {
                BenchError::invalid_configuration(format!("malformed paging cookie: {}", e))
            })?;

        let mut matching: Vec<Record> = self
            .records
            .iter()
            .filter(|record| record.entity == request.entity)
            .filter(|record| after.map_or(true, |after| record.id > after))
            .map(|record| record.clone())
            .collect();
        matching.sort_by_key(|record| record.id);

        let more_records = matching.len() > request.count;
        matching.truncate(request.count);
        let paging_cookie = matching.last().map(|record| record.id.to_string());

        Ok(Page {
            records: matching,
            more_records,
            paging_cookie,
        })
    }

    async fn round_trip(&self) -> Result<(), BenchError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BenchError::transport(
                TransportFaultKind::Connection,
                "service unavailable",
            ));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }

    fn apply(&self, operation: &Operation) -> Result<RecordId, RemoteFault> {
        self.inject_fault(operation)?;
        match &operation.kind {
            OperationKind::Create(record) => {
                self.create(record, operation.suppress_duplicate_detection)
            }
            OperationKind::Update { record, .. } => self.update(record),
            OperationKind::Delete(reference) => self.delete(reference),
        }
    }

    fn inject_fault(&self, operation: &Operation) -> Result<(), RemoteFault> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let target = operation.target_id();
        if self.poisoned.contains(&target) {
            return Err(RemoteFault::new(
                fault_code::INJECTED,
                format!("injected fault for record {}", target),
            ));
        }
        if self.fail_every > 0 && attempt % self.fail_every == 0 {
            return Err(RemoteFault::new(
                fault_code::INJECTED,
                format!("injected fault on attempt {}", attempt),
            ));
        }
        Ok(())
    }

    fn create(&self, record: &Record, suppress_duplicate_detection: bool) -> Result<RecordId, RemoteFault> {
        let metadata = self.known(&record.entity)?;
        let record = retain_schema(record.clone(), metadata);
        let name_key = primary_name(&record, metadata).map(|name| (record.entity.clone(), name));

        // Claiming the name is the duplicate check
        let claimed = name_key
            .as_ref()
            .is_some_and(|key| self.names.insert(key.clone()));
        if let Some((entity, name)) = &name_key {
            if !claimed && !suppress_duplicate_detection {
                return Err(RemoteFault::new(
                    fault_code::DUPLICATE_DETECTED,
                    format!("a {} named '{}' already exists", entity, name),
                ));
            }
        }

        let id = record.id;
        match self.records.entry(id) {
            Entry::Occupied(_) => {
                if let (true, Some(key)) = (claimed, &name_key) {
                    self.names.remove(key);
                }
                Err(RemoteFault::new(
                    fault_code::DUPLICATE_KEY,
                    format!("a record with id {} already exists", id),
                ))
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(id)
            }
        }
    }

    fn update(&self, changes: &Record) -> Result<RecordId, RemoteFault> {
        let metadata = self.known(&changes.entity)?;
        let changes = retain_schema(changes.clone(), metadata);

        let mut stored = self
            .records
            .get_mut(&changes.id)
            .filter(|stored| stored.entity == changes.entity)
            .ok_or_else(|| not_found(&changes.entity, changes.id))?;

        let old_name = primary_name(&stored, metadata);
        for (field, value) in changes.fields {
            if field != metadata.primary_id_attribute {
                stored.set(field, value);
            }
        }
        let new_name = primary_name(&stored, metadata);
        drop(stored);

        if old_name != new_name {
            if let Some(old) = old_name {
                self.names.remove(&(changes.entity.clone(), old));
            }
            if let Some(new) = new_name {
                self.names.insert((changes.entity.clone(), new));
            }
        }
        Ok(changes.id)
    }

    fn delete(&self, reference: &EntityReference) -> Result<RecordId, RemoteFault> {
        let metadata = self.known(&reference.entity)?;
        let (id, removed) = self
            .records
            .remove_if(&reference.id, |_, stored| stored.entity == reference.entity)
            .ok_or_else(|| not_found(&reference.entity, reference.id))?;

        if let Some(name) = primary_name(&removed, metadata) {
            self.names.remove(&(removed.entity, name));
        }
        Ok(id)
    }

    fn known(&self, entity: &str) -> Result<&EntityMetadata, RemoteFault> {
        self.metadata(entity).ok_or_else(|| {
            RemoteFault::new(
                fault_code::UNKNOWN_ENTITY,
                format!("entity {} is not part of the catalog", entity),
            )
        })
    }
}

fn not_found(entity: &str, id: RecordId) -> RemoteFault {
    RemoteFault::new(
        fault_code::RECORD_NOT_FOUND,
        format!("{} with id {} does not exist", entity, id),
    )
}

fn retain_schema(mut record: Record, metadata: &EntityMetadata) -> Record {
    record.fields.retain(|field, _| metadata.has_attribute(field));
    record
}

fn primary_name(record: &Record, metadata: &EntityMetadata) -> Option<String> {
    record
        .get(&metadata.primary_name_attribute)
        .and_then(FieldValue::as_text)
        .map(str::to_string)
}

/// Catalog used by the binary when no real service is configured
pub fn default_catalog() -> Vec<EntityMetadata> {
    vec![
        EntityMetadata::new("account", "accountid", "name").with_attributes([
            "description",
            "telephone1",
            "numberofemployees",
            "revenue",
        ]),
        EntityMetadata::new("contact", "contactid", "fullname").with_attributes([
            "description",
            "emailaddress1",
            "jobtitle",
        ]),
        EntityMetadata::new("lead", "leadid", "subject")
            .with_attributes(["description", "companyname"]),
        EntityMetadata::new("new_project", "new_projectid", "new_name")
            .custom()
            .with_attributes(["new_description", "new_budget"]),
        EntityMetadata::new("new_timesheet", "new_timesheetid", "new_name")
            .custom()
            .with_attributes(["new_hours", "new_approved"]),
    ]
}

fn with_sample_values(record: Record) -> Record {
    match record.entity.as_str() {
        "account" => record
            .with_field("numberofemployees", FieldValue::Integer(25))
            .with_field("revenue", FieldValue::Money(Decimal::new(1_250_000, 2))),
        "new_project" => record.with_field("new_budget", FieldValue::Money(Decimal::new(50_000, 0))),
        "new_timesheet" => record
            .with_field("new_hours", FieldValue::Integer(8))
            .with_field("new_approved", FieldValue::Boolean(false)),
        _ => record,
    }
}
