//! Simulated remote service
//!
//! - `memory` - In-memory entity store answering batch, single and paged requests
//! - `executor` - Connection-pooled executor implementing the engine's capabilities

pub mod executor;
pub mod memory;

pub use executor::PooledExecutor;
pub use memory::{default_catalog, InMemoryService};
