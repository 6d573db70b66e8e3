//! Storage adapters for the generic CRUD layer
//!
//! [`StorageAdapter`] is the contract between the orchestrator and a
//! persistence engine: entity-parametrized count/find/create/update/delete
//! primitives, including soft delete, driven entirely by [`Filter`]s and JSON
//! [`Patch`]es. Adapters surface storage faults as opaque [`StoreError`]s and
//! perform no business validation.
//!
//! [`MemoryStore`] is the in-process reference backend used in tests and by
//! services that have not chosen an engine yet.
//!
//! [`Filter`]: crate::filter::Filter

mod adapter;
mod memory;

pub use adapter::{to_patch, InsertCount, Patch, StorageAdapter, StoreError, StoreResult};
pub use memory::MemoryStore;
