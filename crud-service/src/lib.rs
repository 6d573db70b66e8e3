//! # crud-service
//!
//! A generic CRUD service and repository layer: many entity types share one
//! implementation of find/create/update/delete with pagination, filtering,
//! soft delete, duplicate checking, and bulk operations, returning a uniform
//! response envelope and a uniform error taxonomy.
//!
//! ## Architecture
//!
//! - [`store::StorageAdapter`]: the contract a persistence engine satisfies —
//!   count/find/create/update/delete primitives driven by filters and JSON
//!   patches. [`store::MemoryStore`] is the in-process reference backend.
//! - [`query::ListQuery`]: the query-parameter surface, translated into
//!   pagination bounds, an order specification, and merged filter conditions.
//! - [`service::CrudService`]: the orchestrator — validates targets, runs
//!   duplicate checks, delegates to the adapter, applies optional callbacks,
//!   and wraps results in the envelope.
//! - [`error::ServiceError`]: the closed failure taxonomy, each kind carrying
//!   a stable `<PREFIX>_<SUFFIX>` code and HTTP status.
//! - [`response::ApiResponse`]: the success envelope, one constructor per
//!   verb.
//!
//! ## Example
//!
//! ```rust
//! use crud_service::prelude::*;
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Note {
//!     id: i64,
//!     title: String,
//!     created_at: DateTime<Utc>,
//!     updated_at: DateTime<Utc>,
//!     deleted_at: Option<DateTime<Utc>>,
//! }
//!
//! impl Entity for Note {
//!     fn id(&self) -> i64 { self.id }
//!     fn created_at(&self) -> DateTime<Utc> { self.created_at }
//!     fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
//!     fn deleted_at(&self) -> Option<DateTime<Utc>> { self.deleted_at }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> crud_service::error::Result<()> {
//! let notes = CrudService::<Note, _>::new(MemoryStore::new(), "NOTES");
//!
//! let mut patch = Patch::new();
//! patch.insert("title".to_string(), json!("First"));
//! notes.create(CreateRequest::new(patch)).await?;
//!
//! let response = notes.find_all(FindAllRequest::new()).await?;
//! assert_eq!(response.data.unwrap().count, 1);
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod filter;
pub mod query;
pub mod response;
pub mod service;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::entity::Entity;
    pub use crate::error::{Error, ErrorKind, Result, ServiceError};
    pub use crate::filter::{Condition, Filter};
    pub use crate::query::{ListQuery, OrderDirection, OrderSpec, Pagination, SortParam};
    pub use crate::response::{ApiResponse, Page};
    pub use crate::service::{
        BulkCreateResult, BulkUpdateResult, CreateOutcome, CreatePayload, CreateRequest,
        CrudOrchestrator, CrudService, DeleteRequest, FindAllRequest, FindOneRequest, Target,
        UpdateItem, UpdateOutcome, UpdateRequest, UpdateTarget,
    };
    pub use crate::store::{
        to_patch, InsertCount, MemoryStore, Patch, StorageAdapter, StoreError, StoreResult,
    };
}
