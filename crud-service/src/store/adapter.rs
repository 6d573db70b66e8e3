//! The storage adapter contract
//!
//! Uses RPITIT (Return Position Impl Trait In Traits) for async trait
//! methods without `async_trait`, available since Rust 1.75.

use std::future::Future;

use serde_json::Value;

use crate::entity::Entity;
use crate::filter::Filter;
use crate::query::{OrderSpec, Pagination};

/// A partial entity: the fields a caller supplies for create or update
///
/// Lifecycle fields (`id`, `createdAt`, `updatedAt`, `deletedAt`) in a patch
/// are overridden by store-assigned values on create.
pub type Patch = serde_json::Map<String, Value>;

/// Serialize a DTO into a [`Patch`], dropping null fields
///
/// Optional DTO fields that were not provided serialize as null; stripping
/// them keeps an update from clearing columns the caller never mentioned.
///
/// # Example
///
/// ```rust
/// use crud_service::store::to_patch;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct CreateNote {
///     title: String,
///     author: Option<String>,
/// }
///
/// let patch = to_patch(&CreateNote { title: "hi".into(), author: None }).unwrap();
/// assert!(patch.contains_key("title"));
/// assert!(!patch.contains_key("author"));
/// ```
pub fn to_patch<D: serde::Serialize>(dto: &D) -> StoreResult<Patch> {
    match serde_json::to_value(dto)? {
        Value::Object(mut map) => {
            map.retain(|_, value| !value.is_null());
            Ok(map)
        }
        other => Err(StoreError::Backend(format!(
            "expected an object-shaped DTO, got {other}"
        ))),
    }
}

/// Result type for adapter operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Opaque storage-layer failure
///
/// Adapters do not classify business conditions; absence is expressed as
/// `Ok(None)`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row could not be serialized or deserialized
    #[error("row serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend itself failed
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Outcome of a bulk insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InsertCount {
    /// Number of rows actually stored
    pub count: usize,
}

/// Entity-parametrized storage contract
///
/// The boundary between the generic CRUD core and a persistence engine.
/// A relational store is assumed but not required; any backend that can
/// evaluate [`Filter`]s and merge [`Patch`]es qualifies.
///
/// # Example
///
/// ```rust,ignore
/// use crud_service::store::{MemoryStore, Patch, StorageAdapter};
///
/// let store: MemoryStore<Post> = MemoryStore::new();
/// let mut patch = Patch::new();
/// patch.insert("title".to_string(), "Hello".into());
/// let post = store.create(patch).await?;
/// assert_eq!(post.id(), 1);
/// ```
pub trait StorageAdapter<T: Entity>: Send + Sync {
    /// Number of rows matching the filter
    fn count(&self, filter: &Filter) -> impl Future<Output = StoreResult<u64>> + Send;

    /// One page of matching rows in the given order
    ///
    /// `relations` names related entities to resolve eagerly and `select`
    /// projects fields; backends without those capabilities accept and
    /// ignore them.
    fn find_all(
        &self,
        filter: &Filter,
        order: &OrderSpec,
        page: Pagination,
        relations: &[String],
        select: &[String],
    ) -> impl Future<Output = StoreResult<Vec<T>>> + Send;

    /// The first matching row, if any
    fn find_one(
        &self,
        filter: &Filter,
        select: &[String],
    ) -> impl Future<Output = StoreResult<Option<T>>> + Send;

    /// Like [`find_one`](Self::find_one), eagerly resolving the named
    /// relations
    fn find_one_with_relations(
        &self,
        filter: &Filter,
        relations: &[String],
        select: &[String],
    ) -> impl Future<Output = StoreResult<Option<T>>> + Send;

    /// Persist a new row, assigning defaults (`id`, `createdAt`), and
    /// return the stored entity
    fn create(&self, patch: Patch) -> impl Future<Output = StoreResult<T>> + Send;

    /// Persist each element and report how many rows were stored
    fn create_many(
        &self,
        patches: Vec<Patch>,
    ) -> impl Future<Output = StoreResult<InsertCount>> + Send;

    /// Apply a partial update to all matching rows, then return the first
    /// row re-fetched by the same filter (`None` when nothing matched, or
    /// when the update moved every match out of the filter)
    fn update(
        &self,
        filter: &Filter,
        patch: Patch,
    ) -> impl Future<Output = StoreResult<Option<T>>> + Send;

    /// Hard-delete matching rows, returning the first match as it was
    /// before removal (`None` when nothing matched)
    fn delete(&self, filter: &Filter) -> impl Future<Output = StoreResult<Option<T>>> + Send;

    /// Mark matching rows deleted by setting `deletedAt`, returning the
    /// first match as stored after marking (`None` when nothing matched)
    fn soft_delete(&self, filter: &Filter)
        -> impl Future<Output = StoreResult<Option<T>>> + Send;
}
