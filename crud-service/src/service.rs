//! The generic CRUD orchestrator
//!
//! [`CrudService`] drives the full workflow for every verb: translate the
//! query, run existence and duplicate checks, delegate to the storage
//! adapter, apply the optional post-processing callback, and wrap the result
//! in the uniform envelope. One orchestrator instance serves one entity type;
//! domain modules compose it with their storage adapter and error-code
//! prefix rather than subclassing anything.
//!
//! Within a single call, storage operations run strictly one after another;
//! across calls nothing is shared but the adapter, so concurrent requests
//! race at the storage layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use crud_service::prelude::*;
//!
//! let posts = CrudService::<Post, _>::new(MemoryStore::new(), "POSTS");
//! let response = posts
//!     .find_all(FindAllRequest::new().with_query(ListQuery::new().with_limit(20)))
//!     .await?;
//! ```

use std::future::Future;
use std::marker::PhantomData;

use serde::Serialize;

use crate::entity::Entity;
use crate::error::{Error, Result, ServiceError};
use crate::filter::Filter;
use crate::query::ListQuery;
use crate::response::{ApiResponse, Page};
use crate::store::{Patch, StorageAdapter, StoreError};

/// Post-processing callback for a single entity
pub type ItemCallback<T> =
    Box<dyn FnOnce(T) -> std::result::Result<T, ServiceError> + Send>;

/// Post-processing callback for a page of entities
pub type ListCallback<T> =
    Box<dyn FnOnce(Vec<T>) -> std::result::Result<Vec<T>, ServiceError> + Send>;

/// Post-processing callback for a create outcome
pub type CreateCallback<T> = Box<
    dyn FnOnce(CreateOutcome<T>) -> std::result::Result<CreateOutcome<T>, ServiceError> + Send,
>;

/// Post-processing callback for an update outcome
pub type UpdateCallback<T> = Box<
    dyn FnOnce(UpdateOutcome<T>) -> std::result::Result<UpdateOutcome<T>, ServiceError> + Send,
>;

/// A mutation target: a bare identifier or an arbitrary filter
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Resolves to `{id: <value>}`
    Id(i64),
    /// Used as-is
    Matching(Filter),
}

impl Target {
    /// Resolve the target to the filter the lookup will use
    #[must_use]
    pub fn into_filter(self) -> Filter {
        match self {
            Self::Id(id) => Filter::by_id(id),
            Self::Matching(filter) => filter,
        }
    }
}

impl From<i64> for Target {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<Filter> for Target {
    fn from(filter: Filter) -> Self {
        Self::Matching(filter)
    }
}

/// One element of a bulk update: which rows to touch and what to apply
#[derive(Debug, Clone, Serialize)]
pub struct UpdateItem {
    /// Rows to update
    #[serde(rename = "where")]
    pub target: Filter,
    /// Fields to apply
    pub data: Patch,
}

impl UpdateItem {
    /// Create a bulk-update element
    pub fn new(target: impl Into<Filter>, data: Patch) -> Self {
        Self {
            target: target.into(),
            data,
        }
    }
}

/// Update target: a single row selector or an ordered sequence of items
#[derive(Debug, Clone)]
pub enum UpdateTarget {
    /// Update the rows selected by one target
    One(Target),
    /// Apply each item independently and report a bulk result
    Many(Vec<UpdateItem>),
}

impl From<i64> for UpdateTarget {
    fn from(id: i64) -> Self {
        Self::One(Target::Id(id))
    }
}

impl From<Filter> for UpdateTarget {
    fn from(filter: Filter) -> Self {
        Self::One(Target::Matching(filter))
    }
}

impl From<Target> for UpdateTarget {
    fn from(target: Target) -> Self {
        Self::One(target)
    }
}

impl From<Vec<UpdateItem>> for UpdateTarget {
    fn from(items: Vec<UpdateItem>) -> Self {
        Self::Many(items)
    }
}

/// Create payload: one partial entity or an ordered sequence of them
#[derive(Debug, Clone)]
pub enum CreatePayload {
    /// Create a single row
    One(Patch),
    /// Bulk-create; the duplicate check is skipped for sequences
    Many(Vec<Patch>),
}

impl From<Patch> for CreatePayload {
    fn from(patch: Patch) -> Self {
        Self::One(patch)
    }
}

impl From<Vec<Patch>> for CreatePayload {
    fn from(patches: Vec<Patch>) -> Self {
        Self::Many(patches)
    }
}

/// Aggregate outcome of a bulk create
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateResult {
    /// Rows actually stored
    pub success_count: usize,
    /// The payloads as submitted
    pub create_dto: Vec<Patch>,
}

/// Aggregate outcome of a bulk update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResult {
    /// Items whose update matched at least one row
    pub success_count: usize,
    /// The items as submitted
    pub update_data: Vec<UpdateItem>,
}

/// Payload of a create envelope: the stored entity, or the bulk shape when
/// the payload was a sequence
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CreateOutcome<T> {
    /// A single stored entity
    Created(T),
    /// The bulk result
    Bulk(BulkCreateResult),
}

impl<T> CreateOutcome<T> {
    /// The stored entity, if this was a single create
    #[must_use]
    pub fn created(self) -> Option<T> {
        match self {
            Self::Created(entity) => Some(entity),
            Self::Bulk(_) => None,
        }
    }
}

/// Payload of an update envelope
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UpdateOutcome<T> {
    /// The re-fetched entity; null when the patch moved it out of the
    /// target filter
    Updated(Option<T>),
    /// The bulk result
    Bulk(BulkUpdateResult),
}

impl<T> UpdateOutcome<T> {
    /// The updated entity, if this was a single update that re-fetched one
    #[must_use]
    pub fn updated(self) -> Option<T> {
        match self {
            Self::Updated(entity) => entity,
            Self::Bulk(_) => None,
        }
    }
}

/// Parameters for [`CrudOrchestrator::find_all`]
pub struct FindAllRequest<T: Entity> {
    /// Caller-supplied base conditions
    pub filter: Filter,
    /// Pagination, sorting, and visibility parameters
    pub query: ListQuery,
    /// Relations to resolve eagerly
    pub relations: Vec<String>,
    /// Fields to project
    pub select: Vec<String>,
    callback: Option<ListCallback<T>>,
}

impl<T: Entity> Default for FindAllRequest<T> {
    fn default() -> Self {
        Self {
            filter: Filter::new(),
            query: ListQuery::new(),
            relations: Vec::new(),
            select: Vec::new(),
            callback: None,
        }
    }
}

impl<T: Entity> FindAllRequest<T> {
    /// Create an empty request (first page, defaults)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base filter
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the query parameters
    #[must_use]
    pub fn with_query(mut self, query: ListQuery) -> Self {
        self.query = query;
        self
    }

    /// Name relations to resolve eagerly
    #[must_use]
    pub fn with_relations(mut self, relations: Vec<String>) -> Self {
        self.relations = relations;
        self
    }

    /// Project only the named fields
    #[must_use]
    pub fn with_select(mut self, select: Vec<String>) -> Self {
        self.select = select;
        self
    }

    /// Transform the page of results before it is wrapped
    #[must_use]
    pub fn with_callback(
        mut self,
        callback: impl FnOnce(Vec<T>) -> std::result::Result<Vec<T>, ServiceError> + Send + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

/// Parameters for [`CrudOrchestrator::find_one`]
pub struct FindOneRequest<T: Entity> {
    /// Conditions the entity must match
    pub filter: Filter,
    /// Relations to resolve eagerly
    pub relations: Vec<String>,
    /// Fields to project
    pub select: Vec<String>,
    callback: Option<ItemCallback<T>>,
}

impl<T: Entity> FindOneRequest<T> {
    /// Fetch the entity matching a filter
    #[must_use]
    pub fn matching(filter: Filter) -> Self {
        Self {
            filter,
            relations: Vec::new(),
            select: Vec::new(),
            callback: None,
        }
    }

    /// Fetch an entity by identifier
    #[must_use]
    pub fn by_id(id: i64) -> Self {
        Self::matching(Filter::by_id(id))
    }

    /// Name relations to resolve eagerly
    #[must_use]
    pub fn with_relations(mut self, relations: Vec<String>) -> Self {
        self.relations = relations;
        self
    }

    /// Project only the named fields
    #[must_use]
    pub fn with_select(mut self, select: Vec<String>) -> Self {
        self.select = select;
        self
    }

    /// Transform the entity before it is wrapped
    #[must_use]
    pub fn with_callback(
        mut self,
        callback: impl FnOnce(T) -> std::result::Result<T, ServiceError> + Send + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

/// Parameters for [`CrudOrchestrator::create`]
pub struct CreateRequest<T: Entity> {
    payload: CreatePayload,
    check_fields: Option<Filter>,
    callback: Option<CreateCallback<T>>,
}

impl<T: Entity> CreateRequest<T> {
    /// Create one entity or a sequence of them
    pub fn new(payload: impl Into<CreatePayload>) -> Self {
        Self {
            payload: payload.into(),
            check_fields: None,
            callback: None,
        }
    }

    /// Fail with a duplicate error when an entity matching these fields
    /// already exists
    ///
    /// The check is application-level: it is not atomic with the insert, so
    /// two concurrent calls can both pass it. A true uniqueness guarantee
    /// needs a constraint in the storage backend. Ignored for sequence
    /// payloads.
    #[must_use]
    pub fn with_check_fields(mut self, check_fields: Filter) -> Self {
        self.check_fields = Some(check_fields);
        self
    }

    /// Transform the outcome before it is wrapped
    #[must_use]
    pub fn with_callback(
        mut self,
        callback: impl FnOnce(CreateOutcome<T>) -> std::result::Result<CreateOutcome<T>, ServiceError>
            + Send
            + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

/// Parameters for [`CrudOrchestrator::update`]
pub struct UpdateRequest<T: Entity> {
    target: Option<UpdateTarget>,
    update: Patch,
    check_fields: Option<Filter>,
    callback: Option<UpdateCallback<T>>,
}

impl<T: Entity> Default for UpdateRequest<T> {
    fn default() -> Self {
        Self {
            target: None,
            update: Patch::new(),
            check_fields: None,
            callback: None,
        }
    }
}

impl<T: Entity> UpdateRequest<T> {
    /// Create a request with no target yet; dispatching it this way fails
    /// with a bad-request error
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the entity with the given identifier
    #[must_use]
    pub fn by_id(id: i64) -> Self {
        Self::new().with_target(id)
    }

    /// Apply each item independently and report a bulk result
    ///
    /// Per-item existence and duplicate checks are skipped; items whose
    /// filter matched nothing simply don't count as successes.
    #[must_use]
    pub fn bulk(items: Vec<UpdateItem>) -> Self {
        Self::new().with_target(items)
    }

    /// Set the update target
    #[must_use]
    pub fn with_target(mut self, target: impl Into<UpdateTarget>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the fields to apply
    #[must_use]
    pub fn with_update(mut self, update: Patch) -> Self {
        self.update = update;
        self
    }

    /// Fail with a duplicate error when a *different* entity matching these
    /// fields already exists; the entity being updated matching its own
    /// check fields is not a duplicate
    #[must_use]
    pub fn with_check_fields(mut self, check_fields: Filter) -> Self {
        self.check_fields = Some(check_fields);
        self
    }

    /// Transform the outcome before it is wrapped
    #[must_use]
    pub fn with_callback(
        mut self,
        callback: impl FnOnce(UpdateOutcome<T>) -> std::result::Result<UpdateOutcome<T>, ServiceError>
            + Send
            + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

/// Parameters for [`CrudOrchestrator::delete`]
pub struct DeleteRequest<T: Entity> {
    target: Option<Target>,
    callback: Option<ItemCallback<T>>,
}

impl<T: Entity> Default for DeleteRequest<T> {
    fn default() -> Self {
        Self {
            target: None,
            callback: None,
        }
    }
}

impl<T: Entity> DeleteRequest<T> {
    /// Create a request with no target yet; dispatching it this way fails
    /// with a bad-request error
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete the entity with the given identifier
    #[must_use]
    pub fn by_id(id: i64) -> Self {
        Self::new().with_target(id)
    }

    /// Set the delete target
    #[must_use]
    pub fn with_target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Transform the deleted entity before it is wrapped
    #[must_use]
    pub fn with_callback(
        mut self,
        callback: impl FnOnce(T) -> std::result::Result<T, ServiceError> + Send + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

/// The generic CRUD workflow, one implementation shared by every entity
///
/// Each call is an independent unit of work; the orchestrator keeps no state
/// between calls. Error and transform ordering is fixed: existence checks
/// precede duplicate checks, which precede the mutating call, which precedes
/// the callback.
pub trait CrudOrchestrator<T: Entity>: Send + Sync {
    /// List one page of entities together with the total match count
    ///
    /// The count and the page are computed from the same translated filter,
    /// sequentially; a mutation landing between the two calls can make them
    /// briefly inconsistent.
    fn find_all(
        &self,
        request: FindAllRequest<T>,
    ) -> impl Future<Output = Result<ApiResponse<Page<T>>>> + Send;

    /// Fetch a single entity, failing with a not-found error if absent
    fn find_one(
        &self,
        request: FindOneRequest<T>,
    ) -> impl Future<Output = Result<ApiResponse<T>>> + Send;

    /// Create one entity (with optional duplicate check) or a sequence
    fn create(
        &self,
        request: CreateRequest<T>,
    ) -> impl Future<Output = Result<ApiResponse<CreateOutcome<T>>>> + Send;

    /// Update the targeted entity (with optional duplicate check) or apply
    /// a sequence of items
    fn update(
        &self,
        request: UpdateRequest<T>,
    ) -> impl Future<Output = Result<ApiResponse<UpdateOutcome<T>>>> + Send;

    /// Soft-delete the targeted entity
    fn delete(
        &self,
        request: DeleteRequest<T>,
    ) -> impl Future<Output = Result<ApiResponse<T>>> + Send;
}

/// Generic [`CrudOrchestrator`] over any [`StorageAdapter`]
///
/// Holds the adapter and the domain error-code prefix; entity modules
/// compose one of these per entity type.
pub struct CrudService<T: Entity, S> {
    store: S,
    prefix: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, S: StorageAdapter<T>> CrudService<T, S> {
    /// Create an orchestrator over a storage adapter
    ///
    /// `prefix` becomes the `<PREFIX>` part of every error code this
    /// service raises.
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            _entity: PhantomData,
        }
    }

    /// The underlying storage adapter
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The domain error-code prefix
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn not_found(&self, shown: &str) -> Error {
        ServiceError::not_found(
            &self.prefix,
            format!("No entity matched the given filter. [{shown}]"),
        )
        .into()
    }

    fn rewrap(&self, action: &str, error: StoreError) -> Error {
        ServiceError::internal(
            &self.prefix,
            format!("Unexpected failure while {action} data: {error}"),
        )
        .into()
    }
}

/// Full-value equality, on the serialized forms
fn values_equal<T: Serialize>(a: &T, b: &T) -> serde_json::Result<bool> {
    Ok(serde_json::to_value(a)? == serde_json::to_value(b)?)
}

impl<T: Entity, S: StorageAdapter<T>> CrudOrchestrator<T> for CrudService<T, S> {
    async fn find_all(&self, request: FindAllRequest<T>) -> Result<ApiResponse<Page<T>>> {
        let page = request.query.pagination();
        let order = request.query.order_spec();
        let filter = request.query.build_filter(request.filter);
        tracing::debug!(prefix = %self.prefix, %filter, "find_all");

        // Count and page must reflect the same predicate.
        let count = self.store.count(&filter).await?;
        let mut items = self
            .store
            .find_all(&filter, &order, page, &request.relations, &request.select)
            .await?;

        if let Some(callback) = request.callback {
            items = callback(items)?;
        }

        Ok(ApiResponse::find_success(Page { items, count }))
    }

    async fn find_one(&self, request: FindOneRequest<T>) -> Result<ApiResponse<T>> {
        let shown = request.filter.to_string();
        let lookup = request.filter.excluding_deleted();
        tracing::debug!(prefix = %self.prefix, filter = %lookup, "find_one");

        let found = self
            .store
            .find_one_with_relations(&lookup, &request.relations, &request.select)
            .await?;
        let Some(mut data) = found else {
            return Err(self.not_found(&shown));
        };

        if let Some(callback) = request.callback {
            data = callback(data)?;
        }

        Ok(ApiResponse::find_success(data))
    }

    async fn create(&self, request: CreateRequest<T>) -> Result<ApiResponse<CreateOutcome<T>>> {
        let outcome = match request.payload {
            CreatePayload::Many(patches) => {
                tracing::debug!(prefix = %self.prefix, count = patches.len(), "bulk create");
                let inserted = self
                    .store
                    .create_many(patches.clone())
                    .await
                    .map_err(|e| self.rewrap("creating", e))?;
                CreateOutcome::Bulk(BulkCreateResult {
                    success_count: inserted.count,
                    create_dto: patches,
                })
            }
            CreatePayload::One(patch) => {
                if let Some(check) = &request.check_fields {
                    let existing = self
                        .store
                        .find_one(&check.clone().excluding_deleted(), &[])
                        .await
                        .map_err(|e| self.rewrap("creating", e))?;
                    if existing.is_some() {
                        return Err(ServiceError::duplicate(
                            &self.prefix,
                            format!("Duplicate data: {check}"),
                        )
                        .into());
                    }
                }
                tracing::debug!(prefix = %self.prefix, "create");
                let created = self
                    .store
                    .create(patch)
                    .await
                    .map_err(|e| self.rewrap("creating", e))?;
                CreateOutcome::Created(created)
            }
        };

        let outcome = match request.callback {
            Some(callback) => callback(outcome)?,
            None => outcome,
        };

        Ok(ApiResponse::create_success(outcome))
    }

    async fn update(&self, request: UpdateRequest<T>) -> Result<ApiResponse<UpdateOutcome<T>>> {
        let Some(target) = request.target else {
            return Err(
                ServiceError::bad_request(&self.prefix, "No update target was given.").into(),
            );
        };

        let outcome = match target {
            UpdateTarget::Many(items) => {
                tracing::debug!(prefix = %self.prefix, count = items.len(), "bulk update");
                let mut success_count = 0;
                for item in &items {
                    let lookup = item.target.clone().excluding_deleted();
                    let updated = self
                        .store
                        .update(&lookup, item.data.clone())
                        .await
                        .map_err(|e| self.rewrap("updating", e))?;
                    if updated.is_some() {
                        success_count += 1;
                    }
                }
                UpdateOutcome::Bulk(BulkUpdateResult {
                    success_count,
                    update_data: items,
                })
            }
            UpdateTarget::One(target) => {
                let filter = target.into_filter();
                let shown = filter.to_string();
                let lookup = filter.excluding_deleted();
                tracing::debug!(prefix = %self.prefix, filter = %lookup, "update");

                let existing = self
                    .store
                    .find_one(&lookup, &[])
                    .await
                    .map_err(|e| self.rewrap("updating", e))?;
                let Some(existing) = existing else {
                    return Err(self.not_found(&shown));
                };

                if let Some(check) = &request.check_fields {
                    let duplicate = self
                        .store
                        .find_one(&check.clone().excluding_deleted(), &[])
                        .await
                        .map_err(|e| self.rewrap("updating", e))?;
                    if let Some(duplicate) = duplicate {
                        let is_self = values_equal(&duplicate, &existing)
                            .map_err(|e| self.rewrap("updating", StoreError::from(e)))?;
                        if !is_self {
                            return Err(ServiceError::duplicate(
                                &self.prefix,
                                format!("Duplicate data: {check}"),
                            )
                            .into());
                        }
                    }
                }

                let updated = self
                    .store
                    .update(&lookup, request.update)
                    .await
                    .map_err(|e| self.rewrap("updating", e))?;
                UpdateOutcome::Updated(updated)
            }
        };

        let outcome = match request.callback {
            Some(callback) if !matches!(outcome, UpdateOutcome::Updated(None)) => {
                callback(outcome)?
            }
            _ => outcome,
        };

        Ok(ApiResponse::update_success(outcome))
    }

    async fn delete(&self, request: DeleteRequest<T>) -> Result<ApiResponse<T>> {
        let Some(target) = request.target else {
            return Err(
                ServiceError::bad_request(&self.prefix, "No delete target was given.").into(),
            );
        };

        let filter = target.into_filter();
        let shown = filter.to_string();
        let lookup = filter.excluding_deleted();
        tracing::debug!(prefix = %self.prefix, filter = %lookup, "delete");

        let existing = self.store.find_one(&lookup, &[]).await?;
        if existing.is_none() {
            return Err(self.not_found(&shown));
        }

        let deleted = self.store.soft_delete(&lookup).await?;
        let deleted = match (request.callback, deleted) {
            (Some(callback), Some(data)) => Some(callback(data)?),
            (_, deleted) => deleted,
        };

        Ok(ApiResponse::delete_success(deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::DELETED_AT_FIELD;
    use crate::error::ErrorKind;
    use crate::query::ListQuery;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Article {
        id: i64,
        title: String,
        #[serde(default)]
        author: Option<String>,
        #[serde(default)]
        view_count: u64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    }

    impl Entity for Article {
        fn id(&self) -> i64 {
            self.id
        }
        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
        fn updated_at(&self) -> DateTime<Utc> {
            self.updated_at
        }
        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            self.deleted_at
        }
    }

    type Articles = CrudService<Article, MemoryStore<Article>>;

    fn service() -> Articles {
        CrudService::new(MemoryStore::new(), "ARTICLES")
    }

    fn patch(title: &str) -> Patch {
        let mut p = Patch::new();
        p.insert("title".to_string(), json!(title));
        p
    }

    fn domain_kind(error: &Error) -> Option<ErrorKind> {
        error.as_domain().map(|e| e.kind)
    }

    async fn seed(service: &Articles, title: &str) -> Article {
        service
            .create(CreateRequest::new(patch(title)))
            .await
            .unwrap()
            .data
            .unwrap()
            .created()
            .unwrap()
    }

    #[tokio::test]
    async fn test_find_one_not_found_on_empty_store() {
        let service = service();
        let error = service
            .find_one(FindOneRequest::by_id(999))
            .await
            .unwrap_err();
        let domain = error.as_domain().unwrap();
        assert_eq!(domain.kind, ErrorKind::NotFound);
        assert_eq!(domain.error_code, "ARTICLES_NOT_FOUND");
        assert_eq!(domain.status_code().as_u16(), 404);
        // The filter is embedded as diagnostic context.
        assert!(domain.message.contains(r#"{"id":999}"#));
    }

    #[tokio::test]
    async fn test_find_one_returns_envelope() {
        let service = service();
        let created = seed(&service, "hello").await;
        let response = service
            .find_one(FindOneRequest::by_id(created.id()))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.data.unwrap().title, "hello");
    }

    #[tokio::test]
    async fn test_find_all_count_matches_page_predicate() {
        let service = service();
        for i in 0..15 {
            seed(&service, &format!("article {i}")).await;
        }
        let response = service
            .find_all(
                FindAllRequest::new().with_query(ListQuery::new().with_page(2).with_limit(10)),
            )
            .await
            .unwrap();
        let page = response.data.unwrap();
        assert_eq!(page.count, 15);
        assert_eq!(page.items.len(), 5);
    }

    #[tokio::test]
    async fn test_find_all_applies_base_filter() {
        let service = service();
        seed(&service, "keep").await;
        seed(&service, "drop").await;
        let response = service
            .find_all(FindAllRequest::new().with_filter(Filter::new().eq("title", "keep")))
            .await
            .unwrap();
        let page = response.data.unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0].title, "keep");
    }

    #[tokio::test]
    async fn test_find_all_sorts_by_requested_field() {
        let service = service();
        for title in ["b", "c", "a"] {
            seed(&service, title).await;
        }
        let response = service
            .find_all(FindAllRequest::new().with_query(ListQuery::new().with_sort("title-asc")))
            .await
            .unwrap();
        let titles: Vec<String> = response
            .data
            .unwrap()
            .items
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_find_all_callback_transforms_page() {
        let service = service();
        seed(&service, "x").await;
        let response = service
            .find_all(FindAllRequest::new().with_callback(|mut items: Vec<Article>| {
                for item in &mut items {
                    item.title = item.title.to_uppercase();
                }
                Ok(items)
            }))
            .await
            .unwrap();
        assert_eq!(response.data.unwrap().items[0].title, "X");
    }

    #[tokio::test]
    async fn test_create_single_returns_201() {
        let service = service();
        let response = service.create(CreateRequest::new(patch("new"))).await.unwrap();
        assert_eq!(response.status_code, 201);
        let created = response.data.unwrap().created().unwrap();
        assert_eq!(created.id(), 1);
        assert_eq!(created.title, "new");
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected_and_not_persisted() {
        let service = service();
        seed(&service, "A").await;
        let error = service
            .create(
                CreateRequest::new(patch("A"))
                    .with_check_fields(Filter::new().eq("title", "A")),
            )
            .await
            .unwrap_err();
        let domain = error.as_domain().unwrap();
        assert_eq!(domain.kind, ErrorKind::Duplicate);
        assert_eq!(domain.error_code, "ARTICLES_DUPLICATE");
        assert_eq!(domain.status_code().as_u16(), 409);

        // No second row was stored.
        let count = service
            .find_all(FindAllRequest::new())
            .await
            .unwrap()
            .data
            .unwrap()
            .count;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_bulk_create_skips_duplicate_check() {
        let service = service();
        seed(&service, "A").await;
        let response = service
            .create(
                CreateRequest::new(vec![patch("A"), patch("B")])
                    .with_check_fields(Filter::new().eq("title", "A")),
            )
            .await
            .unwrap();
        match response.data.unwrap() {
            CreateOutcome::Bulk(bulk) => {
                assert_eq!(bulk.success_count, 2);
                assert_eq!(bulk.create_dto.len(), 2);
            }
            CreateOutcome::Created(_) => panic!("expected a bulk outcome"),
        }
    }

    #[tokio::test]
    async fn test_create_callback_error_keeps_its_kind() {
        let service = service();
        let error = service
            .create(CreateRequest::new(patch("x")).with_callback(|_| {
                Err(ServiceError::bad_request("ARTICLES", "rejected by callback"))
            }))
            .await
            .unwrap_err();
        // Callback failures are not rewrapped as internal errors.
        assert_eq!(domain_kind(&error), Some(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn test_update_without_target_is_bad_request() {
        let service = service();
        let error = service.update(UpdateRequest::new()).await.unwrap_err();
        assert_eq!(domain_kind(&error), Some(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn test_update_missing_entity_is_not_found() {
        let service = service();
        let error = service
            .update(UpdateRequest::by_id(42).with_update(patch("x")))
            .await
            .unwrap_err();
        assert_eq!(domain_kind(&error), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let service = service();
        let created = seed(&service, "before").await;
        let response = service
            .update(UpdateRequest::by_id(created.id()).with_update(patch("after")))
            .await
            .unwrap();
        assert_eq!(response.status_code, 200);
        let updated = response.data.unwrap().updated().unwrap();
        assert_eq!(updated.title, "after");
        assert_eq!(updated.id(), created.id());
    }

    #[tokio::test]
    async fn test_update_self_match_does_not_raise_duplicate() {
        let service = service();
        let created = seed(&service, "A").await;
        // The entity still matches its own check fields; that must not be a
        // duplicate.
        let mut bump = Patch::new();
        bump.insert("viewCount".to_string(), json!(5));
        let response = service
            .update(
                UpdateRequest::by_id(created.id())
                    .with_update(bump)
                    .with_check_fields(Filter::new().eq("title", "A")),
            )
            .await
            .unwrap();
        let updated = response.data.unwrap().updated().unwrap();
        assert_eq!(updated.view_count, 5);
    }

    #[tokio::test]
    async fn test_update_conflicting_entity_raises_duplicate() {
        let service = service();
        seed(&service, "A").await;
        let second = seed(&service, "B").await;
        let error = service
            .update(
                UpdateRequest::by_id(second.id())
                    .with_update(patch("A"))
                    .with_check_fields(Filter::new().eq("title", "A")),
            )
            .await
            .unwrap_err();
        assert_eq!(domain_kind(&error), Some(ErrorKind::Duplicate));
    }

    #[tokio::test]
    async fn test_bulk_update_counts_successes() {
        let service = service();
        let first = seed(&service, "a").await;
        let second = seed(&service, "b").await;
        let mut bump = Patch::new();
        bump.insert("viewCount".to_string(), json!(1));
        let items = vec![
            UpdateItem::new(Filter::by_id(first.id()), bump.clone()),
            UpdateItem::new(Filter::by_id(second.id()), bump.clone()),
            UpdateItem::new(Filter::by_id(999), bump),
        ];
        let response = service.update(UpdateRequest::bulk(items)).await.unwrap();
        match response.data.unwrap() {
            UpdateOutcome::Bulk(bulk) => {
                assert_eq!(bulk.success_count, 2);
                assert_eq!(bulk.update_data.len(), 3);
            }
            UpdateOutcome::Updated(_) => panic!("expected a bulk outcome"),
        }
    }

    #[tokio::test]
    async fn test_delete_without_target_is_bad_request() {
        let service = service();
        let error = service.delete(DeleteRequest::new()).await.unwrap_err();
        assert_eq!(domain_kind(&error), Some(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn test_soft_delete_then_default_listing_excludes() {
        let service = service();
        let created = seed(&service, "gone soon").await;
        let response = service
            .delete(DeleteRequest::by_id(created.id()))
            .await
            .unwrap();
        assert!(response.success);

        // Default visibility excludes the deleted row.
        let page = service
            .find_all(FindAllRequest::new())
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(page.count, 0);

        // Asking for deleted rows includes it, with deletedAt set.
        let page = service
            .find_all(FindAllRequest::new().with_query(ListQuery::new().with_deleted(true)))
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(page.count, 1);
        assert!(page.items[0].deleted_at().is_some());
    }

    #[tokio::test]
    async fn test_delete_twice_fails_not_found() {
        let service = service();
        let created = seed(&service, "once").await;
        service
            .delete(DeleteRequest::by_id(created.id()))
            .await
            .unwrap();
        // The soft-deleted row no longer satisfies the existence lookup.
        let error = service
            .delete(DeleteRequest::by_id(created.id()))
            .await
            .unwrap_err();
        assert_eq!(domain_kind(&error), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_deleted_entity_hidden_from_find_one() {
        let service = service();
        let created = seed(&service, "hidden").await;
        service
            .delete(DeleteRequest::by_id(created.id()))
            .await
            .unwrap();
        let error = service
            .find_one(FindOneRequest::by_id(created.id()))
            .await
            .unwrap_err();
        assert_eq!(domain_kind(&error), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_find_one_explicit_deleted_filter_wins() {
        let service = service();
        let created = seed(&service, "trash").await;
        service
            .delete(DeleteRequest::by_id(created.id()))
            .await
            .unwrap();
        let response = service
            .find_one(FindOneRequest::matching(
                Filter::by_id(created.id()).is_not_null(DELETED_AT_FIELD),
            ))
            .await
            .unwrap();
        assert!(response.data.unwrap().deleted_at().is_some());
    }

    #[tokio::test]
    async fn test_find_all_date_range_filters_created_at() {
        let service = service();
        seed(&service, "now").await;
        let response = service
            .find_all(
                FindAllRequest::new()
                    .with_query(ListQuery::new().with_date_range("2000-01-01", "2000-12-31")),
            )
            .await
            .unwrap();
        assert_eq!(response.data.unwrap().count, 0);

        let response = service
            .find_all(
                FindAllRequest::new()
                    .with_query(ListQuery::new().with_date_range("2000-01-01", "2999-12-31")),
            )
            .await
            .unwrap();
        assert_eq!(response.data.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_delete_callback_sees_deleted_entity() {
        let service = service();
        let created = seed(&service, "observed").await;
        let response = service
            .delete(DeleteRequest::by_id(created.id()).with_callback(|entity: Article| {
                assert!(entity.deleted_at().is_some());
                Ok(entity)
            }))
            .await
            .unwrap();
        assert!(response.data.is_some());
    }
}
