//! In-memory storage backend
//!
//! Rows live as JSON objects in an ordered map behind an `RwLock`, keyed by
//! their sequentially assigned id. The store is the reference
//! [`StorageAdapter`] implementation: tests run against it, and services use
//! it until they bind a real engine.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::adapter::{InsertCount, Patch, StorageAdapter, StoreError, StoreResult};
use crate::entity::{
    Entity, CREATED_AT_FIELD, DELETED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use crate::filter::{compare, Filter};
use crate::query::{OrderDirection, OrderSpec, Pagination};

#[derive(Debug)]
struct Rows {
    next_id: i64,
    rows: BTreeMap<i64, Value>,
}

impl Default for Rows {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

/// In-memory [`StorageAdapter`] over JSON rows
///
/// Ids are positive integers assigned in insertion order. `relations` and
/// `select` arguments are accepted for contract compatibility and ignored:
/// the store holds whole rows and has no relation graph.
///
/// # Example
///
/// ```rust,ignore
/// let store: MemoryStore<Post> = MemoryStore::new();
/// let created = store.create(patch).await?;
/// assert_eq!(created.id(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryStore<T: Entity> {
    inner: RwLock<Rows>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryStore<T> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Rows::default()),
            _entity: PhantomData,
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Rows>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Rows>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

/// Current instant in the RFC 3339 form rows carry
fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Build a fresh row from a patch, letting the store-assigned lifecycle
/// fields win over anything the patch carried
fn new_row(patch: Patch, id: i64, now: &Value) -> Value {
    let mut obj = patch;
    obj.insert(ID_FIELD.to_string(), id.into());
    obj.insert(CREATED_AT_FIELD.to_string(), now.clone());
    obj.insert(UPDATED_AT_FIELD.to_string(), now.clone());
    obj.insert(DELETED_AT_FIELD.to_string(), Value::Null);
    Value::Object(obj)
}

fn decode<T: Entity>(row: &Value) -> StoreResult<T> {
    serde_json::from_value(row.clone()).map_err(StoreError::from)
}

/// Sort rows by the order spec left to right; ascending id breaks ties so
/// pages stay deterministic under equal keys
fn order_rows(rows: &mut [(i64, Value)], order: &OrderSpec) {
    rows.sort_by(|(id_a, a), (id_b, b)| {
        for (field, direction) in order {
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            let ordering = compare(left, right).unwrap_or(Ordering::Equal);
            let ordering = match direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        id_a.cmp(id_b)
    });
}

impl<T: Entity> StorageAdapter<T> for MemoryStore<T> {
    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let guard = self.read()?;
        Ok(guard.rows.values().filter(|row| filter.matches(row)).count() as u64)
    }

    async fn find_all(
        &self,
        filter: &Filter,
        order: &OrderSpec,
        page: Pagination,
        _relations: &[String],
        _select: &[String],
    ) -> StoreResult<Vec<T>> {
        let guard = self.read()?;
        let mut matched: Vec<(i64, Value)> = guard
            .rows
            .iter()
            .filter(|(_, row)| filter.matches(row))
            .map(|(id, row)| (*id, row.clone()))
            .collect();
        drop(guard);

        order_rows(&mut matched, order);

        matched
            .into_iter()
            .skip(usize::try_from(page.skip).unwrap_or(usize::MAX))
            .take(usize::try_from(page.take).unwrap_or(usize::MAX))
            .map(|(_, row)| decode(&row))
            .collect()
    }

    async fn find_one(&self, filter: &Filter, _select: &[String]) -> StoreResult<Option<T>> {
        let guard = self.read()?;
        guard
            .rows
            .values()
            .find(|row| filter.matches(row))
            .map(decode)
            .transpose()
    }

    async fn find_one_with_relations(
        &self,
        filter: &Filter,
        _relations: &[String],
        select: &[String],
    ) -> StoreResult<Option<T>> {
        self.find_one(filter, select).await
    }

    async fn create(&self, patch: Patch) -> StoreResult<T> {
        let mut guard = self.write()?;
        let id = guard.next_id;
        let row = new_row(patch, id, &now_value());
        let entity = decode::<T>(&row)?;
        guard.rows.insert(id, row);
        guard.next_id = id + 1;
        tracing::debug!(id, "row created");
        Ok(entity)
    }

    async fn create_many(&self, patches: Vec<Patch>) -> StoreResult<InsertCount> {
        let mut guard = self.write()?;
        let now = now_value();

        // Validate the whole batch before any row is stored.
        let mut staged = Vec::with_capacity(patches.len());
        for (offset, patch) in patches.into_iter().enumerate() {
            let id = guard.next_id + offset as i64;
            let row = new_row(patch, id, &now);
            decode::<T>(&row)?;
            staged.push((id, row));
        }

        let count = staged.len();
        for (id, row) in staged {
            guard.rows.insert(id, row);
            guard.next_id = id + 1;
        }
        tracing::debug!(count, "rows created");
        Ok(InsertCount { count })
    }

    async fn update(&self, filter: &Filter, patch: Patch) -> StoreResult<Option<T>> {
        let mut guard = self.write()?;
        let now = now_value();

        let ids: Vec<i64> = guard
            .rows
            .iter()
            .filter(|(_, row)| filter.matches(row))
            .map(|(id, _)| *id)
            .collect();

        let mut staged = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(row) = guard.rows.get(id) else {
                continue;
            };
            let mut merged = row.clone();
            if let Value::Object(obj) = &mut merged {
                for (field, value) in &patch {
                    obj.insert(field.clone(), value.clone());
                }
                obj.insert(UPDATED_AT_FIELD.to_string(), now.clone());
            }
            decode::<T>(&merged)?;
            staged.push((*id, merged));
        }

        for (id, row) in staged {
            guard.rows.insert(id, row);
        }
        tracing::debug!(updated = ids.len(), "rows updated");

        // Re-fetch by the same filter: a patch that moved every match out of
        // the filter yields None, as does an empty match set.
        guard
            .rows
            .values()
            .find(|row| filter.matches(row))
            .map(decode)
            .transpose()
    }

    async fn delete(&self, filter: &Filter) -> StoreResult<Option<T>> {
        let mut guard = self.write()?;

        let ids: Vec<i64> = guard
            .rows
            .iter()
            .filter(|(_, row)| filter.matches(row))
            .map(|(id, _)| *id)
            .collect();
        let Some(first) = ids.first() else {
            return Ok(None);
        };

        let snapshot = guard.rows.get(first).map(|row| decode::<T>(row)).transpose()?;
        for id in &ids {
            guard.rows.remove(id);
        }
        tracing::debug!(removed = ids.len(), "rows deleted");
        Ok(snapshot)
    }

    async fn soft_delete(&self, filter: &Filter) -> StoreResult<Option<T>> {
        let mut guard = self.write()?;
        let now = now_value();

        let ids: Vec<i64> = guard
            .rows
            .iter()
            .filter(|(_, row)| filter.matches(row))
            .map(|(id, _)| *id)
            .collect();
        let Some(first) = ids.first() else {
            return Ok(None);
        };

        for id in &ids {
            if let Some(Value::Object(obj)) = guard.rows.get_mut(id) {
                obj.insert(DELETED_AT_FIELD.to_string(), now.clone());
                obj.insert(UPDATED_AT_FIELD.to_string(), now.clone());
            }
        }
        tracing::debug!(marked = ids.len(), "rows soft-deleted");

        guard.rows.get(first).map(|row| decode::<T>(row)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Note {
        id: i64,
        title: String,
        #[serde(default)]
        pinned: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    }

    impl Entity for Note {
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

    fn patch(title: &str) -> Patch {
        let mut p = Patch::new();
        p.insert("title".to_string(), json!(title));
        p
    }

    fn store() -> MemoryStore<Note> {
        MemoryStore::new()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids_and_timestamps() {
        let store = store();
        let first = store.create(patch("a")).await.unwrap();
        let second = store.create(patch("b")).await.unwrap();
        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert!(first.deleted_at().is_none());
        assert_eq!(first.created_at(), first.updated_at());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_patch() {
        let store = store();
        let mut bad = Patch::new();
        bad.insert("title".to_string(), json!(5));
        let result = store.create(bad).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
        assert_eq!(store.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_ignores_lifecycle_fields_in_patch() {
        let store = store();
        let mut sneaky = patch("a");
        sneaky.insert("id".to_string(), json!(99));
        let created = store.create(sneaky).await.unwrap();
        assert_eq!(created.id(), 1);
    }

    #[tokio::test]
    async fn test_create_many_counts_rows() {
        let store = store();
        let result = store
            .create_many(vec![patch("a"), patch("b"), patch("c")])
            .await
            .unwrap();
        assert_eq!(result, InsertCount { count: 3 });
        assert_eq!(store.count(&Filter::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_many_validates_before_storing() {
        let store = store();
        let mut bad = Patch::new();
        bad.insert("title".to_string(), json!(5));
        let result = store.create_many(vec![patch("a"), bad]).await;
        assert!(result.is_err());
        assert_eq!(store.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_one_returns_first_match() {
        let store = store();
        store.create(patch("a")).await.unwrap();
        store.create(patch("a")).await.unwrap();
        let found = store
            .find_one(&Filter::new().eq("title", "a"), &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), 1);
    }

    #[tokio::test]
    async fn test_find_one_none_on_empty_store() {
        let store = store();
        let found = store.find_one(&Filter::by_id(999), &[]).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_count_respects_filter() {
        let store = store();
        store.create(patch("a")).await.unwrap();
        store.create(patch("b")).await.unwrap();
        store.create(patch("a")).await.unwrap();
        let count = store.count(&Filter::new().eq("title", "a")).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_find_all_orders_and_paginates() {
        let store = store();
        for title in ["c", "a", "b", "d"] {
            store.create(patch(title)).await.unwrap();
        }
        let order = vec![("title".to_string(), OrderDirection::Asc)];
        let page = store
            .find_all(&Filter::new(), &order, Pagination::new(1, 2), &[], &[])
            .await
            .unwrap();
        let titles: Vec<&str> = page.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_find_all_ties_break_by_id() {
        let store = store();
        store.create(patch("same")).await.unwrap();
        store.create(patch("same")).await.unwrap();
        let order = vec![("title".to_string(), OrderDirection::Desc)];
        let rows = store
            .find_all(&Filter::new(), &order, Pagination::new(0, 10), &[], &[])
            .await
            .unwrap();
        assert_eq!(rows[0].id(), 1);
        assert_eq!(rows[1].id(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_patch_and_bumps_updated_at() {
        let store = store();
        let created = store.create(patch("before")).await.unwrap();
        let mut change = Patch::new();
        change.insert("pinned".to_string(), json!(true));
        let updated = store
            .update(&Filter::by_id(created.id()), change)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.pinned);
        assert_eq!(updated.title, "before");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_refetches_by_same_filter() {
        let store = store();
        store.create(patch("old")).await.unwrap();
        // Patch moves the row out of the filter, so the re-fetch finds nothing.
        let result = store
            .update(&Filter::new().eq("title", "old"), patch("new"))
            .await
            .unwrap();
        assert!(result.is_none());
        let renamed = store
            .find_one(&Filter::new().eq("title", "new"), &[])
            .await
            .unwrap();
        assert!(renamed.is_some());
    }

    #[tokio::test]
    async fn test_update_no_match_returns_none() {
        let store = store();
        let result = store.update(&Filter::by_id(42), patch("x")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_and_returns_snapshot() {
        let store = store();
        let created = store.create(patch("a")).await.unwrap();
        let removed = store
            .delete(&Filter::by_id(created.id()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed.title, "a");
        assert_eq!(store.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_returns_none() {
        let store = store();
        assert!(store.delete(&Filter::by_id(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_marks_row_in_place() {
        let store = store();
        let created = store.create(patch("a")).await.unwrap();
        let marked = store
            .soft_delete(&Filter::by_id(created.id()))
            .await
            .unwrap()
            .unwrap();
        assert!(marked.deleted_at().is_some());
        // Row still physically present.
        assert_eq!(store.count(&Filter::new()).await.unwrap(), 1);
        // But no longer visible to a deleted-excluding filter.
        let visible = store
            .count(&Filter::new().excluding_deleted())
            .await
            .unwrap();
        assert_eq!(visible, 0);
    }
}
