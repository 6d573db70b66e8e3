//! Entity contract for CRUD-managed domain records
//!
//! Every type managed by the generic service layer implements [`Entity`]:
//! a serializable record with an integer identifier and the three lifecycle
//! timestamps the storage layer maintains on its behalf.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Serialized name of the identifier field
pub const ID_FIELD: &str = "id";

/// Serialized name of the creation timestamp field
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Serialized name of the last-modification timestamp field
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Serialized name of the soft-delete timestamp field
pub const DELETED_AT_FIELD: &str = "deletedAt";

/// A persisted domain record with an identifier and lifecycle timestamps
///
/// The storage layer owns the lifecycle fields: `id` and `createdAt` are
/// assigned once on create, `updatedAt` is bumped on every mutation, and
/// `deletedAt` is set by soft delete. A record whose `deletedAt` is non-null
/// is excluded from lookups unless the caller explicitly asks for deleted
/// records.
///
/// Entities must serialize with camelCase field names so the reserved
/// lifecycle fields line up with [`CREATED_AT_FIELD`] and friends.
///
/// # Example
///
/// ```rust
/// use chrono::{DateTime, Utc};
/// use crud_service::entity::Entity;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Note {
///     id: i64,
///     body: String,
///     created_at: DateTime<Utc>,
///     updated_at: DateTime<Utc>,
///     deleted_at: Option<DateTime<Utc>>,
/// }
///
/// impl Entity for Note {
///     fn id(&self) -> i64 {
///         self.id
///     }
///     fn created_at(&self) -> DateTime<Utc> {
///         self.created_at
///     }
///     fn updated_at(&self) -> DateTime<Utc> {
///         self.updated_at
///     }
///     fn deleted_at(&self) -> Option<DateTime<Utc>> {
///         self.deleted_at
///     }
/// }
/// ```
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The unique identifier assigned at creation
    fn id(&self) -> i64;

    /// When the record was created
    fn created_at(&self) -> DateTime<Utc>;

    /// When the record was last mutated
    fn updated_at(&self) -> DateTime<Utc>;

    /// When the record was soft-deleted, if it has been
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    /// Whether the record is logically deleted
    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}
