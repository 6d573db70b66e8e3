//! The post entity

use chrono::{DateTime, Utc};
use crud_service::entity::Entity;
use serde::{Deserialize, Serialize};

/// A published (or draft) post
///
/// Lifecycle fields are owned by the storage layer; everything else comes
/// from the create and update DTOs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Identifier assigned at creation
    pub id: i64,
    /// Post title
    pub title: String,
    /// Post body
    pub content: String,
    /// Author display name
    #[serde(default)]
    pub author: Option<String>,
    /// Number of views
    #[serde(default)]
    pub view_count: u64,
    /// Whether the post is publicly visible
    #[serde(default = "default_published")]
    pub is_published: bool,
    /// When the post was created
    pub created_at: DateTime<Utc>,
    /// When the post was last mutated
    pub updated_at: DateTime<Utc>,
    /// When the post was soft-deleted, if it has been
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

fn default_published() -> bool {
    true
}

impl Entity for Post {
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
