//! Wire DTOs for the posts routes

use crud_service::filter::Filter;
use crud_service::query::ListQuery;
use serde::{Deserialize, Serialize};

/// Body of `POST /posts`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostDto {
    /// Post title
    pub title: String,
    /// Post body
    pub content: String,
    /// Author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Whether the post is publicly visible (defaults to true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

/// Body of `PATCH /posts/{id}`; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostDto {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// New visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

/// Query string of `GET /posts`: the shared list surface plus equality
/// filters on `title` and `author`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindPostsQuery {
    /// Page number, 1-indexed
    #[serde(default)]
    pub page: Option<u32>,
    /// Items per page
    #[serde(default)]
    pub limit: Option<u32>,
    /// Exact title to match
    #[serde(default)]
    pub title: Option<String>,
    /// Exact author to match
    #[serde(default)]
    pub author: Option<String>,
    /// Sort tokens, e.g. `createdAt-desc` or `title-asc,viewCount-desc`
    #[serde(default)]
    pub sort: Option<String>,
    /// Lower bound of the creation-date range
    #[serde(default)]
    pub start_date: Option<String>,
    /// Upper bound of the creation-date range
    #[serde(default)]
    pub end_date: Option<String>,
    /// Include soft-deleted posts when true
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

impl FindPostsQuery {
    /// The shared list-query surface of these parameters
    #[must_use]
    pub fn list_query(&self) -> ListQuery {
        ListQuery {
            page: self.page,
            limit: self.limit,
            sort: self.sort.clone().map(Into::into),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            is_deleted: self.is_deleted,
        }
    }

    /// Equality conditions from the entity-specific parameters
    #[must_use]
    pub fn base_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(title) = &self.title {
            filter = filter.eq("title", title.clone());
        }
        if let Some(author) = &self.author {
            filter = filter.eq("author", author.clone());
        }
        filter
    }
}
