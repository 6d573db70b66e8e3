//! HTTP handlers for the posts routes
//!
//! Thin wrappers: validate path parameters, convert DTOs to patches, and
//! delegate to the shared orchestrator. Domain failures get the request path
//! attached on the way out so the error envelope carries it.

use axum::{
    extract::{OriginalUri, Path, Query, State},
    routing::get,
    Json, Router,
};
use crud_service::prelude::*;

use super::dto::{CreatePostDto, FindPostsQuery, UpdatePostDto};
use super::entity::Post;
use super::ERROR_PREFIX;
use crate::AppState;

/// Routes for the posts collection
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
}

/// Reject non-positive identifiers before they reach the orchestrator
fn positive_id(id: i64) -> Result<i64> {
    if id >= 1 {
        Ok(id)
    } else {
        Err(ServiceError::bad_request(
            ERROR_PREFIX,
            "The id parameter must be a positive integer.",
        )
        .into())
    }
}

async fn list_posts(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<FindPostsQuery>,
) -> Result<ApiResponse<Page<Post>>> {
    state
        .posts
        .find_all(
            FindAllRequest::new()
                .with_filter(params.base_filter())
                .with_query(params.list_query()),
        )
        .await
        .map_err(|e| e.with_path(uri.path()))
}

async fn get_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Post>> {
    let result = async {
        let id = positive_id(id)?;
        state.posts.find_one(FindOneRequest::by_id(id)).await
    };
    result.await.map_err(|e| e.with_path(uri.path()))
}

async fn create_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Json(dto): Json<CreatePostDto>,
) -> Result<ApiResponse<CreateOutcome<Post>>> {
    let result = async {
        let patch = to_patch(&dto)?;
        let check = Filter::new().eq("title", dto.title.clone());
        state
            .posts
            .create(CreateRequest::new(patch).with_check_fields(check))
            .await
    };
    result.await.map_err(|e| e.with_path(uri.path()))
}

async fn update_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<i64>,
    Json(dto): Json<UpdatePostDto>,
) -> Result<ApiResponse<UpdateOutcome<Post>>> {
    let result = async {
        let id = positive_id(id)?;
        let patch = to_patch(&dto)?;
        state
            .posts
            .update(UpdateRequest::by_id(id).with_update(patch))
            .await
    };
    result.await.map_err(|e| e.with_path(uri.path()))
}

async fn delete_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Post>> {
    let result = async {
        let id = positive_id(id)?;
        state.posts.delete(DeleteRequest::by_id(id)).await
    };
    result.await.map_err(|e| e.with_path(uri.path()))
}
