//! Posts API built on the generic CRUD service layer
//!
//! One concrete entity (`Post`) wired through the shared orchestrator: the
//! routes validate parameters and shape DTOs, while pagination, filtering,
//! soft delete, duplicate checks, and the response envelope come from the
//! framework.

pub mod config;
pub mod posts;

use std::sync::Arc;

use axum::{routing::get, Router};
use crud_service::service::CrudService;
use crud_service::store::MemoryStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;

use posts::Post;

/// The orchestrator type serving the posts domain
pub type PostsService = CrudService<Post, MemoryStore<Post>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The posts orchestrator
    pub posts: Arc<PostsService>,
}

impl AppState {
    /// Build application state over a fresh in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self {
            posts: Arc::new(CrudService::new(MemoryStore::new(), posts::ERROR_PREFIX)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check endpoint
///
/// Returns "ok" if the service is running.
async fn health() -> &'static str {
    "ok"
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(posts::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
