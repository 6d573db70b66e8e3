//! The uniform success envelope returned by every CRUD verb
//!
//! Each verb has exactly one constructor fixing `success = true` plus a
//! verb-specific status code and message; the payload is wrapped verbatim
//! under `data`. Envelopes are built once, immediately before returning to
//! the caller, and never mutated. Failure paths raise a
//! [`ServiceError`](crate::error::ServiceError) instead and never construct
//! a success envelope.
//!
//! # Example
//!
//! ```rust
//! use crud_service::response::{ApiResponse, Page};
//!
//! let response = ApiResponse::find_success(Page {
//!     items: vec!["a", "b"],
//!     count: 2,
//! });
//! assert!(response.success);
//! assert_eq!(response.status_code, 200);
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Payload of a list operation: one page of items plus the total match count
///
/// `count` reflects the same predicate as `items`, so pagination UI can
/// derive total pages from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The rows on this page
    pub items: Vec<T>,
    /// Total rows matching the filter, across all pages
    pub count: u64,
}

/// The uniform success envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// Verb-specific HTTP status
    pub status_code: u16,
    /// Verb-specific human-readable message
    pub message: String,
    /// The operation payload, wrapped verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn success(status: StatusCode, message: &str, data: impl Into<Option<T>>) -> Self {
        Self {
            success: true,
            status_code: status.as_u16(),
            message: message.to_string(),
            data: data.into(),
        }
    }

    /// Envelope for a successful read (200)
    pub fn find_success(data: impl Into<Option<T>>) -> Self {
        Self::success(StatusCode::OK, "Retrieved successfully.", data)
    }

    /// Envelope for a successful create (201)
    pub fn create_success(data: impl Into<Option<T>>) -> Self {
        Self::success(StatusCode::CREATED, "Created successfully.", data)
    }

    /// Envelope for a successful update (200)
    pub fn update_success(data: impl Into<Option<T>>) -> Self {
        Self::success(StatusCode::OK, "Updated successfully.", data)
    }

    /// Envelope for a successful delete (200)
    pub fn delete_success(data: impl Into<Option<T>>) -> Self {
        Self::success(StatusCode::OK, "Deleted successfully.", data)
    }

    /// Map the payload to a new type, keeping the envelope fields
    ///
    /// ```rust
    /// use crud_service::response::ApiResponse;
    ///
    /// let response = ApiResponse::find_success(21).map(|n| n * 2);
    /// assert_eq!(response.data, Some(42));
    /// ```
    pub fn map<U, F>(self, f: F) -> ApiResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ApiResponse {
            success: self.success,
            status_code: self.status_code,
            message: self.message,
            data: self.data.map(f),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(&self)).into_response()
    }
}
