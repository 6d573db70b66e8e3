//! Domain error taxonomy and factory
//!
//! A closed set of failure kinds, each with a fixed HTTP status and a stable
//! machine-readable suffix. Every domain module supplies its own prefix, so
//! two entities both raising a not-found condition still produce
//! distinguishable, greppable codes (`POSTS_NOT_FOUND` vs `USERS_NOT_FOUND`).
//!
//! # Example
//!
//! ```rust
//! use crud_service::error::{ErrorKind, ServiceError};
//!
//! let error = ServiceError::not_found("POSTS", "No entity matched the given filter.");
//! assert_eq!(error.error_code, "POSTS_NOT_FOUND");
//! assert_eq!(error.kind, ErrorKind::NotFound);
//! assert_eq!(error.status_code().as_u16(), 404);
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::StoreError;

/// Category of domain failure
///
/// The set is closed: orchestrator flows only raise the first three and
/// `InternalServerError`; `Unauthorized` and `Forbidden` are reserved for
/// collaborators that carry auth logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No entity matched the given target
    NotFound,
    /// An entity matching the duplicate-check fields already exists
    Duplicate,
    /// The request was malformed (e.g. no target given)
    BadRequest,
    /// Authentication required
    Unauthorized,
    /// Access denied
    Forbidden,
    /// Unexpected failure, rewrapped with the original message
    InternalServerError,
}

impl ErrorKind {
    /// The HTTP status code for this kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The stable code suffix for this kind
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Duplicate => "DUPLICATE",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::InternalServerError => write!(f, "internal_server_error"),
        }
    }
}

/// A typed domain failure with a stable machine-readable code
///
/// Created at the point of failure detection and propagated unchanged to the
/// transport layer; never retried, mutated, or double-wrapped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error_code}: {message}")]
pub struct ServiceError {
    /// The failure category
    pub kind: ErrorKind,
    /// `<PREFIX>_<KIND_SUFFIX>`
    pub error_code: String,
    /// Human-readable message, often embedding the offending filter
    pub message: String,
    /// When the failure was detected
    pub timestamp: DateTime<Utc>,
    /// Request path, attached by the transport layer
    pub path: Option<String>,
}

impl ServiceError {
    /// Create a domain error of the given kind
    ///
    /// ```rust
    /// use crud_service::error::{ErrorKind, ServiceError};
    ///
    /// let error = ServiceError::new(ErrorKind::Duplicate, "POSTS", "Duplicate data");
    /// assert_eq!(error.error_code, "POSTS_DUPLICATE");
    /// ```
    pub fn new(kind: ErrorKind, prefix: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            error_code: format!("{}_{}", prefix.as_ref(), kind.suffix()),
            message: message.into(),
            timestamp: Utc::now(),
            path: None,
        }
    }

    /// A not-found failure (404)
    pub fn not_found(prefix: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, prefix, message)
    }

    /// A duplicate failure (409)
    pub fn duplicate(prefix: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Duplicate, prefix, message)
    }

    /// A bad-request failure (400)
    pub fn bad_request(prefix: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, prefix, message)
    }

    /// An unauthorized failure (401)
    pub fn unauthorized(prefix: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, prefix, message)
    }

    /// A forbidden failure (403)
    pub fn forbidden(prefix: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, prefix, message)
    }

    /// An internal failure (500) carrying the original message
    pub fn internal(prefix: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServerError, prefix, message)
    }

    /// The HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Attach the request path for the error envelope
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Wire form of the error envelope
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    success: bool,
    status_code: u16,
    error_code: &'a str,
    message: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            success: false,
            status_code: status.as_u16(),
            error_code: &self.error_code,
            message: &self.message,
            timestamp: self.timestamp,
            path: self.path.as_deref(),
        };
        (status, Json(&body)).into_response()
    }
}

/// Any failure an orchestrator call can surface
///
/// Domain failures carry a stable code for the transport error handler;
/// storage failures from the find and delete paths propagate unwrapped (the
/// create and update paths rewrap them as
/// [`ServiceError::internal`] before they reach this level).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A typed domain failure
    #[error(transparent)]
    Domain(#[from] ServiceError),

    /// An opaque storage-layer failure
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Error {
    /// The domain failure, if this is one
    #[must_use]
    pub fn as_domain(&self) -> Option<&ServiceError> {
        match self {
            Self::Domain(e) => Some(e),
            Self::Storage(_) => None,
        }
    }

    /// Attach the request path to a domain failure; storage failures are
    /// left untouched
    #[must_use]
    pub fn with_path(self, path: impl Into<String>) -> Self {
        match self {
            Self::Domain(e) => Self::Domain(e.with_path(path)),
            storage => storage,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::Domain(e) => e.into_response(),
            Self::Storage(e) => {
                tracing::error!(error = %e, "storage failure reached the transport layer");
                let body = ErrorBody {
                    success: false,
                    status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    error_code: "STORAGE_ERROR",
                    message: "An internal storage failure occurred.",
                    timestamp: Utc::now(),
                    path: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(&body)).into_response()
            }
        }
    }
}

/// Result alias for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;
