//! Error types for the authorization API.
//!
//! Every error is returned as a JSON body `{"error": <kind>, "message": <text>}`
//! where `kind` is the stable name from [`AuthzError::code`].
//!
//! # Error Mapping
//!
//! | Core Error | HTTP Status |
//! |-----------|-------------|
//! | NotFound, ParentNotFound, TenantNotFound, PermissionNotFound | 404 |
//! | AlreadyExists, TenantMismatch, TenantInUse | 409 |
//! | SelfParent, CircularReference, Validation | 400 |
//! | CorruptHierarchy, Backend | 500 |

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helios_authz::AuthzError;
use helios_authz::error::{BackendError, HierarchyError};
use tracing::error;

/// The primary error type for REST API operations.
#[derive(Debug)]
pub enum RestError {
    /// A referenced entity does not exist (HTTP 404).
    NotFound {
        /// Stable error kind.
        code: &'static str,
        /// Error message.
        message: String,
    },

    /// The request conflicts with current state (HTTP 409).
    Conflict {
        /// Stable error kind.
        code: &'static str,
        /// Error message.
        message: String,
    },

    /// The request is invalid (HTTP 400).
    BadRequest {
        /// Stable error kind.
        code: &'static str,
        /// Error message.
        message: String,
    },

    /// The store is not reachable (HTTP 503).
    ServiceUnavailable {
        /// Error message.
        message: String,
    },

    /// Internal server error (HTTP 500).
    InternalError {
        /// Stable error kind.
        code: &'static str,
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// A 400 for malformed request input.
    pub fn invalid(message: impl Into<String>) -> Self {
        RestError::BadRequest {
            code: "Validation",
            message: message.into(),
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            RestError::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, *code, message.as_str())
            }
            RestError::Conflict { code, message } => {
                (StatusCode::CONFLICT, *code, message.as_str())
            }
            RestError::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, *code, message.as_str())
            }
            RestError::ServiceUnavailable { message } => {
                (StatusCode::SERVICE_UNAVAILABLE, "Unavailable", message.as_str())
            }
            RestError::InternalError { code, message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, *code, message.as_str())
            }
        }
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_, code, message) = self.parts();
        write!(f, "{}: {}", code, message)
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = serde_json::json!({
            "error": code,
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

impl From<AuthzError> for RestError {
    fn from(err: AuthzError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match &err {
            AuthzError::Hierarchy(e) => match e {
                HierarchyError::NotFound { .. }
                | HierarchyError::ParentNotFound { .. }
                | HierarchyError::TenantNotFound { .. } => RestError::NotFound { code, message },
                HierarchyError::AlreadyExists { .. }
                | HierarchyError::TenantMismatch { .. }
                | HierarchyError::TenantInUse { .. } => RestError::Conflict { code, message },
                HierarchyError::SelfParent { .. } | HierarchyError::CircularReference { .. } => {
                    RestError::BadRequest { code, message }
                }
                HierarchyError::CorruptHierarchy { .. } => {
                    error!(error = %err, "Request hit a corrupt hierarchy");
                    RestError::InternalError { code, message }
                }
            },
            AuthzError::Permission(_) => RestError::NotFound { code, message },
            AuthzError::Validation(_) => RestError::BadRequest { code, message },
            AuthzError::Backend(BackendError::Unavailable { .. })
            | AuthzError::Backend(BackendError::ConnectionFailed { .. })
            | AuthzError::Backend(BackendError::PoolExhausted { .. }) => {
                RestError::ServiceUnavailable { message }
            }
            AuthzError::Backend(_) => {
                error!(error = %err, "Backend error");
                RestError::InternalError { code, message }
            }
        }
    }
}

/// Result type for REST handlers.
pub type RestResult<T> = Result<T, RestError>;
