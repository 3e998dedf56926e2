//! Request body extractors.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::error::RestError;

/// Axum extractor for JSON request bodies.
///
/// Unlike `axum::Json`, failures are reported with the API's own error
/// body (`{"error": "Validation", ...}`), and a missing `Content-Type`
/// header is accepted.
///
/// # Example
///
/// ```rust,ignore
/// use helios_authz_rest::extractors::JsonBody;
///
/// async fn handler(JsonBody(body): JsonBody<serde_json::Value>) {
///     println!("{}", body);
/// }
/// ```
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T> JsonBody<T> {
    /// Consumes the extractor and returns the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Error type for body extraction failures.
#[derive(Debug)]
pub enum JsonBodyRejection {
    /// The body could not be read.
    Unreadable(String),
    /// The body is empty.
    Empty,
    /// The body is not valid JSON for the expected shape.
    InvalidJson(String),
}

impl From<JsonBodyRejection> for RestError {
    fn from(rejection: JsonBodyRejection) -> Self {
        match rejection {
            JsonBodyRejection::Unreadable(msg) => {
                RestError::invalid(format!("Could not read body: {}", msg))
            }
            JsonBodyRejection::Empty => RestError::invalid("Request body is required"),
            JsonBodyRejection::InvalidJson(msg) => {
                RestError::invalid(format!("Invalid JSON: {}", msg))
            }
        }
    }
}

impl IntoResponse for JsonBodyRejection {
    fn into_response(self) -> Response {
        RestError::from(self).into_response()
    }
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = JsonBodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| JsonBodyRejection::Unreadable(e.to_string()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(JsonBodyRejection::Empty);
        }

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| JsonBodyRejection::InvalidJson(e.to_string()))
    }
}
