//! HTTP error responses.
//!
//! Request-level failures keep the `{success: false, error}` shape the page
//! understands. Only unexpected faults change the status code.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::practice::ErrorResponse;

/// Error reported when the request body is missing or is not JSON.
pub const NO_JSON_DATA: &str = "No JSON data received";

/// An error returned from a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    /// A structured failure reported with HTTP 200.
    pub fn reported(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ErrorResponse::new(message),
        }
    }

    /// An unexpected fault.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse::new(format!("Server error: {}", message.into())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Converts a handler panic into a `Server error` response.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!("Handler panicked: {detail}");
    ApiError::internal(detail).into_response()
}
