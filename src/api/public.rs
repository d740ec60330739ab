//! Public API types

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;

use crate::core::PipelineError;

// Errors

pub struct ApiError(anyhow::Error);

/// Convert `ApiError` into an Axum compatible response. Pipeline errors
/// keep their status and kind, anything else is a 500 that doesn't
/// leak the cause.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, detail) = match self.0.downcast_ref::<PipelineError>() {
            Some(err) => (err.status(), err.kind(), err.detail()),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                String::from("Something went wrong"),
            ),
        };

        // Always log the error
        if status.is_server_error() {
            tracing::error!("{:#}", self.0);
        } else {
            tracing::warn!("{:#}", self.0);
        }

        (status, Json(json!({"error": kind, "detail": detail}))).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` or `Result<_, PipelineError>` to turn them into
/// `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod auth {
    pub use crate::api::routes::auth::public::*;
}

pub mod email {
    pub use crate::api::routes::email::public::*;
}
