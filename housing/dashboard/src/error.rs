use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use housing_pricing::{InputError, SchemaError};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced to dashboard clients.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Input outside the slider bounds.
    #[error(transparent)]
    Input(#[from] InputError),
    /// Input does not fit the model schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Dataset or artifact could not be loaded.
    #[error("model unavailable: {0}")]
    Unavailable(String),
    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl DashboardError {
    /// HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Input(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Schema(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
