// Error handling module
// Defines error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API errors that can occur during request processing
#[derive(Error, Debug)]
pub enum ApiError {
    /// Monitor command ran but exited unsuccessfully
    #[error("Command exited with {status}: {message}")]
    CommandFailed { status: String, message: String },

    /// Monitor command could not be started
    #[error("Failed to run command: {0}")]
    CommandSpawn(String),

    /// Offloaded job did not complete
    #[error("Offload failed: {0}")]
    Offload(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Short machine-readable error type
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::CommandFailed { .. } => "command_failed",
            ApiError::CommandSpawn(_) => "command_spawn",
            ApiError::Offload(_) => "offload_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_type = self.error_type();
        let message = match &self {
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                "Internal server error".to_string()
            }
            other => {
                tracing::error!("{}", other);
                other.to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
