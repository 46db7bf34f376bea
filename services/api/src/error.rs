//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service and the
//! rejection type produced by the session validator.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use medichain_core::ports::PortError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// JSON body used for every rejection and plain acknowledgement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a protected request was turned away.
///
/// All variants surface as HTTP 401. The distinction is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized: No token provided")]
    MissingToken,
    #[error("Unauthorized: Invalid token")]
    InvalidToken,
    #[error("Unauthorized: User not found")]
    UserNotFound,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(MessageResponse::new(self.to_string())),
        )
            .into_response()
    }
}

/// Error shape returned by the JSON handlers.
pub type HandlerError = (StatusCode, Json<MessageResponse>);

pub fn reject(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (status, Json(MessageResponse::new(message)))
}
