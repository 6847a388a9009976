use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::bus::BusError;
use crate::registry::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::Registry(RegistryError::ConstraintViolation(msg)) => {
                (StatusCode::CONFLICT, format!("Constraint violation: {msg}"))
            }
            Self::Registry(RegistryError::NotFound(msg)) | Self::NotFound(msg) => {
                (StatusCode::NOT_FOUND, format!("{msg} not found"))
            }
            Self::Registry(RegistryError::Storage(e)) => {
                tracing::error!("Database error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            Self::Bus(e) => {
                tracing::warn!("Message bus error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("Message broker unavailable: {e}"),
                )
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
