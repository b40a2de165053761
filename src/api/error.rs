use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::permissions::MisconfiguredPermission;
use crate::services::storage::StorageError;
use crate::services::validation::FieldErrors;

#[derive(Error, Debug)]
pub enum AppError {
    /// Aggregated field errors; every violated constraint in one response.
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("unknown upload profile `{0}`")]
    UnknownProfile(String),

    /// Missing entities, missing fields and denied access all collapse here,
    /// so clients cannot probe for the existence of protected entities.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    MisconfiguredPermission(#[from] MisconfiguredPermission),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!(errors))).into_response()
            }
            AppError::UnknownProfile(name) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"config": [format!("\"{name}\" is not a valid choice.")]})),
            )
                .into_response(),
            AppError::NotFound | AppError::Storage(StorageError::NotFound { .. }) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Not found."})),
            )
                .into_response(),
            AppError::Storage(e) => {
                tracing::error!("Storage backend error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal Server Error"})),
                )
                    .into_response()
            }
            AppError::MisconfiguredPermission(e) => {
                tracing::error!("Permission misconfiguration: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal Server Error"})),
                )
                    .into_response()
            }
        }
    }
}
