use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum AppError {
    #[error("Invalid query: {0}")]
    InvalidQueryError(String),

    #[error("Generation unavailable: {0}")]
    GenerationUnavailableError(String),

    #[error("Malformed generation output: {0}")]
    MalformedOutputError(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailableError(String),

    #[error("Unknown schema version: {0}")]
    SchemaNotFoundError(u32),
}

impl AppError {
    /// Short label used for failure metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidQueryError(_) => "invalid_query",
            AppError::GenerationUnavailableError(_) => "generation_unavailable",
            AppError::MalformedOutputError(_) => "malformed_output",
            AppError::StorageUnavailableError(_) => "storage_unavailable",
            AppError::SchemaNotFoundError(_) => "schema_not_found",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidQueryError(msg) => {
                tracing::warn!(error = %msg, "Invalid query");
                StatusCode::BAD_REQUEST
            }
            AppError::GenerationUnavailableError(msg) => {
                tracing::warn!(error = %msg, "Generation unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::MalformedOutputError(msg) => {
                tracing::error!(error = %msg, "Generated tool failed validation");
                StatusCode::BAD_GATEWAY
            }
            AppError::StorageUnavailableError(msg) => {
                tracing::error!(error = %msg, "Storage error");
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::SchemaNotFoundError(version) => {
                tracing::error!(version, "Schema version not registered");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::StorageUnavailableError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::GenerationUnavailableError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
