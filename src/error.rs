use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidUrl(String),

    #[error("Only Wikipedia URLs are allowed: {0}")]
    NotWikipedia(String),

    #[error("Failed to fetch data from Wikipedia (network error): {0}")]
    FetchError(String),

    #[error("Wikipedia responded with HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Scraping failed: {0}")]
    ContentNotFound(String),

    #[error("Wikipedia page contains insufficient content ({length} characters)")]
    InsufficientContent { length: usize },

    #[error("AI failed to process content: {0}")]
    GenerationError(String),

    #[error("AI returned malformed output: {0}")]
    MalformedOutput(String),

    #[error("Database error: {0}")]
    StorageError(String),

    #[error("Quiz not found")]
    NotFound(i64),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidUrl(_) | AppError::NotWikipedia(_) => StatusCode::BAD_REQUEST,
            AppError::FetchError(_) | AppError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            AppError::InsufficientContent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ContentNotFound(_)
            | AppError::GenerationError(_)
            | AppError::MalformedOutput(_)
            | AppError::StorageError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(%status, "{}", self);
        } else {
            tracing::warn!(%status, "{}", self);
        }

        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::FetchError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::StorageError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
