use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::FilmId;

/// Errors raised by the similarity engine itself
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Similarity is undefined for fewer than two films; callers skip the cycle
    #[error("Insufficient corpus: {found} film(s), at least 2 required")]
    InsufficientCorpus { found: usize },
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown film ids in selection: {0:?}")]
    InvalidSelection(Vec<FilmId>),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidSelection(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Engine(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Cache(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_corpus_message() {
        let err = EngineError::InsufficientCorpus { found: 1 };
        assert_eq!(
            err.to_string(),
            "Insufficient corpus: 1 film(s), at least 2 required"
        );
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (AppError::NotFound("film 9".into()), StatusCode::NOT_FOUND),
            (AppError::InvalidInput("limit".into()), StatusCode::BAD_REQUEST),
            (
                AppError::InvalidSelection(vec![FilmId(404)]),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Engine(EngineError::InsufficientCorpus { found: 0 }),
                StatusCode::CONFLICT,
            ),
            (AppError::ExternalApi("tmdb".into()), StatusCode::BAD_GATEWAY),
            (
                AppError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
