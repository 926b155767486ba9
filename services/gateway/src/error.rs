use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use persistence::PersistenceError;
use serde_json::json;
use thiserror::Error;

/// Central error type for the gateway surface.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            AppError::Persistence(PersistenceError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            AppError::Persistence(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), "PERSISTENCE_ERROR"),
            AppError::InternalError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), "INTERNAL_ERROR"),
        };

        let body = Json(json!({ "error": code, "message": message }));
        (status, body).into_response()
    }
}
