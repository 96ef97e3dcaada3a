//! Error type shared by the store, services and HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, info, warn};
use serde_json::json;

/// Message shown to agents when the assistant could not produce a reply.
pub const SUGGESTION_FAILED: &str = "Could not generate a suggestion. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("identity provider error: {0}")]
    Identity(String),
    #[error("suggestion failed: {0}")]
    Suggestion(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // already logged where the query failed
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_owned(),
            ),
            AppError::NotFound(msg) => {
                info!("{self}");
                (StatusCode::NOT_FOUND, format!("{msg} not found"))
            }
            AppError::Unauthorized(msg) => {
                warn!("{self}");
                (StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::Forbidden(msg) => {
                warn!("{self}");
                (StatusCode::FORBIDDEN, msg.clone())
            }
            AppError::BadRequest(msg) => {
                warn!("{self}");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Identity(_) => {
                warn!("{self}");
                (
                    StatusCode::UNAUTHORIZED,
                    "Invalid email or password.".to_owned(),
                )
            }
            AppError::Suggestion(_) => {
                error!("{self}");
                (StatusCode::BAD_GATEWAY, SUGGESTION_FAILED.to_owned())
            }
            AppError::Internal(_) => {
                error!("{self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("ticket".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_suggestion_failure_maps_to_bad_gateway() {
        let response = AppError::Suggestion("queue closed".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_forbidden_and_unauthorized_are_distinct() {
        assert_eq!(
            AppError::Forbidden("x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
