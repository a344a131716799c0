use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Field name -> human readable message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("The given data was invalid")]
    Validation(FieldErrors),
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Not found")]
    NotFound,
    #[error("Unreadable request body: {0}")]
    Body(#[from] JsonRejection),
    #[error("Unreadable query string: {0}")]
    Query(#[from] QueryRejection),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AppError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        AppError::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "The given data was invalid", "errors": errors })),
            )
                .into_response(),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Unauthenticated" })),
            )
                .into_response(),
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response()
            }
            AppError::Body(rejection) => {
                rejection_response(rejection.status(), "body", rejection.body_text())
            }
            AppError::Query(rejection) => {
                rejection_response(rejection.status(), "query", rejection.body_text())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                internal_error()
            }
            AppError::Session(e) => {
                tracing::error!("Session error: {e}");
                internal_error()
            }
        }
    }
}

fn rejection_response(status: StatusCode, field: &str, message: String) -> Response {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), message);
    (
        status,
        Json(json!({ "message": "The given data was invalid", "errors": errors })),
    )
        .into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal server error" })),
    )
        .into_response()
}

/// Collects per-field failures so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` for `field` unless that field already failed.
    pub fn check(&mut self, field: &str, message: Option<&str>) -> &mut Self {
        if let Some(message) = message {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.to_string());
        }
        self
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}
