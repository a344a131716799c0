use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// A JSON body whose decode failures come back as field errors.
///
/// Syntax and content-type problems are reported under `body`. A value that
/// parses as JSON but does not fit `T` is reported under the offending field.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<serde_json::Value>::from_request(req, state).await?;
        serde_path_to_error::deserialize(value)
            .map(JsonBody)
            .map_err(decode_error)
    }
}

fn decode_error(err: serde_path_to_error::Error<serde_json::Error>) -> AppError {
    let message = err.inner().to_string();

    if err.path().iter().next().is_some() {
        return AppError::invalid(&err.path().to_string(), message);
    }

    match missing_field(&message) {
        Some(field) => AppError::invalid(field, format!("The {field} field is required")),
        None => AppError::invalid("body", message),
    }
}

fn missing_field(message: &str) -> Option<&str> {
    message.strip_prefix("missing field `")?.split('`').next()
}
