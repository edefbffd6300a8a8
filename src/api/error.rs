/// Errors at the HTTP edge
///
/// Every handler returns `ApiError`; the body is always JSON, either
/// `{"detail": ...}` or the field → messages map of a failed validation.
/// Request bodies go through `JsonBody`, so malformed input lands in the
/// same map instead of axum's plain-text rejection.

use crate::catalog::validation::{FieldErrors, WriteError, NON_FIELD_ERRORS, REQUIRED};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found.")]
    NotFound,
    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("validation failed")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::NotAuthenticated | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WriteError> for ApiError {
    fn from(error: WriteError) -> Self {
        match error {
            WriteError::Invalid(errors) => ApiError::Invalid(errors),
            WriteError::NotFound => ApiError::NotFound,
            WriteError::Database(e) => ApiError::Internal(e.into()),
            WriteError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Invalid(errors) => json!(errors),
            ApiError::Internal(e) => {
                tracing::error!("❌ Request failed: {:#}", e);
                json!({ "detail": "Internal server error" })
            }
            other => json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// JSON request body whose rejections become field errors
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::Invalid(rejection_errors(&rejection)))
            }
        }
    }
}

fn rejection_errors(rejection: &JsonRejection) -> FieldErrors {
    let mut errors = FieldErrors::new();
    match rejection {
        JsonRejection::JsonDataError(_) => {
            let (field, message) = split_data_error(&rejection.body_text());
            errors.add(&field, message);
        }
        other => errors.add(NON_FIELD_ERRORS, other.body_text()),
    }
    errors
}

/// Split "<prefix>: <path>: <message>" into the top-level field of the
/// path and the message. Errors without a path (a missing field, a body
/// that is not an object) name the field from the message or fall back to
/// `non_field_errors`.
fn split_data_error(text: &str) -> (String, String) {
    let detail = text.split_once(": ").map_or(text, |(_, rest)| rest);
    if let Some((path, message)) = detail.split_once(": ") {
        if !path.is_empty() && !path.contains(' ') {
            let field = path.split(['.', '[']).next().unwrap_or(path);
            return (field.to_string(), message.to_string());
        }
    }
    let missing = detail
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map(|(field, _)| field.to_string());
    match missing {
        Some(field) => (field, REQUIRED.to_string()),
        None => (NON_FIELD_ERRORS.to_string(), detail.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_errors_map_to_status_codes() {
        let mut errors = FieldErrors::new();
        errors.add("description", "Ensure this field has at least 40 characters.");
        assert_eq!(ApiError::from(WriteError::Invalid(errors)).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(WriteError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(WriteError::Other(anyhow::anyhow!("disk full"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::NotAuthenticated.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn data_errors_name_the_offending_field() {
        let text = "Failed to deserialize the JSON body into the target type: \
                    name: invalid type: integer `5`, expected a string at line 1 column 9";
        assert_eq!(
            split_data_error(text),
            ("name".to_string(), "invalid type: integer `5`, expected a string at line 1 column 9".to_string())
        );

        let text = "Failed to deserialize the JSON body into the target type: \
                    muscles[1]: invalid type: string \"x\", expected i64 at line 1 column 20";
        assert_eq!(split_data_error(text).0, "muscles");
    }

    #[test]
    fn data_errors_without_path_fall_back() {
        let text = "Failed to deserialize the JSON body into the target type: \
                    missing field `setting_id` at line 1 column 2";
        assert_eq!(split_data_error(text), ("setting_id".to_string(), "This field is required.".to_string()));

        let text = "Failed to deserialize the JSON body into the target type: \
                    invalid type: sequence, expected struct ExerciseInput at line 1 column 0";
        assert_eq!(split_data_error(text).0, NON_FIELD_ERRORS);
    }
}
