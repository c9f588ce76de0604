// src/error.rs

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::response::Envelope;

/// A single field-level validation failure, reported in the `errors` array.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    // 400 Bad Request
    #[error("{0}")]
    BadRequest(String),

    // 400 Bad Request, with per-field details
    #[error("Validation failed.")]
    Validation(Vec<FieldError>),

    // 401 Unauthorized
    #[error("{0}")]
    AuthError(String),

    // 403 Forbidden
    #[error("{0}")]
    Forbidden(String),

    // 404 Not Found
    #[error("{0}")]
    NotFound(String),

    // 409 Conflict
    #[error("{0}")]
    Conflict(String),

    // 503 Service Unavailable
    #[error("{0}")]
    ServiceUnavailable(String),

    // 500 Internal Server Error
    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a field-level failure that is detected by hand rather than by `validator`.
    pub fn field(path: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError {
            path: path.into(),
            message: message.into(),
        }])
    }
}

/// Converts the error into the standard envelope with `success: false`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, errors) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    "Something went wrong! Please try again later.".to_string(),
                    json!({}),
                )
            }
            AppError::Validation(fields) => ("Validation failed.".to_string(), json!(fields)),
            other => (other.to_string(), json!({})),
        };

        let envelope = Envelope {
            success: false,
            message,
            data: json!({}),
            errors,
            meta: Default::default(),
        };

        envelope.into_response_with(status)
    }
}

/// Normalizes datastore failures.
/// Unique-index violations name the offending column; missing rows become 404.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("No item found.".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let field = unique_violation_field(db_err.message());
                AppError::BadRequest(format!(
                    "A record with this {} already exists. Please use a different {}.",
                    field, field
                ))
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest("Referenced item does not exist.".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                AppError::BadRequest(format!("Invalid value: {}", db_err.message()))
            }
            _ => AppError::InternalServerError(err.to_string()),
        }
    }
}

/// Extracts the column from SQLite's `UNIQUE constraint failed: table.a, table.b` message.
/// Composite keys report their last column, which is the user-facing one in every index we have.
fn unique_violation_field(message: &str) -> String {
    message
        .rsplit(':')
        .next()
        .and_then(|cols| cols.split(',').next_back())
        .map(|col| col.trim())
        .map(|col| col.rsplit('.').next().unwrap_or(col))
        .filter(|col| !col.is_empty())
        .unwrap_or("value")
        .to_string()
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_errors(None, &errors, &mut fields);
        AppError::Validation(fields)
    }
}

fn collect_field_errors(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}.", path));
                    out.push(FieldError {
                        path: path.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(Some(&path), inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    let indexed = format!("{}[{}]", path, index);
                    collect_field_errors(Some(&indexed), inner, out);
                }
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::NotFound(rejection.body_text())
    }
}
