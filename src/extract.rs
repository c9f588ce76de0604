// src/extract.rs

use axum::extract::{FromRequest, FromRequestParts};
use uuid::Uuid;

use crate::error::AppError;

/// `Json` whose rejections are rendered through `AppError` (400 envelope).
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` whose rejections are rendered through `AppError` (400 envelope).
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Normalizes an id taken from a path segment.
/// Anything that is not a UUID cannot name a stored item, so it is reported as 404.
pub fn parse_id(raw: &str) -> Result<String, AppError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| AppError::NotFound(format!("No item found with id: {}", raw)))
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_not_found() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn ids_are_normalized_to_lowercase_hyphenated() {
        let id = new_id();
        assert_eq!(parse_id(&id.to_uppercase()).unwrap(), id);
    }
}
