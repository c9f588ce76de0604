//! Uniform JSON envelope shared by every success and error response.
//!
//! `{ success, message, data, errors, meta: { timestamp, ...pagination } }`

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

/// Pagination details merged into `meta` on list endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_products: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            total_products: total,
            total_pages,
            current_page: page,
            limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub pagination: Option<Pagination>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            pagination: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub errors: Value,
    pub meta: Meta,
}

impl<T: Serialize> Envelope<T> {
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Successful handler output.
///
/// ```ignore
/// Ok(ApiResponse::created("Category created successfully.", category))
/// ```
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    message: String,
    data: T,
    pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data,
            pagination: None,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiResponse<Value> {
    /// A success response with an empty `data` object.
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(message, json!({}))
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            success: true,
            message: self.message,
            data: self.data,
            errors: json!({}),
            meta: Meta {
                timestamp: Utc::now(),
                pagination: self.pagination,
            },
        };
        envelope.into_response_with(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_pages_up() {
        let p = Pagination::new(21, 2, 10);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
        assert_eq!(Pagination::new(10, 1, 10).total_pages, 1);
    }

    #[test]
    fn meta_flattens_pagination() {
        let meta = Meta {
            timestamp: Utc::now(),
            pagination: Some(Pagination::new(3, 1, 2)),
        };
        let value = serde_json::to_value(meta).unwrap();
        assert!(value["timestamp"].is_string());
        assert_eq!(value["totalProducts"], 3);
        assert_eq!(value["totalPages"], 2);
        assert_eq!(value["currentPage"], 1);
        assert_eq!(value["limit"], 2);

        let bare = serde_json::to_value(Meta::default()).unwrap();
        assert!(bare.get("totalProducts").is_none());
    }
}
