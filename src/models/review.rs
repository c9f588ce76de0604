// src/models/review.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'reviews' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review joined with the reviewer's display name, used in product review listings.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithAuthor {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: Review,
    pub user_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: i64,

    #[validate(length(max = 500, message = "Comment cannot be more than 500 characters."))]
    pub comment: Option<String>,
}

/// DTO for updating a review. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: Option<i64>,

    #[validate(length(max = 500, message = "Comment cannot be more than 500 characters."))]
    pub comment: Option<String>,
}

impl UpdateReviewRequest {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_must_be_one_to_five() {
        let ok = CreateReviewRequest {
            rating: 5,
            comment: None,
        };
        assert!(ok.validate().is_ok());

        for rating in [0, 6, -1] {
            let bad = CreateReviewRequest {
                rating,
                comment: None,
            };
            assert!(bad.validate().is_err());
        }
    }

    #[test]
    fn long_comments_are_rejected() {
        let update = UpdateReviewRequest {
            rating: None,
            comment: Some("x".repeat(501)),
        };
        assert!(update.validate().is_err());
        assert!(!update.is_empty());
    }
}
