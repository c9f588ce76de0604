// src/handlers/reviews.rs

use axum::{
    Extension,
    extract::{Path, State},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    extract::{AppJson, new_id, parse_id},
    models::review::{CreateReviewRequest, Review, ReviewWithAuthor, UpdateReviewRequest},
    response::ApiResponse,
    services::{credentials::find_user_by_id, rating},
    utils::{html::clean_html, jwt::Claims},
};

const REVIEW_COLUMNS: &str = "id, product_id, user_id, rating, comment, created_at, updated_at";

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<ReviewWithAuthor>,
    pub count: usize,
}

fn clean_comment(comment: Option<&str>) -> Option<String> {
    comment.map(clean_html).filter(|c| !c.is_empty())
}

async fn ensure_product_exists(pool: &SqlitePool, product_id: &str) -> Result<(), AppError> {
    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!(
            "No product found with id: {}",
            product_id
        ))),
    }
}

/// Loads a review of the product and checks that the caller wrote it.
async fn owned_review(
    pool: &SqlitePool,
    product_id: &str,
    review_id: &str,
    claims: &Claims,
) -> Result<Review, AppError> {
    let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ? AND product_id = ?");
    let review = sqlx::query_as::<_, Review>(&sql)
        .bind(review_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No review found with id: {}", review_id)))?;

    if review.user_id != claims.sub {
        return Err(AppError::AuthError(
            "You are not authorized to modify this review.".to_string(),
        ));
    }

    Ok(review)
}

/// Submits the caller's review of a product. One review per user per product.
pub async fn create_review(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<String>,
    AppJson(payload): AppJson<CreateReviewRequest>,
) -> Result<ApiResponse<Review>, AppError> {
    let product_id = parse_id(&product_id)?;
    payload.validate()?;

    let user = find_user_by_id(&pool, &claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthError("User not found.".to_string()))?;

    ensure_product_exists(&pool, &product_id).await?;

    let already: Option<String> =
        sqlx::query_scalar("SELECT id FROM reviews WHERE product_id = ? AND user_id = ?")
            .bind(&product_id)
            .bind(&user.id)
            .fetch_optional(&pool)
            .await?;
    if already.is_some() {
        return Err(AppError::BadRequest(
            "You have already submitted a review for this product.".to_string(),
        ));
    }

    let now = Utc::now();
    let sql = format!(
        "INSERT INTO reviews (id, product_id, user_id, rating, comment, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING {REVIEW_COLUMNS}"
    );
    let review = sqlx::query_as::<_, Review>(&sql)
        .bind(new_id())
        .bind(&product_id)
        .bind(&user.id)
        .bind(payload.rating)
        .bind(clean_comment(payload.comment.as_deref()))
        .bind(now)
        .bind(now)
        .fetch_one(&pool)
        .await?;

    rating::recompute(&pool, &product_id).await;

    Ok(ApiResponse::created("Review submitted successfully.", review))
}

/// Lists a product's reviews, newest first, with each reviewer's name.
pub async fn list_reviews(
    State(pool): State<SqlitePool>,
    Path(product_id): Path<String>,
) -> Result<ApiResponse<ReviewList>, AppError> {
    let product_id = parse_id(&product_id)?;
    ensure_product_exists(&pool, &product_id).await?;

    let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
        r#"
        SELECT
            r.id, r.product_id, r.user_id, r.rating, r.comment, r.created_at, r.updated_at,
            u.name AS user_name
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.product_id = ?
        ORDER BY r.created_at DESC, r.id ASC
        "#,
    )
    .bind(&product_id)
    .fetch_all(&pool)
    .await?;

    let count = reviews.len();
    Ok(ApiResponse::ok(
        "Reviews fetched successfully.",
        ReviewList { reviews, count },
    ))
}

/// Updates the caller's own review.
pub async fn update_review(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((product_id, review_id)): Path<(String, String)>,
    AppJson(payload): AppJson<UpdateReviewRequest>,
) -> Result<ApiResponse<Review>, AppError> {
    let product_id = parse_id(&product_id)?;
    let review_id = parse_id(&review_id)?;
    payload.validate()?;

    if payload.is_empty() {
        return Err(AppError::BadRequest(
            "No valid fields provided for update.".to_string(),
        ));
    }

    let mut review = owned_review(&pool, &product_id, &review_id, &claims).await?;

    if let Some(rating) = payload.rating {
        review.rating = rating;
    }
    if payload.comment.is_some() {
        review.comment = clean_comment(payload.comment.as_deref());
    }
    review.updated_at = Utc::now();

    sqlx::query("UPDATE reviews SET rating = ?, comment = ?, updated_at = ? WHERE id = ?")
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.updated_at)
        .bind(&review.id)
        .execute(&pool)
        .await?;

    rating::recompute(&pool, &product_id).await;

    Ok(ApiResponse::ok("Review updated successfully.", review))
}

/// Deletes the caller's own review.
pub async fn delete_review(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((product_id, review_id)): Path<(String, String)>,
) -> Result<ApiResponse<Value>, AppError> {
    let product_id = parse_id(&product_id)?;
    let review_id = parse_id(&review_id)?;

    let review = owned_review(&pool, &product_id, &review_id, &claims).await?;

    sqlx::query("DELETE FROM reviews WHERE id = ?")
        .bind(&review.id)
        .execute(&pool)
        .await?;

    rating::recompute(&pool, &product_id).await;

    Ok(ApiResponse::message("Review deleted successfully."))
}
