// src/services/rating.rs

use sqlx::SqlitePool;

use crate::models::product::Ratings;

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Recomputes `rating_average` / `rating_count` for a product from its reviews.
///
/// Never fails the caller: errors (including a product that no longer exists) are logged
/// and `None` is returned.
pub async fn recompute(pool: &SqlitePool, product_id: &str) -> Option<Ratings> {
    let aggregate: Result<(i64, Option<f64>), sqlx::Error> =
        sqlx::query_as("SELECT COUNT(*), AVG(rating) FROM reviews WHERE product_id = ?")
            .bind(product_id)
            .fetch_one(pool)
            .await;

    let (count, average) = match aggregate {
        Ok(row) => row,
        Err(e) => {
            tracing::error!("Failed to aggregate ratings for product {}: {:?}", product_id, e);
            return None;
        }
    };

    let ratings = Ratings {
        average: average.map(round_one_decimal).unwrap_or(0.0),
        count,
    };

    let updated = sqlx::query("UPDATE products SET rating_average = ?, rating_count = ? WHERE id = ?")
        .bind(ratings.average)
        .bind(ratings.count)
        .bind(product_id)
        .execute(pool)
        .await;

    match updated {
        Ok(result) if result.rows_affected() == 0 => {
            tracing::warn!("Rating recompute skipped: product {} not found", product_id);
            None
        }
        Ok(_) => Some(ratings),
        Err(e) => {
            tracing::error!("Failed to store ratings for product {}: {:?}", product_id, e);
            None
        }
    }
}
