// src/handlers/categories.rs

use axum::extract::{Path, State};
use chrono::Utc;
use serde_json::Value;
use sqlx::{Sqlite, SqliteExecutor, SqlitePool, Transaction, types::Json};
use validator::Validate;

use crate::{
    error::AppError,
    extract::{AppJson, new_id},
    models::{
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest},
        product::{ProductType, Style},
    },
    response::ApiResponse,
    services::identity::derive_title,
    utils::{html::clean_html, slug::slugify},
};

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

pub async fn find_by_slug<'e, E>(executor: E, slug: &str) -> Result<Category, AppError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = ?");
    sqlx::query_as::<_, Category>(&sql)
        .bind(slug.to_lowercase())
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No category found with slug: {}", slug)))
}

/// Resolves the category a product refers to, by id or by slug.
pub async fn find_by_reference<'e, E>(executor: E, reference: &str) -> Result<Category, AppError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ? OR slug = ?");
    sqlx::query_as::<_, Category>(&sql)
        .bind(reference.trim().to_lowercase())
        .bind(reference.trim().to_lowercase())
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No category found with id: {}", reference)))
}

/// Slug for a new or renamed category. Names without any letters or digits are rejected.
fn slug_for(name: &str) -> Result<String, AppError> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(AppError::field(
            "name",
            "Category name must contain letters or numbers.",
        ));
    }
    Ok(slug)
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description.map(clean_html).filter(|d| !d.is_empty())
}

/// Lists every category, alphabetically.
pub async fn list_categories(
    State(pool): State<SqlitePool>,
) -> Result<ApiResponse<Vec<Category>>, AppError> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC");
    let categories = sqlx::query_as::<_, Category>(&sql).fetch_all(&pool).await?;

    Ok(ApiResponse::ok("Categories fetched successfully.", categories))
}

pub async fn get_category(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<Category>, AppError> {
    let category = find_by_slug(&pool, &slug).await?;
    Ok(ApiResponse::ok("Category fetched successfully.", category))
}

/// Creates a category. The slug is derived from the name.
/// Admin only.
pub async fn create_category(
    State(pool): State<SqlitePool>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<ApiResponse<Category>, AppError> {
    payload.validate()?;

    let name = payload.name.trim();
    let slug = slug_for(name)?;
    let now = Utc::now();

    let sql = format!(
        "INSERT INTO categories (id, name, slug, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING {CATEGORY_COLUMNS}"
    );
    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(new_id())
        .bind(name)
        .bind(&slug)
        .bind(clean_description(payload.description.as_deref()))
        .bind(now)
        .bind(now)
        .fetch_one(&pool)
        .await?;

    tracing::info!("Created category {} ({})", category.name, category.slug);

    Ok(ApiResponse::created("Category created successfully.", category))
}

async fn retitle_products(
    tx: &mut Transaction<'_, Sqlite>,
    category: &Category,
) -> Result<usize, AppError> {
    let products: Vec<(String, ProductType, Json<Style>)> =
        sqlx::query_as("SELECT id, product_type, style FROM products WHERE category_id = ?")
            .bind(&category.id)
            .fetch_all(&mut **tx)
            .await?;

    for (id, product_type, style) in &products {
        sqlx::query("UPDATE products SET title = ?, updated_at = ? WHERE id = ?")
            .bind(derive_title(*product_type, &style.0, &category.name))
            .bind(category.updated_at)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(products.len())
}

/// Renames and/or re-describes a category. Renaming regenerates the slug.
/// Admin only.
pub async fn update_category(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
    AppJson(payload): AppJson<UpdateCategoryRequest>,
) -> Result<ApiResponse<Category>, AppError> {
    payload.validate()?;

    if payload.name.is_none() && payload.description.is_none() {
        return Err(AppError::BadRequest(
            "No valid fields provided for update.".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let mut category = find_by_slug(&mut *tx, &slug).await?;
    let previous_name = category.name.clone();

    if let Some(name) = &payload.name {
        category.name = name.trim().to_string();
        category.slug = slug_for(&category.name)?;
    }
    if payload.description.is_some() {
        category.description = clean_description(payload.description.as_deref());
    }
    category.updated_at = Utc::now();

    sqlx::query(
        "UPDATE categories SET name = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(category.updated_at)
    .bind(&category.id)
    .execute(&mut *tx)
    .await?;

    // Product titles embed the category name
    if category.name != previous_name {
        let renamed = retitle_products(&mut tx, &category).await?;
        tracing::info!(
            "Re-derived {} product title(s) for category {}",
            renamed,
            category.slug
        );
    }

    tx.commit().await?;

    Ok(ApiResponse::ok("Category updated successfully.", category))
}

/// Deletes a category that no product references.
/// Admin only.
pub async fn delete_category(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let category = find_by_slug(&pool, &slug).await?;

    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?")
        .bind(&category.id)
        .fetch_one(&pool)
        .await?;

    if in_use > 0 {
        return Err(AppError::BadRequest(format!(
            "Cannot delete category '{}': {} product(s) still belong to it.",
            category.name, in_use
        )));
    }

    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(&category.id)
        .execute(&pool)
        .await?;

    tracing::info!("Deleted category {}", category.slug);

    Ok(ApiResponse::message("Category deleted successfully."))
}
