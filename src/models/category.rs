// src/models/category.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,

    /// Unique display name.
    pub name: String,

    /// Derived from `name`; the external lookup key.
    pub slug: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The `{id, name, slug}` summary embedded in products.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Category name is required and cannot be more than 50 characters."
    ))]
    pub name: String,

    #[validate(length(max = 500, message = "Description cannot be more than 500 characters."))]
    pub description: Option<String>,
}

/// DTO for updating a category. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Category name cannot be empty or more than 50 characters."
    ))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description cannot be more than 500 characters."))]
    pub description: Option<String>,
}
