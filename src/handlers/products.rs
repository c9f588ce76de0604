// src/handlers/products.rs

use std::collections::HashSet;

use axum::extract::{Path, State};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool, types::Json};
use validator::Validate;

use crate::{
    error::{AppError, FieldError},
    extract::{AppJson, AppQuery, new_id, parse_id},
    handlers::categories::find_by_reference,
    models::product::{
        AddSizeRequest, CreateProductRequest, Image, PRODUCT_SELECT, ProductListParams,
        ProductResponse, ProductRow, Size, UpdateProductRequest, UpdateStockRequest, Variant,
        VariantInput, normalize_color,
    },
    response::{ApiResponse, Pagination},
    services::identity::{Candidate, derive_title, find_duplicate, merge_style, sanitize_style},
    utils::html::clean_html,
};

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<ProductResponse>,
    pub count: usize,
}

async fn fetch_product<'e, E>(executor: E, id: &str) -> Result<Option<ProductRow>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{PRODUCT_SELECT} WHERE p.id = ?");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

fn product_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("No product found with id: {}", id))
}

/// Translates `sort=price,-createdAt` into an ORDER BY list over known columns only.
fn sort_clause(raw: Option<&str>) -> Result<String, AppError> {
    let mut columns = Vec::new();

    for field in raw.unwrap_or_default().split(',').map(str::trim) {
        if field.is_empty() {
            continue;
        }

        let (name, direction) = match field.strip_prefix('-') {
            Some(name) => (name, "DESC"),
            None => (field, "ASC"),
        };

        let column = match name {
            "price" => "p.price",
            "discount" => "p.discount",
            "createdAt" => "p.created_at",
            "title" => "p.title",
            "rating" => "p.rating_average",
            other => {
                return Err(AppError::BadRequest(format!(
                    "Invalid sort field: {}. Allowed fields are price, discount, createdAt, title, rating.",
                    other
                )));
            }
        };

        columns.push(format!("{} {}", column, direction));
    }

    if columns.is_empty() {
        columns.push("p.created_at DESC".to_string());
    }
    columns.push("p.id ASC".to_string());

    Ok(columns.join(", "))
}

/// Appends the WHERE clause shared by the count and page queries.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, params: &ProductListParams) {
    qb.push(" WHERE p.is_active = 1");

    if let Some(search) = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let needle = search.to_lowercase();
        qb.push(" AND (instr(lower(p.title), ")
            .push_bind(needle.clone())
            .push(") > 0 OR instr(lower(p.description), ")
            .push_bind(needle)
            .push(") > 0)");
    }

    if let Some(gender) = params.gender {
        qb.push(" AND p.gender = ").push_bind(gender);
    }

    if let Some(category) = params
        .category
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        qb.push(" AND c.slug = ").push_bind(category.to_lowercase());
    }

    if let Some(min) = params.price_gte {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = params.price_lte {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(min) = params.discount_gte {
        qb.push(" AND p.discount >= ").push_bind(min);
    }
}

/// Colours are unique within a product and size labels unique within a variant.
fn ensure_unique_variants(variants: &[Variant]) -> Result<(), AppError> {
    let mut colors = HashSet::new();
    let mut errors = Vec::new();

    for (index, variant) in variants.iter().enumerate() {
        if !colors.insert(variant.color.as_str()) {
            errors.push(FieldError {
                path: format!("variants[{}].color", index),
                message: format!("Duplicate variant color '{}'.", variant.color),
            });
        }

        let mut sizes = HashSet::new();
        for size in &variant.sizes {
            if !sizes.insert(size.size.to_string().to_uppercase()) {
                errors.push(FieldError {
                    path: format!("variants[{}].sizes", index),
                    message: format!("Duplicate size '{}' in variant '{}'.", size.size, variant.color),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn validate_images(images: &[Image]) -> Result<(), AppError> {
    let mut fields = Vec::new();

    for (index, image) in images.iter().enumerate() {
        if let Err(errors) = image.validate() {
            if let AppError::Validation(inner) = AppError::from(errors) {
                fields.extend(inner.into_iter().map(|field| FieldError {
                    path: format!("images[{}].{}", index, field.path),
                    message: field.message,
                }));
            }
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(fields))
    }
}

fn clean_description(raw: &str) -> Result<String, AppError> {
    let description = clean_html(raw);
    if description.is_empty() {
        return Err(AppError::field("description", "Description is required."));
    }
    Ok(description)
}

async fn save_variants<'e, E>(executor: E, id: &str, variants: Vec<Variant>) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE products SET variants = ?, updated_at = ? WHERE id = ?")
        .bind(Json(variants))
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Lists active products with search, filters, sorting and pagination.
pub async fn list_products(
    State(pool): State<SqlitePool>,
    AppQuery(params): AppQuery<ProductListParams>,
) -> Result<ApiResponse<ProductList>, AppError> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::BadRequest(
            "Page must be a positive integer.".to_string(),
        ));
    }

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "Limit must be between 1 and {}.",
            MAX_LIMIT
        )));
    }

    let order_by = sort_clause(params.sort.as_deref())?;

    // 1. Total for pagination
    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT COUNT(*) FROM products p JOIN categories c ON c.id = p.category_id",
    );
    push_filters(&mut count_qb, &params);
    let total = count_qb
        .build_query_scalar::<i64>()
        .fetch_one(&pool)
        .await?;

    // 2. Requested page
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(PRODUCT_SELECT);
    push_filters(&mut qb, &params);
    qb.push(format!(" ORDER BY {}", order_by));
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind((page - 1) * limit);

    let rows = qb.build_query_as::<ProductRow>().fetch_all(&pool).await?;
    let products: Vec<ProductResponse> = rows.into_iter().map(ProductResponse::from).collect();
    let count = products.len();

    Ok(
        ApiResponse::ok("Products fetched successfully.", ProductList { products, count })
            .with_pagination(Pagination::new(total, page, limit)),
    )
}

/// Returns an active product. Inactive products are reported as missing.
pub async fn get_product(
    State(pool): State<SqlitePool>,
    Path(product_id): Path<String>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    let id = parse_id(&product_id)?;

    let row = fetch_product(&pool, &id)
        .await?
        .filter(|row| row.is_active)
        .ok_or_else(|| product_not_found(&id))?;

    Ok(ApiResponse::ok("Product fetched successfully.", row.into()))
}

/// Creates a product after checking that no product with the same identity exists.
/// Admin only.
pub async fn create_product(
    State(pool): State<SqlitePool>,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    payload.validate()?;

    let style = sanitize_style(payload.product_type, &payload.style);
    let variants: Vec<Variant> = payload
        .variants
        .into_iter()
        .map(VariantInput::into_variant)
        .collect();
    ensure_unique_variants(&variants)?;
    let description = clean_description(&payload.description)?;

    let mut tx = pool.begin().await?;

    let category = find_by_reference(&mut *tx, &payload.category).await?;

    let candidate = Candidate {
        product_type: payload.product_type,
        category_id: &category.id,
        gender: payload.gender,
        style: &style,
    };
    if let Some(existing) = find_duplicate(&mut *tx, &candidate, None).await? {
        return Err(AppError::BadRequest(format!(
            "This product already exists with the id: {}",
            existing
        )));
    }

    let id = new_id();
    let title = derive_title(payload.product_type, &style, &category.name);
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO products (
            id, product_type, title, price, discount, description, gender, category_id,
            is_active, images, style, variants, rating_average, rating_count, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(payload.product_type)
    .bind(&title)
    .bind(payload.price)
    .bind(payload.discount.unwrap_or(0.0))
    .bind(&description)
    .bind(payload.gender)
    .bind(&category.id)
    .bind(payload.is_active.unwrap_or(true))
    .bind(Json(payload.images))
    .bind(Json(style))
    .bind(Json(variants))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;

    tx.commit().await?;

    tracing::info!("Created product {} ({})", id, title);

    Ok(ApiResponse::created("Product created successfully.", row.into()))
}

/// Partially updates a product. The product type never changes; identity changes are
/// re-checked for duplicates and re-derive the title.
/// Admin only.
pub async fn update_product(
    State(pool): State<SqlitePool>,
    Path(product_id): Path<String>,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    let id = parse_id(&product_id)?;
    payload.validate()?;
    if let Some(images) = &payload.images {
        validate_images(images)?;
    }

    let mut tx = pool.begin().await?;

    let mut row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;

    // 1. Merge style; only keys valid for the product type count
    let (style, style_touched) = match &payload.style {
        Some(patch) => merge_style(row.product_type, &row.style.0, patch),
        None => (row.style.0.clone(), false),
    };

    let has_top_level = payload.price.is_some()
        || payload.discount.is_some()
        || payload.description.is_some()
        || payload.gender.is_some()
        || payload.category.is_some()
        || payload.is_active.is_some()
        || payload.images.is_some();

    if !has_top_level && !style_touched {
        return Err(AppError::BadRequest(
            "No valid fields provided for update.".to_string(),
        ));
    }

    // 2. Apply scalar fields
    let mut category_changed = false;
    if let Some(reference) = &payload.category {
        let category = find_by_reference(&mut *tx, reference).await?;
        category_changed = category.id != row.category_id;
        row.category_id = category.id;
        row.category_name = category.name;
        row.category_slug = category.slug;
    }

    let gender_changed = payload.gender.is_some_and(|gender| gender != row.gender);
    if let Some(gender) = payload.gender {
        row.gender = gender;
    }
    if let Some(price) = payload.price {
        row.price = price;
    }
    if let Some(discount) = payload.discount {
        row.discount = discount;
    }
    if let Some(description) = &payload.description {
        row.description = clean_description(description)?;
    }
    if let Some(is_active) = payload.is_active {
        row.is_active = is_active;
    }
    if let Some(images) = payload.images {
        row.images = Json(images);
    }

    // 3. Identity checks
    if category_changed || gender_changed || style_touched {
        let candidate = Candidate {
            product_type: row.product_type,
            category_id: &row.category_id,
            gender: row.gender,
            style: &style,
        };
        if let Some(existing) = find_duplicate(&mut *tx, &candidate, Some(&id)).await? {
            return Err(AppError::BadRequest(format!(
                "Update would create a duplicate product (id: {}).",
                existing
            )));
        }
    }

    if category_changed || style_touched {
        row.title = derive_title(row.product_type, &style, &row.category_name);
    }
    row.style = Json(style);

    // 4. Persist
    sqlx::query(
        r#"
        UPDATE products
        SET title = ?, price = ?, discount = ?, description = ?, gender = ?, category_id = ?,
            is_active = ?, images = ?, style = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&row.title)
    .bind(row.price)
    .bind(row.discount)
    .bind(&row.description)
    .bind(row.gender)
    .bind(&row.category_id)
    .bind(row.is_active)
    .bind(&row.images)
    .bind(&row.style)
    .bind(Utc::now())
    .bind(&id)
    .execute(&mut *tx)
    .await?;

    let row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;

    tx.commit().await?;

    Ok(ApiResponse::ok("Product updated successfully.", row.into()))
}

/// Deletes a product together with its reviews.
/// Admin only.
pub async fn delete_product(
    State(pool): State<SqlitePool>,
    Path(product_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let id = parse_id(&product_id)?;

    let mut tx = pool.begin().await?;

    let reviews = sqlx::query("DELETE FROM reviews WHERE product_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let deleted = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(product_not_found(&id));
    }

    tx.commit().await?;

    tracing::info!("Deleted product {} and {} review(s)", id, reviews);

    Ok(ApiResponse::message(
        "Product and associated reviews deleted successfully.",
    ))
}

/// Adds a colour variant to a product.
/// Admin only.
pub async fn add_variant(
    State(pool): State<SqlitePool>,
    Path(product_id): Path<String>,
    AppJson(payload): AppJson<VariantInput>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    let id = parse_id(&product_id)?;
    payload.validate()?;

    let variant = payload.into_variant();
    ensure_unique_variants(std::slice::from_ref(&variant))?;

    let mut tx = pool.begin().await?;

    let row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;

    let mut variants = row.variants.0;
    if variants.iter().any(|v| v.color == variant.color) {
        return Err(AppError::BadRequest(format!(
            "A variant with the color '{}' already exists for this product.",
            variant.color
        )));
    }
    variants.push(variant);

    save_variants(&mut *tx, &id, variants).await?;

    let row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;
    tx.commit().await?;

    Ok(ApiResponse::created("Variant added successfully.", row.into()))
}

/// Adds a size to an existing colour variant.
/// Admin only.
pub async fn add_variant_size(
    State(pool): State<SqlitePool>,
    Path((product_id, color)): Path<(String, String)>,
    AppJson(payload): AppJson<AddSizeRequest>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    let id = parse_id(&product_id)?;
    payload.validate()?;

    let color = normalize_color(&color);
    let size = Size {
        size: payload.size.normalized(),
        stock: payload.stock,
    };

    let mut tx = pool.begin().await?;

    let row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;

    let mut variants = row.variants.0;
    let variant = variants
        .iter_mut()
        .find(|v| v.color == color)
        .ok_or_else(|| AppError::NotFound(format!("No variant found with color: {}", color)))?;

    let label = size.size.to_string();
    if variant.sizes.iter().any(|s| s.size.matches(&label)) {
        return Err(AppError::BadRequest(format!(
            "Size '{}' already exists for the color '{}'.",
            label, color
        )));
    }
    variant.sizes.push(size);

    save_variants(&mut *tx, &id, variants).await?;

    let row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;
    tx.commit().await?;

    Ok(ApiResponse::created("Size added successfully.", row.into()))
}

/// Sets the stock of one size of one colour variant.
/// Admin only.
pub async fn update_size_stock(
    State(pool): State<SqlitePool>,
    Path((product_id, color, size)): Path<(String, String, String)>,
    AppJson(payload): AppJson<UpdateStockRequest>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    let id = parse_id(&product_id)?;
    let color = normalize_color(&color);

    let mut tx = pool.begin().await?;

    let row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;

    let mut variants = row.variants.0;
    let entry = variants
        .iter_mut()
        .find(|v| v.color == color)
        .ok_or_else(|| AppError::NotFound(format!("No variant found with color: {}", color)))?
        .sizes
        .iter_mut()
        .find(|s| s.size.matches(&size))
        .ok_or_else(|| {
            AppError::NotFound(format!("No size '{}' found for the color '{}'.", size, color))
        })?;
    entry.stock = payload.stock;

    save_variants(&mut *tx, &id, variants).await?;

    let row = fetch_product(&mut *tx, &id)
        .await?
        .ok_or_else(|| product_not_found(&id))?;
    tx.commit().await?;

    Ok(ApiResponse::ok("Stock updated successfully.", row.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_defaults_to_newest_first() {
        assert_eq!(sort_clause(None).unwrap(), "p.created_at DESC, p.id ASC");
        assert_eq!(sort_clause(Some(" ")).unwrap(), "p.created_at DESC, p.id ASC");
    }

    #[test]
    fn sort_accepts_known_fields_in_order() {
        assert_eq!(
            sort_clause(Some("price,-rating")).unwrap(),
            "p.price ASC, p.rating_average DESC, p.id ASC"
        );
    }

    #[test]
    fn sort_rejects_unknown_fields() {
        let err = sort_clause(Some("price,password")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn duplicate_colors_and_sizes_are_reported() {
        let variants: Vec<Variant> = serde_json::from_str(
            r#"[
                {"color":"red","sizes":[{"size":"M","stock":1},{"size":"M","stock":2}]},
                {"color":"red","sizes":[{"size":"L","stock":1}]}
            ]"#,
        )
        .unwrap();

        match ensure_unique_variants(&variants) {
            Err(AppError::Validation(fields)) => {
                let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
                assert!(paths.contains(&"variants[0].sizes"));
                assert!(paths.contains(&"variants[1].color"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn image_errors_are_indexed() {
        let images: Vec<Image> = serde_json::from_str(
            r#"[{"type":"fullView","url":"https://cdn.example.com/a.jpg"},{"type":"closeView","url":"nope"}]"#,
        )
        .unwrap();

        match validate_images(&images) {
            Err(AppError::Validation(fields)) => assert_eq!(fields[0].path, "images[1].url"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
