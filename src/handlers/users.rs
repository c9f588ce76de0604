// src/handlers/users.rs

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
};
use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    extract::{AppJson, new_id, parse_id},
    models::user::{
        Address, CreateAddressRequest, UpdateAddressRequest, UpdateMeRequest, User, UserProfile,
    },
    response::ApiResponse,
    services::credentials::{
        ADDRESS_COLUMNS, USER_COLUMNS, count_addresses, find_user_by_id, list_addresses,
    },
    utils::jwt::Claims,
};

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub count: usize,
}

async fn load_profile(pool: &SqlitePool, user_id: &str) -> Result<UserProfile, AppError> {
    let user = find_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user found with id: {}", user_id)))?;
    let addresses = list_addresses(pool, user_id).await?;
    Ok(UserProfile { user, addresses })
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Returns the authenticated user with their addresses.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<UserProfile>, AppError> {
    let profile = load_profile(&pool, &claims.sub).await?;
    Ok(ApiResponse::ok("User profile fetched successfully.", profile))
}

/// Updates name, phone and/or gender of the authenticated user.
pub async fn update_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<UpdateMeRequest>,
) -> Result<ApiResponse<UserProfile>, AppError> {
    payload.validate()?;

    if payload.is_empty() {
        return Err(AppError::BadRequest(
            "No valid fields provided for update.".to_string(),
        ));
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET updated_at = ");
    qb.push_bind(Utc::now());

    if let Some(name) = &payload.name {
        qb.push(", name = ");
        qb.push_bind(name.trim().to_string());
    }
    if let Some(phone) = &payload.phone {
        qb.push(", phone = ");
        qb.push_bind(phone.trim().to_string());
    }
    if let Some(gender) = payload.gender {
        qb.push(", gender = ");
        qb.push_bind(gender);
    }

    qb.push(" WHERE id = ");
    qb.push_bind(claims.sub.clone());

    let result = qb.build().execute(&pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "No user found with id: {}",
            claims.sub
        )));
    }

    let profile = load_profile(&pool, &claims.sub).await?;
    Ok(ApiResponse::ok("User profile updated successfully.", profile))
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<ApiResponse<UserList>, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let users = sqlx::query_as::<_, User>(&sql).fetch_all(&pool).await?;

    let count = users.len();
    Ok(ApiResponse::ok(
        "All users fetched successfully.",
        UserList { users, count },
    ))
}

/// Adds an address to the authenticated user's address book.
/// Labels are unique per user and the book is capped by `MAX_ADDRESSES_PER_USER`.
pub async fn add_address(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateAddressRequest>,
) -> Result<ApiResponse<Vec<Address>>, AppError> {
    payload.validate()?;

    let label = normalize_label(&payload.label);

    let mut tx = pool.begin().await?;

    // 1. Enforce the per-user cap
    let count = count_addresses(&mut *tx, &claims.sub).await?;
    if count as usize >= config.max_addresses_per_user {
        return Err(AppError::BadRequest(format!(
            "You can only have a maximum of {} addresses.",
            config.max_addresses_per_user
        )));
    }

    // 2. Label must be free for this user
    let taken: Option<String> =
        sqlx::query_scalar("SELECT id FROM addresses WHERE user_id = ? AND label = ?")
            .bind(&claims.sub)
            .bind(&label)
            .fetch_optional(&mut *tx)
            .await?;
    if taken.is_some() {
        return Err(AppError::BadRequest(format!(
            "An address with the label '{}' already exists.",
            label
        )));
    }

    // 3. Insert
    sqlx::query(
        r#"
        INSERT INTO addresses (id, user_id, label, area, landmark, city, state, postal_code, country, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new_id())
    .bind(&claims.sub)
    .bind(&label)
    .bind(payload.area.trim())
    .bind(payload.landmark.as_deref().map(str::trim))
    .bind(payload.city.trim())
    .bind(payload.state.trim())
    .bind(payload.postal_code.trim())
    .bind(payload.country.as_deref().map(str::trim).unwrap_or("India"))
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    let addresses = list_addresses(&mut *tx, &claims.sub).await?;
    tx.commit().await?;

    Ok(ApiResponse::created("Address added successfully.", addresses))
}

/// Partially updates one of the authenticated user's addresses.
pub async fn update_address(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(address_id): Path<String>,
    AppJson(payload): AppJson<UpdateAddressRequest>,
) -> Result<ApiResponse<Address>, AppError> {
    let address_id = parse_id(&address_id)?;
    payload.validate()?;

    if payload.is_empty() {
        return Err(AppError::BadRequest(
            "No valid fields provided for update.".to_string(),
        ));
    }

    let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ? AND user_id = ?");
    let mut address = sqlx::query_as::<_, Address>(&sql)
        .bind(&address_id)
        .bind(&claims.sub)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No address found with id: {}", address_id)))?;

    if let Some(label) = &payload.label {
        address.label = normalize_label(label);
    }
    if let Some(area) = &payload.area {
        address.area = area.trim().to_string();
    }
    if let Some(landmark) = &payload.landmark {
        address.landmark = Some(landmark.trim().to_string());
    }
    if let Some(city) = &payload.city {
        address.city = city.trim().to_string();
    }
    if let Some(state) = &payload.state {
        address.state = state.trim().to_string();
    }
    if let Some(postal_code) = &payload.postal_code {
        address.postal_code = postal_code.trim().to_string();
    }
    if let Some(country) = &payload.country {
        address.country = country.trim().to_string();
    }

    // A label clash with another address surfaces as a unique violation on `label`.
    sqlx::query(
        r#"
        UPDATE addresses
        SET label = ?, area = ?, landmark = ?, city = ?, state = ?, postal_code = ?, country = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&address.label)
    .bind(&address.area)
    .bind(&address.landmark)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(&address.id)
    .bind(&claims.sub)
    .execute(&pool)
    .await?;

    Ok(ApiResponse::ok("Address updated successfully.", address))
}

/// Deletes one of the authenticated user's addresses. The last address cannot be removed.
pub async fn delete_address(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(address_id): Path<String>,
) -> Result<ApiResponse<Vec<Address>>, AppError> {
    let address_id = parse_id(&address_id)?;

    // Count guard and delete in one statement.
    let result = sqlx::query(
        r#"
        DELETE FROM addresses
        WHERE id = ? AND user_id = ?
          AND (SELECT COUNT(*) FROM addresses WHERE user_id = ?) > 1
        "#,
    )
    .bind(&address_id)
    .bind(&claims.sub)
    .bind(&claims.sub)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM addresses WHERE id = ? AND user_id = ?")
                .bind(&address_id)
                .bind(&claims.sub)
                .fetch_optional(&pool)
                .await?;

        return Err(match exists {
            Some(_) => AppError::BadRequest("You must have at least one address.".to_string()),
            None => AppError::NotFound(format!("No address found with id: {}", address_id)),
        });
    }

    let addresses = list_addresses(&pool, &claims.sub).await?;
    Ok(ApiResponse::ok("Address deleted successfully.", addresses))
}
