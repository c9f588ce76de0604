// src/services/credentials.rs
//
// Persistence for users, their refresh-token digests and their address book.

use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::{
    error::AppError,
    extract::new_id,
    models::user::{Address, Role, User, UserGender},
};

pub const USER_COLUMNS: &str =
    "id, name, email, password, phone, gender, role, is_member, created_at, updated_at";

pub const ADDRESS_COLUMNS: &str =
    "id, user_id, label, area, landmark, city, state, postal_code, country, created_at";

/// Fields needed to insert a user. `password_hash` must already be an Argon2 PHC string.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: Option<&'a str>,
    pub gender: Option<UserGender>,
    pub role: Role,
}

pub async fn create_user<'e, E>(executor: E, new_user: NewUser<'_>) -> Result<User, AppError>
where
    E: SqliteExecutor<'e>,
{
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO users (id, name, email, password, phone, gender, role, is_member, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, FALSE, ?, ?)
         RETURNING {USER_COLUMNS}"
    );

    let user = sqlx::query_as::<_, User>(&sql)
        .bind(new_id())
        .bind(new_user.name)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.phone)
        .bind(new_user.gender)
        .bind(new_user.role)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await?;

    Ok(user)
}

pub async fn find_user_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn find_user_by_id<'e, E>(executor: E, id: &str) -> Result<Option<User>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn store_refresh_token<'e, E>(
    executor: E,
    user_id: &str,
    token_hash: &str,
) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("INSERT INTO refresh_tokens (token_hash, user_id, created_at) VALUES (?, ?, ?)")
        .bind(token_hash)
        .bind(user_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
    Ok(())
}

/// Removes the digest from the user's active set.
/// Returns `false` when it was not there, i.e. the token was revoked or already rotated.
pub async fn consume_refresh_token<'e, E>(
    executor: E,
    user_id: &str,
    token_hash: &str,
) -> Result<bool, AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ? AND token_hash = ?")
        .bind(user_id)
        .bind(token_hash)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes the digest from whichever user holds it.
pub async fn revoke_refresh_token<'e, E>(executor: E, token_hash: &str) -> Result<u64, AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?")
        .bind(token_hash)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_addresses<'e, E>(executor: E, user_id: &str) -> Result<Vec<Address>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = ? ORDER BY created_at ASC, id ASC"
    );
    let addresses = sqlx::query_as::<_, Address>(&sql)
        .bind(user_id)
        .fetch_all(executor)
        .await?;
    Ok(addresses)
}

pub async fn count_addresses<'e, E>(executor: E, user_id: &str) -> Result<i64, AppError>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}
