// src/handlers/auth.rs

use std::sync::Arc;

use axum::extract::State;
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use serde_json::Value;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    extract::AppJson,
    models::user::{
        AccessTokenResponse, LoginRequest, LoginResponse, RegisterRequest, Role, UserProfile,
        normalize_email,
    },
    response::ApiResponse,
    services::credentials::{
        self, NewUser, consume_refresh_token, find_user_by_email, find_user_by_id,
        revoke_refresh_token, store_refresh_token,
    },
    utils::{
        hash::{hash_password, hash_refresh_token, verify_password},
        jwt::{issue_token_pair, verify_jwt},
    },
};

pub const REFRESH_COOKIE: &str = "refreshToken";

fn refresh_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(config.production)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(config.jwt_refresh_expiration as i64))
        .build()
}

/// Same attributes as the refresh cookie, expired at the epoch.
fn clearing_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .http_only(true)
        .secure(config.production)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::ZERO)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Registers a new customer.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password). No tokens are issued.
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<ApiResponse<UserProfile>, AppError> {
    payload.validate()?;

    let email = normalize_email(&payload.email);

    if find_user_by_email(&pool, &email).await?.is_some() {
        return Err(AppError::BadRequest(format!(
            "User with email {} already exists.",
            email
        )));
    }

    let hashed_password = hash_password(&payload.password, config.hash_cost)?;

    let user = credentials::create_user(
        &pool,
        NewUser {
            name: payload.name.trim(),
            email: &email,
            password_hash: &hashed_password,
            phone: payload.phone.as_deref().map(str::trim),
            gender: payload.gender,
            role: Role::Customer,
        },
    )
    .await?;

    tracing::info!("Registered user {}", user.id);

    Ok(ApiResponse::created(
        "User registered successfully.",
        UserProfile {
            user,
            addresses: Vec::new(),
        },
    ))
}

/// Authenticates a user.
///
/// Returns the access token in the body and sets the rotated refresh token as a signed,
/// HTTP-only cookie. Unknown email and wrong password are indistinguishable.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    jar: SignedCookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(SignedCookieJar, ApiResponse<LoginResponse>), AppError> {
    payload.validate()?;

    let email = normalize_email(&payload.email);

    let user = find_user_by_email(&pool, &email)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid credentials.".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials.".to_string()));
    }

    let tokens = issue_token_pair(&user.id, user.role, &config)?;
    store_refresh_token(&pool, &user.id, &hash_refresh_token(&tokens.refresh_token)).await?;

    let addresses = credentials::list_addresses(&pool, &user.id).await?;

    tracing::info!("User {} logged in", user.id);

    let jar = jar.add(refresh_cookie(tokens.refresh_token, &config));

    Ok((
        jar,
        ApiResponse::ok(
            "Login successful.",
            LoginResponse {
                access_token: tokens.access_token,
                user: UserProfile { user, addresses },
            },
        ),
    ))
}

/// Exchanges the refresh cookie for a new token pair.
///
/// The presented token is consumed in the same transaction that stores its replacement,
/// so a token can be used exactly once.
pub async fn refresh_token(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, ApiResponse<AccessTokenResponse>), AppError> {
    // 1. Read the signed cookie
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::AuthError("Authentication Invalid: No refresh token provided.".to_string())
        })?;

    // 2. Verify signature and expiry
    let claims = verify_jwt(&token, &config.jwt_refresh_secret)
        .payload
        .ok_or_else(|| {
            AppError::AuthError(
                "Authentication Invalid: Refresh token is invalid or expired.".to_string(),
            )
        })?;

    // 3. Rotate
    let mut tx = pool.begin().await?;

    let consumed =
        consume_refresh_token(&mut *tx, &claims.sub, &hash_refresh_token(&token)).await?;
    if !consumed {
        tracing::warn!("Rejected revoked or replayed refresh token for user {}", claims.sub);
        return Err(AppError::AuthError(
            "Authentication Invalid: Refresh token has been revoked.".to_string(),
        ));
    }

    let user = find_user_by_id(&mut *tx, &claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user found with id: {}", claims.sub)))?;

    let tokens = issue_token_pair(&user.id, user.role, &config)?;
    store_refresh_token(&mut *tx, &user.id, &hash_refresh_token(&tokens.refresh_token)).await?;

    tx.commit().await?;

    let jar = jar.add(refresh_cookie(tokens.refresh_token, &config));

    Ok((
        jar,
        ApiResponse::ok(
            "Access token refreshed successfully.",
            AccessTokenResponse {
                access_token: tokens.access_token,
            },
        ),
    ))
}

/// Revokes the presented refresh token, if any, and clears the cookie.
/// Always succeeds.
pub async fn logout(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, ApiResponse<Value>) {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        let digest = hash_refresh_token(cookie.value());
        match revoke_refresh_token(&pool, &digest).await {
            Ok(0) => tracing::debug!("Logout with an unknown refresh token"),
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to revoke refresh token on logout: {:?}", e),
        }
    }

    let jar = jar.add(clearing_cookie(&config));

    (jar, ApiResponse::message("Logout successful."))
}
