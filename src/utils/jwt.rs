// src/utils/jwt.rs

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, error::AppError, models::user::Role};

/// JWT Claims structure. Shared by access and refresh tokens; only the signing secret differs.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID.
    pub sub: String,
    pub role: Role,
    /// Issued-at as Unix timestamp.
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
    /// Unique token id, so two tokens minted in the same second still differ.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Outcome of verifying a token. `payload` is `None` for any failure.
#[derive(Debug)]
pub struct TokenVerification {
    pub payload: Option<Claims>,
    pub expired: bool,
}

fn now_secs() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize)
}

/// Signs a new HS256 JWT for the user.
pub fn sign_jwt(
    user_id: &str,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let issued_at = now_secs()?;

    let claims = Claims {
        sub: user_id.to_owned(),
        role,
        iat: issued_at,
        exp: issued_at
            .saturating_add(usize::try_from(expiration_seconds).unwrap_or(usize::MAX)),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Issues a fresh access/refresh pair using the configured secrets and lifetimes.
pub fn issue_token_pair(user_id: &str, role: Role, config: &Config) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access_token: sign_jwt(
            user_id,
            role,
            &config.jwt_access_secret,
            config.jwt_access_expiration,
        )?,
        refresh_token: sign_jwt(
            user_id,
            role,
            &config.jwt_refresh_secret,
            config.jwt_refresh_expiration,
        )?,
    })
}

/// Verifies and decodes a JWT string. Never fails; see [`TokenVerification`].
pub fn verify_jwt(token: &str, secret: &str) -> TokenVerification {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => TokenVerification {
            payload: Some(data.claims),
            expired: false,
        },
        Err(e) => {
            let expired = matches!(e.kind(), ErrorKind::ExpiredSignature);
            tracing::debug!("Token verification failed (expired: {}): {}", expired, e);
            TokenVerification {
                payload: None,
                expired,
            }
        }
    }
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header against the access secret
/// and injects `Claims` into the request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<Config>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::AuthError("Authentication Invalid: No token provided.".to_string())
        })?;

    let claims = verify_jwt(token, &config.jwt_access_secret)
        .payload
        .ok_or_else(|| {
            AppError::AuthError("Authentication Invalid: Token is invalid or expired.".to_string())
        })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req.extensions().get::<Claims>().ok_or_else(|| {
        AppError::AuthError("Authentication Invalid: No token provided.".to_string())
    })?;

    if claims.role != Role::Admin {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
