// src/models/user.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("phone pattern compiles"));

/// Special characters accepted (and one of which is required) in passwords.
const PASSWORD_SPECIALS: &str = "@$!%*?&";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserGender {
    Male,
    Female,
    Other,
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    pub name: String,

    /// Unique, stored trimmed and lower-cased.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub phone: Option<String>,

    pub gender: Option<UserGender>,

    pub role: Role,

    pub is_member: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'addresses' table. Owned by exactly one user.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    /// Unique per user, stored lower-cased.
    pub label: String,
    pub area: String,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

/// A user together with their address book, as returned by the profile endpoints.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required (max 100 characters)."))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email address."))]
    pub email: String,
    #[validate(custom(function = validate_password_strength))]
    pub password: String,
    #[validate(regex(path = *PHONE_RE, message = "Please provide a valid 10-digit phone number."))]
    pub phone: Option<String>,
    pub gender: Option<UserGender>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password is required."))]
    pub password: String,
}

/// DTO for updating the current user. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty."))]
    pub name: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Please provide a valid 10-digit phone number."))]
    pub phone: Option<String>,
    pub gender: Option<UserGender>,
}

impl UpdateMeRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.gender.is_none()
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest {
    #[validate(length(min = 1, max = 50, message = "An address label is required (e.g., Home, Office)."))]
    pub label: String,
    #[validate(length(min = 1, max = 200, message = "Area is required."))]
    pub area: String,
    #[validate(length(max = 200))]
    pub landmark: Option<String>,
    #[validate(length(min = 1, max = 100, message = "City is required."))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "State is required."))]
    pub state: String,
    #[validate(length(min = 1, max = 20, message = "Postal code is required."))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
}

/// DTO for updating an address. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAddressRequest {
    #[validate(length(min = 1, max = 50, message = "Address label cannot be empty."))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub area: Option<String>,
    #[validate(length(max = 200))]
    pub landmark: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
}

impl UpdateAddressRequest {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.area.is_none()
            && self.landmark.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }
}

/// Emails are compared and stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// At least 8 characters drawn from letters, digits and `@$!%*?&`, with at least one
/// uppercase letter, one lowercase letter, one digit and one special character.
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));

    let strong = password.len() >= 8
        && allowed
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if strong {
        Ok(())
    } else {
        Err(ValidationError::new("weak_password").with_message(
            "Password must be at least 8 characters and contain at least one uppercase letter, one lowercase letter, one number, and one special character."
                .into(),
        ))
    }
}
