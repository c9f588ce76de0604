// src/config.rs

use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Argon2 cost parameters used when hashing passwords.
#[derive(Debug, Clone, Copy)]
pub struct HashCost {
    pub iterations: u32,
    pub memory_kib: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            iterations: 2,
            memory_kib: 19_456,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub production: bool,
    pub database_url: String,

    /// Master secret for the signed refresh-token cookie.
    pub cookie_secret: String,

    pub jwt_access_secret: String,
    /// Access token lifetime in seconds.
    pub jwt_access_expiration: u64,
    pub jwt_refresh_secret: String,
    /// Refresh token lifetime in seconds. Also the cookie max-age.
    pub jwt_refresh_expiration: u64,

    pub hash_cost: HashCost,

    /// Rate limit window in seconds. `rate_limit_max == 0` disables limiting.
    pub rate_limit_window_secs: u64,
    pub rate_limit_max: u32,

    pub max_addresses_per_user: usize,
    pub cors_origins: Vec<String>,
    pub rust_log: String,

    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://storefront.db?mode=rwc".to_string());

        let jwt_access_expiration = match env::var("JWT_ACCESS_EXPIRATION") {
            Ok(raw) => parse_duration(&raw).ok_or(ConfigError::Invalid {
                key: "JWT_ACCESS_EXPIRATION",
                value: raw,
            })?,
            Err(_) => 15 * 60,
        };

        let jwt_refresh_expiration = match env::var("JWT_REFRESH_EXPIRATION") {
            Ok(raw) => parse_duration(&raw).ok_or(ConfigError::Invalid {
                key: "JWT_REFRESH_EXPIRATION",
                value: raw,
            })?,
            Err(_) => 7 * 24 * 60 * 60,
        };

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            iterations: parse_or("HASH_ITERATIONS", defaults.iterations)?,
            memory_kib: parse_or("HASH_MEMORY_KIB", defaults.memory_kib)?,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            port: parse_or("PORT", 5000)?,
            production,
            database_url,
            cookie_secret: required("COOKIE_SECRET")?,
            jwt_access_secret: required("JWT_ACCESS_SECRET")?,
            jwt_access_expiration,
            jwt_refresh_secret: required("JWT_REFRESH_SECRET")?,
            jwt_refresh_expiration,
            hash_cost,
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 15 * 60)?,
            rate_limit_max: parse_or("RATE_LIMIT_MAX", 100)?,
            max_addresses_per_user: parse_or("MAX_ADDRESSES_PER_USER", 3)?,
            cors_origins,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Parses `"90"`, `"90s"`, `"15m"`, `"12h"` or `"7d"` into seconds.
pub fn parse_duration(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: u64 = digits.parse().ok()?;

    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };

    amount.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::parse_duration;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("90"), Some(90));
        assert_eq!(parse_duration("45s"), Some(45));
        assert_eq!(parse_duration("15m"), Some(900));
        assert_eq!(parse_duration("12h"), Some(43_200));
        assert_eq!(parse_duration("7d"), Some(604_800));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("10w"), None);
        assert_eq!(parse_duration("-5m"), None);
    }
}
