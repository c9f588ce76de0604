use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};

use crate::{config::HashCost, error::AppError};

pub fn hash_password(password: &str, cost: HashCost) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(cost.memory_kib, cost.iterations, 1, None)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .to_string();

    Ok(password_hash)
}

/// Cost parameters are read back from the PHC string, so hashes made under an older
/// configuration keep verifying.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);

    match result {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// SHA-256 hex digest of a refresh token. Only this digest is ever persisted.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> HashCost {
        HashCost {
            iterations: 1,
            memory_kib: 1024,
        }
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("Password123!", cheap()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Password123!", &hash).unwrap());
        assert!(!verify_password("Password123?", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("Password123!", cheap()).unwrap();
        let b = hash_password("Password123!", cheap()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn refresh_token_digest_is_stable_hex() {
        let digest = hash_refresh_token("some.jwt.value");
        assert_eq!(digest, hash_refresh_token("some.jwt.value"));
        assert_ne!(digest, hash_refresh_token("some.jwt.valuf"));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
