use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .to_string();

    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);

    Ok(result.is_ok())
}

/// Checks `password` against a stored credential.
///
/// Records created by the browser build keep the password in plaintext; those
/// are compared directly. Everything else must be an argon2 PHC string.
pub fn password_matches(password: &str, stored: &str) -> Result<bool, AppError> {
    if stored.starts_with("$argon2") {
        verify_password(password, stored)
    } else {
        Ok(!stored.is_empty() && stored == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_and_plaintext_credentials() {
        let hash = hash_password("segredo1").unwrap();
        assert!(password_matches("segredo1", &hash).unwrap());
        assert!(!password_matches("segredo2", &hash).unwrap());

        assert!(password_matches("legacy123", "legacy123").unwrap());
        assert!(!password_matches("", "").unwrap());
    }
}
