use crate::error::AppError;
use bcrypt::{hash, DEFAULT_COST};

/// Hashes a plaintext password with bcrypt at the default cost.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_verifiable_hash() {
        let password = "Abc12345!";
        let hashed = hash_password(password).unwrap();

        assert_ne!(hashed, password);
        assert!(bcrypt::verify(password, &hashed).unwrap());
        assert!(!bcrypt::verify("wrong_password", &hashed).unwrap());
    }
}
