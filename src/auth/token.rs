use crate::error::AppError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of an access token.
const ACCESS_TOKEN_TTL_HOURS: i64 = 24;
/// Lifetime of a refresh token.
const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's unique identifier.
    pub sub: Uuid,
    /// Expiration timestamp (seconds since epoch) for the token.
    pub exp: usize,
}

/// The credential pair returned after a successful sign-in or sign-up.
///
/// Serialized in camelCase as `{accessToken, refreshToken, expiresAt}`, the
/// wire shape clients consume.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token.
    pub expires_at: DateTime<Utc>,
}

fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET")
        .map_err(|_| AppError::InternalServerError("JWT_SECRET not set".into()))
}

fn encode_claims(user_id: Uuid, expires_at: DateTime<Utc>, secret: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Generates a 24-hour access token for a given user ID.
///
/// Requires the `JWT_SECRET` environment variable to be set for signing.
pub fn generate_token(user_id: Uuid) -> Result<String, AppError> {
    let secret = jwt_secret()?;
    let expires_at = Utc::now() + chrono::Duration::hours(ACCESS_TOKEN_TTL_HOURS);
    encode_claims(user_id, expires_at, &secret)
}

/// Issues a complete token set for a user: access token, longer-lived refresh
/// token, and the access token's expiry instant.
pub fn issue_token_set(user_id: Uuid) -> Result<TokenSet, AppError> {
    let secret = jwt_secret()?;
    let access_expires_at = Utc::now() + chrono::Duration::hours(ACCESS_TOKEN_TTL_HOURS);
    let refresh_expires_at = Utc::now() + chrono::Duration::days(REFRESH_TOKEN_TTL_DAYS);

    Ok(TokenSet {
        access_token: encode_claims(user_id, access_expires_at, &secret)?,
        refresh_token: encode_claims(user_id, refresh_expires_at, &secret)?,
        expires_at: access_expires_at,
    })
}

/// Verifies a JWT string and decodes its claims.
///
/// Requires the `JWT_SECRET` environment variable to be set.
/// Returns `AppError::Unauthorized` if the token is malformed, its signature
/// is invalid, or it has expired.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let secret = jwt_secret()?;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;

    lazy_static! {
        static ref JWT_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    }

    // Helper to run test logic with a temporarily set JWT_SECRET
    fn run_with_temp_jwt_secret<F>(secret_value: &str, test_logic: F)
    where
        F: FnOnce(),
    {
        let _guard = JWT_ENV_LOCK.lock().unwrap();

        let original_secret_val = std::env::var("JWT_SECRET").ok();
        std::env::set_var("JWT_SECRET", secret_value);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(test_logic));

        if let Some(original) = original_secret_val {
            std::env::set_var("JWT_SECRET", original);
        } else {
            std::env::remove_var("JWT_SECRET");
        }

        if let Err(panic_payload) = result {
            std::panic::resume_unwind(panic_payload);
        }
    }

    #[test]
    fn test_token_generation_and_verification() {
        run_with_temp_jwt_secret("test_secret_for_gen_verify", || {
            let user_id = Uuid::new_v4();
            let token = generate_token(user_id).unwrap();
            let claims = verify_token(&token).unwrap();
            assert_eq!(claims.sub, user_id);
        });
    }

    #[test]
    fn test_token_set_shape() {
        run_with_temp_jwt_secret("test_secret_for_token_set", || {
            let user_id = Uuid::new_v4();
            let set = issue_token_set(user_id).unwrap();

            // Both tokens verify against the same user
            assert_eq!(verify_token(&set.access_token).unwrap().sub, user_id);
            assert_eq!(verify_token(&set.refresh_token).unwrap().sub, user_id);
            assert!(set.expires_at > Utc::now());

            // Wire shape is camelCase per the public contract
            let json = serde_json::to_value(&set).unwrap();
            assert!(json.get("accessToken").is_some());
            assert!(json.get("refreshToken").is_some());
            assert!(json.get("expiresAt").is_some());
        });
    }

    #[test]
    fn test_expired_token_is_rejected() {
        run_with_temp_jwt_secret("test_secret_for_expiration", || {
            let expired_at = Utc::now() - chrono::Duration::hours(2);
            let expired_token =
                encode_claims(Uuid::new_v4(), expired_at, "test_secret_for_expiration").unwrap();

            match verify_token(&expired_token) {
                Err(AppError::Unauthorized(msg)) => {
                    assert!(msg.contains("ExpiredSignature"));
                }
                Ok(_) => panic!("Token should have been invalid due to expiration"),
                Err(e) => panic!("Unexpected error type for expired token: {:?}", e),
            }
        });
    }

    #[test]
    fn test_invalid_token_signature() {
        run_with_temp_jwt_secret("a_completely_different_secret", || {
            let token = run_encode_with("some_other_secret");
            match verify_token(&token) {
                Err(AppError::Unauthorized(msg)) => {
                    assert!(
                        msg.contains("InvalidSignature") || msg.contains("InvalidToken"),
                        "unexpected message: {}",
                        msg
                    );
                }
                Ok(_) => panic!("Token should have been invalid due to signature mismatch"),
                Err(e) => panic!("Unexpected error type for invalid signature: {:?}", e),
            }
        });
    }

    fn run_encode_with(secret: &str) -> String {
        encode_claims(Uuid::new_v4(), Utc::now() + chrono::Duration::hours(1), secret).unwrap()
    }
}
