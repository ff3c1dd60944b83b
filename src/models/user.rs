use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Human-readable explanation of the password complexity rule, surfaced as the
/// validation message when the rule is violated.
pub const PASSWORD_EXPLAIN: &str =
    "Password must be 8-64 characters and contain at least one uppercase letter, one lowercase letter and one digit";

lazy_static! {
    // Social handles: optional leading @, then alphanumerics/underscores.
    static ref HANDLE_REGEX: regex::Regex = regex::Regex::new(r"^@?[a-zA-Z0-9_]{2,32}$").unwrap();
}

/// Represents an account holder as stored in the database and returned by the API.
///
/// The wallet address is intentionally absent: it lives in the `wallets` table
/// and is joined into profile projections, never stored on the user row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique identifier for the user (UUID v4).
    pub id: Uuid,
    /// Unique email address the account was created with.
    pub email: String,
    /// Optional avatar URL.
    pub avatar: Option<String>,
    /// Optional personal website URL.
    pub website: Option<String>,
    /// Optional display nickname.
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    /// Two-letter locale code (e.g. "en").
    pub locale: Option<String>,
    /// Date of birth, ISO `YYYY-MM-DD`.
    pub birthdate: Option<NaiveDate>,
    /// Telegram handle.
    pub telegram: Option<String>,
    /// Twitter handle.
    pub twitter: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional nested profile attributes on user creation.
/// Every field is optional and validated only when present.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct CreateUserAttributes {
    #[validate(url(message = "avatar must be an absolute URL"))]
    pub avatar: Option<String>,

    #[validate(url(message = "website must be an absolute URL"))]
    pub website: Option<String>,

    #[validate(length(max = 32))]
    pub nickname: Option<String>,

    #[validate(length(max = 32))]
    pub first_name: Option<String>,

    #[validate(length(max = 32))]
    pub middle_name: Option<String>,

    #[validate(length(max = 32))]
    pub last_name: Option<String>,

    /// Two-character locale code.
    #[validate(length(equal = 2, message = "locale must be a 2-character code"))]
    pub locale: Option<String>,

    /// ISO `YYYY-MM-DD` date string.
    #[validate(custom = "validate_iso_date")]
    pub birthdate: Option<String>,

    #[validate(regex(path = "HANDLE_REGEX", message = "not a valid handle"))]
    pub telegram: Option<String>,

    #[validate(regex(path = "HANDLE_REGEX", message = "not a valid handle"))]
    pub twitter: Option<String>,
}

/// Input structure for creating a user account.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Must be a valid email address.
    #[validate(email)]
    pub email: String,

    /// Must satisfy the complexity rule documented by [`PASSWORD_EXPLAIN`].
    #[validate(custom = "validate_password_strength")]
    pub password: String,

    /// Optional nested profile attributes.
    #[validate]
    pub attributes: Option<CreateUserAttributes>,
}

/// Password complexity rule: 8-64 characters with at least one uppercase
/// letter, one lowercase letter and one digit. The `regex` crate has no
/// lookahead, so the character classes are checked directly.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let long_enough = (8..=64).contains(&password.chars().count());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_upper && has_lower && has_digit {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(PASSWORD_EXPLAIN.into());
        Err(err)
    }
}

fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        let mut err = ValidationError::new("iso_date");
        err.message = Some("birthdate must be an ISO YYYY-MM-DD date".into());
        err
    })?;
    Ok(())
}

/// Request body for the public-profile lookup. Duplicate ids are allowed;
/// the response is keyed by id so duplicates collapse naturally.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct GetPublicProfilesRequest {
    #[validate(length(min = 1, max = 100, message = "ids must contain 1 to 100 entries"))]
    pub ids: Vec<Uuid>,
}

/// Aggregate proposal counts for one user, computed from `swap_proposals`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderStats {
    /// Total proposals ever created by the user.
    pub orders: i64,
    /// Proposals that reached the fulfilled state.
    pub completed_orders: i64,
}

/// Reduced projection of a user for public consumption: id, avatar, social
/// handles, the joined wallet address and computed order statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub avatar: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub wallet_address: Option<String>,
    pub orders_stat: OrderStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn valid_request() -> CreateUserRequest {
        CreateUserRequest {
            email: "a@b.com".to_string(),
            password: "Abc12345!".to_string(),
            attributes: Some(CreateUserAttributes {
                locale: Some("en".to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_valid_user_creation_request() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_email_without_at_is_rejected() {
        let mut req = valid_request();
        req.email = "not-an-email".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_weak_password_cites_password_field() {
        let mut req = valid_request();
        req.password = "abc".to_string();
        let errors = req.validate().unwrap_err();
        let field_errors = errors.field_errors();
        assert_eq!(field_errors.len(), 1);
        let violations = field_errors.get("password").expect("password violation");
        assert_eq!(violations[0].code, "password_strength");
        assert_eq!(
            violations[0].message.as_deref(),
            Some(PASSWORD_EXPLAIN)
        );
    }

    #[test]
    fn test_password_strength_matrix() {
        assert!(validate_password_strength("Abc12345!").is_ok());
        assert!(validate_password_strength("Xyzzy123").is_ok());
        // Missing character classes
        assert!(validate_password_strength("abc12345").is_err());
        assert!(validate_password_strength("ABC12345").is_err());
        assert!(validate_password_strength("Abcdefgh").is_err());
        // Too short / too long
        assert!(validate_password_strength("Ab1").is_err());
        assert!(validate_password_strength(&format!("Ab1{}", "x".repeat(80))).is_err());
    }

    #[test]
    fn test_attribute_validation_only_when_present() {
        // No attributes at all is fine
        let req = CreateUserRequest {
            email: "a@b.com".to_string(),
            password: "Abc12345!".to_string(),
            attributes: None,
        };
        assert!(req.validate().is_ok());

        // A website without a URL scheme is rejected
        let req = CreateUserRequest {
            email: "a@b.com".to_string(),
            password: "Abc12345!".to_string(),
            attributes: Some(CreateUserAttributes {
                website: Some("example.com/profile".to_string()),
                ..Default::default()
            }),
        };
        assert!(req.validate().is_err());

        // With a scheme it passes
        let req = CreateUserRequest {
            email: "a@b.com".to_string(),
            password: "Abc12345!".to_string(),
            attributes: Some(CreateUserAttributes {
                website: Some("https://example.com/profile".to_string()),
                ..Default::default()
            }),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_attribute_bounds() {
        let attrs = CreateUserAttributes {
            nickname: Some("x".repeat(33)),
            locale: Some("eng".to_string()),
            birthdate: Some("31-12-1990".to_string()),
            ..Default::default()
        };
        let errors = attrs.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("nickname"));
        assert!(fields.contains_key("locale"));
        assert!(fields.contains_key("birthdate"));

        let attrs = CreateUserAttributes {
            nickname: Some("x".repeat(32)),
            locale: Some("en".to_string()),
            birthdate: Some("1990-12-31".to_string()),
            telegram: Some("@some_handle".to_string()),
            twitter: Some("some_handle".to_string()),
            ..Default::default()
        };
        assert!(attrs.validate().is_ok());
    }

    #[test]
    fn test_public_profiles_request_bounds() {
        let req = GetPublicProfilesRequest { ids: vec![] };
        assert!(req.validate().is_err());

        let req = GetPublicProfilesRequest {
            ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        assert!(req.validate().is_ok());
    }
}
