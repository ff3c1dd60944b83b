pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

// Re-export necessary items
pub use extractors::AuthenticatedUserId;
pub use middleware::AuthMiddleware;
pub use password::hash_password;
pub use token::{generate_token, issue_token_set, verify_token, Claims, TokenSet};
