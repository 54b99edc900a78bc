//! Authentication and membership logic.
//!
//! Provides password hashing, session-token issuance, and membership-id
//! generation shared across the API layer and the server binary.

pub mod membership;
pub mod password;
pub mod token;

use thiserror::Error;

use crate::store::StoreError;

/// Role granted to reserved administrator addresses.
pub const ROLE_ADMIN: &str = "Admin";
/// Role granted to every other registered user.
pub const ROLE_MEMBER: &str = "Member";

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    CredentialError,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Email is already registered.")]
    EmailTaken,

    #[error("No profile linked to {0}")]
    ProfileNotFound(String),

    #[error("membership id generation exhausted after {0} attempts")]
    GenerationExhausted(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
