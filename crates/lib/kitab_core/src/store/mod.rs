//! Store ports for the two user representations.
//!
//! The identity store owns credentials (email + password hash + role set);
//! the profile store owns the application-level member records. Handlers and
//! services talk to these traits so tests can swap the PostgreSQL
//! implementations for in-memory ones.

pub mod pg;

#[cfg(any(test, feature = "test-support"))]
pub mod mem;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::{IdentityRecord, NewProfile, Profile};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-constraint violation (duplicate email or membership id).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("store error: {0}")]
    Other(String),
}

/// Credential store. Email lookups are case-insensitive; the password hash
/// stays inside the store.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Create an identity record, hashing the password with the store's own
    /// hashing routine. A duplicate email is a [`StoreError::Conflict`].
    async fn create(&self, email: &str, password: &str) -> Result<IdentityRecord, StoreError>;

    async fn check_password(
        &self,
        identity: &IdentityRecord,
        password: &str,
    ) -> Result<bool, StoreError>;

    async fn add_role(&self, identity_id: &str, role: &str) -> Result<(), StoreError>;

    async fn roles(&self, identity_id: &str) -> Result<Vec<String>, StoreError>;
}

/// Member profile store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Profile>, StoreError>;

    /// Insert a profile, returning it with its store-assigned id.
    async fn add(&self, profile: NewProfile) -> Result<Profile, StoreError>;

    async fn membership_id_exists(&self, membership_id: &str) -> Result<bool, StoreError>;
}
