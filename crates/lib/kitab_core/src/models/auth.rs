//! Authentication domain models.
//!
//! Two user representations exist side by side: the identity record holds
//! credentials and roles, the profile holds member-facing data. They are
//! joined by email value, not by foreign key.

use serde::{Deserialize, Serialize};

/// Credential-holding account record, the source of authentication truth.
///
/// The password hash never leaves the identity store; callers verify
/// passwords through the store instead of reading the hash.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    /// Opaque store-assigned id (UUID in text form).
    pub id: String,
    pub email: String,
    pub email_confirmed: bool,
}

/// Application-level member record, the source of display/business data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Store-assigned integer id. Session tokens use this as their subject.
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    /// Mirrors the identity record's email.
    pub email: String,
    /// Unique human-readable member identifier (`MEM-XXXXXXXX`).
    pub membership_id: String,
    /// Primary role, denormalised from the identity role set.
    pub role: String,
}

/// Insert payload for a new profile; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub name: String,
    pub address: Option<String>,
    pub email: String,
    pub membership_id: String,
    pub role: String,
}

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — profile id (standard JWT `sub` claim), not the identity id.
    pub sub: String,
    /// User email.
    pub email: String,
    /// Issuer, a fixed server-configured string.
    pub iss: String,
    /// Audience, a fixed server-configured string.
    pub aud: String,
    /// Unique token id, fresh per issuance.
    pub jti: String,
    /// Profile name; omitted when the profile has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Profile address; omitted when the profile has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Membership id; omitted when the profile has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_id: Option<String>,
    /// Role names (e.g. `["Member"]`), deduplicated.
    pub roles: Vec<String>,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}
