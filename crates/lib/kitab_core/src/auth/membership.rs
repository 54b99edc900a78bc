//! Membership-id generation.

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::debug;

use super::AuthError;
use crate::store::ProfileStore;

/// Membership-id prefix.
const PREFIX: &str = "MEM-";
/// Random suffix length.
const SUFFIX_LEN: usize = 8;
/// Collision retry cap. A collision is ~1/36^8 per attempt; hitting the cap
/// means the store is misbehaving, not that the id space is full.
const MAX_ATTEMPTS: u32 = 10;

/// Generate a membership id of the form `MEM-XXXXXXXX` held by no existing
/// profile. Read-only against the store; persisting the id is the caller's
/// responsibility.
pub async fn generate(store: &dyn ProfileStore) -> Result<String, AuthError> {
    for _ in 0..MAX_ATTEMPTS {
        let candidate = new_candidate();
        if !store.membership_id_exists(&candidate).await? {
            return Ok(candidate);
        }
        debug!(candidate = %candidate, "membership id collision, retrying");
    }
    Err(AuthError::GenerationExhausted(MAX_ATTEMPTS))
}

fn new_candidate() -> String {
    let suffix: String = rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b.to_ascii_uppercase()))
        .collect();
    format!("{PREFIX}{suffix}")
}
