//! In-memory store implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{IdentityStore, ProfileStore, StoreError};
use crate::auth::password;
use crate::models::auth::{IdentityRecord, NewProfile, Profile};

struct MemIdentity {
    record: IdentityRecord,
    password_hash: String,
    roles: Vec<String>,
}

/// Identity store held in process memory.
#[derive(Default)]
pub struct MemIdentityStore {
    identities: Mutex<Vec<MemIdentity>>,
    /// When set, `add_role` fails; exercises the role-attach policy paths.
    pub fail_add_role: AtomicBool,
}

#[async_trait]
impl IdentityStore for MemIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let identities = self.identities.lock().expect("mem store poisoned");
        Ok(identities
            .iter()
            .find(|i| i.record.email.eq_ignore_ascii_case(email))
            .map(|i| i.record.clone()))
    }

    async fn create(&self, email: &str, password: &str) -> Result<IdentityRecord, StoreError> {
        let password_hash =
            password::hash_password(password).map_err(|e| StoreError::Other(e.to_string()))?;
        let mut identities = self.identities.lock().expect("mem store poisoned");
        if identities
            .iter()
            .any(|i| i.record.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::Conflict("email is already registered".into()));
        }
        let record = IdentityRecord {
            id: format!("identity-{}", identities.len() + 1),
            email: email.to_string(),
            email_confirmed: false,
        };
        identities.push(MemIdentity {
            record: record.clone(),
            password_hash,
            roles: Vec::new(),
        });
        Ok(record)
    }

    async fn check_password(
        &self,
        identity: &IdentityRecord,
        password: &str,
    ) -> Result<bool, StoreError> {
        let hash = {
            let identities = self.identities.lock().expect("mem store poisoned");
            identities
                .iter()
                .find(|i| i.record.id == identity.id)
                .map(|i| i.password_hash.clone())
        };
        match hash {
            None => Ok(false),
            Some(hash) => password::verify_password(password, &hash)
                .map_err(|e| StoreError::Other(e.to_string())),
        }
    }

    async fn add_role(&self, identity_id: &str, role: &str) -> Result<(), StoreError> {
        if self.fail_add_role.load(Ordering::Relaxed) {
            return Err(StoreError::Other("role store unavailable".into()));
        }
        let mut identities = self.identities.lock().expect("mem store poisoned");
        let identity = identities
            .iter_mut()
            .find(|i| i.record.id == identity_id)
            .ok_or_else(|| StoreError::Other(format!("no identity {identity_id}")))?;
        if identity.roles.iter().any(|r| r == role) {
            return Err(StoreError::Conflict("role already granted".into()));
        }
        identity.roles.push(role.to_string());
        Ok(())
    }

    async fn roles(&self, identity_id: &str) -> Result<Vec<String>, StoreError> {
        let identities = self.identities.lock().expect("mem store poisoned");
        Ok(identities
            .iter()
            .find(|i| i.record.id == identity_id)
            .map(|i| i.roles.clone())
            .unwrap_or_default())
    }
}

/// Profile store held in process memory.
#[derive(Default)]
pub struct MemProfileStore {
    profiles: Mutex<Vec<Profile>>,
}

#[async_trait]
impl ProfileStore for MemProfileStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let profiles = self.profiles.lock().expect("mem store poisoned");
        Ok(profiles
            .iter()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Profile>, StoreError> {
        let profiles = self.profiles.lock().expect("mem store poisoned");
        Ok(profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn add(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.lock().expect("mem store poisoned");
        if profiles
            .iter()
            .any(|p| p.email.eq_ignore_ascii_case(&profile.email))
        {
            return Err(StoreError::Conflict("profile already exists".into()));
        }
        if profiles
            .iter()
            .any(|p| p.membership_id == profile.membership_id)
        {
            return Err(StoreError::Conflict("membership id already assigned".into()));
        }
        let stored = Profile {
            id: profiles.len() as i64 + 1,
            name: profile.name,
            address: profile.address,
            email: profile.email,
            membership_id: profile.membership_id,
            role: profile.role,
        };
        profiles.push(stored.clone());
        Ok(stored)
    }

    async fn membership_id_exists(&self, membership_id: &str) -> Result<bool, StoreError> {
        let profiles = self.profiles.lock().expect("mem store poisoned");
        Ok(profiles.iter().any(|p| p.membership_id == membership_id))
    }
}
