//! PostgreSQL store implementations.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{IdentityStore, ProfileStore, StoreError};
use crate::auth::password;
use crate::models::auth::{IdentityRecord, NewProfile, Profile};

/// Postgres error code for unique-constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Map a unique-constraint violation to [`StoreError::Conflict`]; two
/// concurrent registrations can both pass the pre-check, the constraint is
/// the safety net.
fn map_insert_err(e: sqlx::Error, conflict_msg: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict(conflict_msg.to_string())
        }
        _ => StoreError::Db(e),
    }
}

/// Identity store backed by the `identities` and `identity_roles` tables.
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, bool)>(
            "SELECT id::text, email, email_confirmed FROM identities \
             WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, email, email_confirmed)| IdentityRecord {
            id,
            email,
            email_confirmed,
        }))
    }

    async fn create(&self, email: &str, password: &str) -> Result<IdentityRecord, StoreError> {
        let hash =
            password::hash_password(password).map_err(|e| StoreError::Other(e.to_string()))?;
        let row = sqlx::query_as::<_, (String, String, bool)>(
            "INSERT INTO identities (email, password_hash) VALUES ($1, $2) \
             RETURNING id::text, email, email_confirmed",
        )
        .bind(email)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_err(e, "email is already registered"))?;
        Ok(IdentityRecord {
            id: row.0,
            email: row.1,
            email_confirmed: row.2,
        })
    }

    async fn check_password(
        &self,
        identity: &IdentityRecord,
        password: &str,
    ) -> Result<bool, StoreError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM identities WHERE id = $1::uuid",
        )
        .bind(&identity.id)
        .fetch_optional(&self.pool)
        .await?;
        match hash {
            None => Ok(false),
            Some(hash) => password::verify_password(password, &hash)
                .map_err(|e| StoreError::Other(e.to_string())),
        }
    }

    async fn add_role(&self, identity_id: &str, role: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO identity_roles (identity_id, role) VALUES ($1::uuid, $2)")
            .bind(identity_id)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_err(e, "role already granted"))?;
        Ok(())
    }

    async fn roles(&self, identity_id: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT role FROM identity_roles WHERE identity_id = $1::uuid",
        )
        .bind(identity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Profile store backed by the `profiles` table.
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type ProfileRow = (i64, String, Option<String>, String, String, String);

fn profile_from_row(row: ProfileRow) -> Profile {
    let (id, name, address, email, membership_id, role) = row;
    Profile {
        id,
        name,
        address,
        email,
        membership_id,
        role,
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, name, address, email, membership_id, role FROM profiles \
             WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(profile_from_row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, name, address, email, membership_id, role FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(profile_from_row))
    }

    async fn add(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO profiles (name, address, email, membership_id, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&profile.name)
        .bind(&profile.address)
        .bind(&profile.email)
        .bind(&profile.membership_id)
        .bind(&profile.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_err(e, "profile already exists"))?;
        Ok(Profile {
            id,
            name: profile.name,
            address: profile.address,
            email: profile.email,
            membership_id: profile.membership_id,
            role: profile.role,
        })
    }

    async fn membership_id_exists(&self, membership_id: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE membership_id = $1)",
        )
        .bind(membership_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
