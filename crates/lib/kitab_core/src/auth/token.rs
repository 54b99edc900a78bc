//! Session-token issuance and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{IdentityRecord, Profile, TokenClaims};

/// Default session-token lifetime: 30 minutes.
pub const DEFAULT_EXPIRY_SECS: i64 = 30 * 60;

/// Signing configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric HS256 signing secret.
    pub secret: String,
    /// Fixed issuer string checked by verifiers.
    pub issuer: String,
    /// Fixed audience string checked by verifiers.
    pub audience: String,
    /// Token lifetime in seconds from issuance.
    pub expiry_secs: i64,
}

/// A freshly issued session token plus response metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact signed JWS string.
    pub token: String,
    /// Seconds until expiry.
    pub expires_in: i64,
    /// Profile id the token's subject refers to.
    pub user_id: i64,
    pub email: String,
}

/// Issues and verifies HS256 session tokens.
///
/// Construction fails on an empty signing secret so the server refuses to
/// start rather than hand out weakly signed tokens later.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    expiry_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiry_secs", &self.expiry_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::Config("JWT signing secret is empty".into()));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiry_secs: config.expiry_secs,
        })
    }

    /// Issue a signed token for an authenticated identity and its linked
    /// profile.
    ///
    /// The subject is the profile id, not the identity id, so downstream
    /// consumers key on the stable application-level id. Empty profile
    /// attributes are left out of the claim set entirely.
    pub fn issue(
        &self,
        identity: &IdentityRecord,
        roles: &[String],
        profile: &Profile,
    ) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: profile.id.to_string(),
            email: identity.email.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
            name: (!profile.name.is_empty()).then(|| profile.name.clone()),
            address: profile.address.clone().filter(|a| !a.is_empty()),
            membership_id: (!profile.membership_id.is_empty())
                .then(|| profile.membership_id.clone()),
            roles: dedup_roles(roles),
            exp: (now + Duration::seconds(self.expiry_secs)).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))?;
        Ok(IssuedToken {
            token,
            expires_in: self.expiry_secs,
            user_id: profile.id,
            email: identity.email.clone(),
        })
    }

    /// Verify a session token, returning the claims on success.
    ///
    /// Checks signature, expiry (zero clock-skew leeway), issuer, and
    /// audience.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .ok()
            .map(|data| data.claims)
    }
}

/// Deduplicate role values, preserving first-seen order.
fn dedup_roles(roles: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(roles.len());
    for role in roles {
        if !out.contains(role) {
            out.push(role.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig {
            secret: "test-secret".into(),
            issuer: "kitab-ghar".into(),
            audience: "kitab-ghar-clients".into(),
            expiry_secs: DEFAULT_EXPIRY_SECS,
        }
    }

    fn identity() -> IdentityRecord {
        IdentityRecord {
            id: "5f2e7f3a-9d3c-4a1b-8e6f-0123456789ab".into(),
            email: "reader@example.com".into(),
            email_confirmed: false,
        }
    }

    fn profile() -> Profile {
        Profile {
            id: 42,
            name: "Reader".into(),
            address: Some("12 Book Lane".into()),
            email: "reader@example.com".into(),
            membership_id: "MEM-0A1B2C3D".into(),
            role: "Member".into(),
        }
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let config = TokenConfig {
            secret: String::new(),
            ..test_config()
        };
        let err = TokenIssuer::new(&config).expect_err("must refuse empty secret");
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[test]
    fn subject_is_the_profile_id_not_the_identity_id() {
        let issuer = TokenIssuer::new(&test_config()).expect("issuer");
        let issued = issuer
            .issue(&identity(), &["Member".into()], &profile())
            .expect("issue");
        let claims = issuer.verify(&issued.token).expect("verify");
        assert_eq!(claims.sub, "42");
        assert_ne!(claims.sub, identity().id);
        assert_eq!(issued.user_id, 42);
    }

    #[test]
    fn embeds_profile_attributes_and_roles() {
        let issuer = TokenIssuer::new(&test_config()).expect("issuer");
        let roles = vec!["Member".to_string(), "Member".to_string()];
        let issued = issuer.issue(&identity(), &roles, &profile()).expect("issue");
        let claims = issuer.verify(&issued.token).expect("verify");

        assert_eq!(claims.email, "reader@example.com");
        assert_eq!(claims.name.as_deref(), Some("Reader"));
        assert_eq!(claims.address.as_deref(), Some("12 Book Lane"));
        assert_eq!(claims.membership_id.as_deref(), Some("MEM-0A1B2C3D"));
        // Duplicate role values collapse to one claim entry.
        assert_eq!(claims.roles, vec!["Member".to_string()]);
        assert!(!claims.jti.is_empty());
        assert_eq!(claims.exp - claims.iat, DEFAULT_EXPIRY_SECS);
    }

    #[test]
    fn empty_profile_attributes_are_omitted() {
        let issuer = TokenIssuer::new(&test_config()).expect("issuer");
        let bare = Profile {
            name: String::new(),
            address: None,
            membership_id: String::new(),
            ..profile()
        };
        let issued = issuer.issue(&identity(), &[], &bare).expect("issue");
        let claims = issuer.verify(&issued.token).expect("verify");
        assert!(claims.name.is_none());
        assert!(claims.address.is_none());
        assert!(claims.membership_id.is_none());
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn each_issuance_gets_a_fresh_token_id() {
        let issuer = TokenIssuer::new(&test_config()).expect("issuer");
        let a = issuer.issue(&identity(), &[], &profile()).expect("issue");
        let b = issuer.issue(&identity(), &[], &profile()).expect("issue");
        let ja = issuer.verify(&a.token).expect("verify").jti;
        let jb = issuer.verify(&b.token).expect("verify").jti;
        assert_ne!(ja, jb);
    }

    #[test]
    fn rejects_a_token_past_its_window() {
        let issuer = TokenIssuer::new(&test_config()).expect("issuer");
        let now = Utc::now().timestamp();
        let expired = TokenClaims {
            sub: "42".into(),
            email: "reader@example.com".into(),
            iss: "kitab-ghar".into(),
            aud: "kitab-ghar-clients".into(),
            jti: "stale".into(),
            name: None,
            address: None,
            membership_id: None,
            roles: vec![],
            exp: now - 1,
            iat: now - DEFAULT_EXPIRY_SECS - 1,
        };
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("encode");
        assert!(issuer.verify(&token).is_none());
    }

    #[test]
    fn rejects_foreign_issuer_and_audience() {
        let issuer = TokenIssuer::new(&test_config()).expect("issuer");
        let other = TokenIssuer::new(&TokenConfig {
            issuer: "someone-else".into(),
            ..test_config()
        })
        .expect("issuer");
        let issued = other.issue(&identity(), &[], &profile()).expect("issue");
        assert!(issuer.verify(&issued.token).is_none());
    }

    #[test]
    fn rejects_a_tampered_signature() {
        let issuer = TokenIssuer::new(&test_config()).expect("issuer");
        let forged = TokenIssuer::new(&TokenConfig {
            secret: "other-secret".into(),
            ..test_config()
        })
        .expect("issuer");
        let issued = forged.issue(&identity(), &[], &profile()).expect("issue");
        assert!(issuer.verify(&issued.token).is_none());
    }
}
