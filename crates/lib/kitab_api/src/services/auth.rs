//! Authentication flows — registration, login, and current-user lookup.

use tracing::{info, warn};

use kitab_core::auth::membership;
use kitab_core::auth::token::TokenIssuer;
use kitab_core::auth::{AuthError, ROLE_ADMIN, ROLE_MEMBER};
use kitab_core::models::auth::{NewProfile, Profile, TokenClaims};
use kitab_core::store::{IdentityStore, ProfileStore};

use crate::config::{ApiConfig, RoleAttachPolicy};
use crate::error::{AppError, AppResult};
use crate::models::{CurrentUserResponse, RegisterResponse, TokenResponse};

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LEN: usize = 6;

/// Register a new member: create the identity record, generate a membership
/// id, insert the profile, and attach the resolved role to the identity.
pub async fn register(
    identities: &dyn IdentityStore,
    profiles: &dyn ProfileStore,
    config: &ApiConfig,
    name: &str,
    address: Option<&str>,
    email: &str,
    password: &str,
) -> AppResult<RegisterResponse> {
    let email = normalize_email(email);
    validate_registration(name, &email, password)?;

    if identities.find_by_email(&email).await?.is_some() {
        return Err(AuthError::EmailTaken.into());
    }

    // The pre-check above is an optimisation; the store's unique constraint
    // is what actually stops a concurrent duplicate registration.
    let identity = identities.create(&email, password).await?;

    let membership_id = membership::generate(profiles).await?;
    let role = resolve_role(&email, &config.admin_emails);

    let profile = profiles
        .add(NewProfile {
            name: name.trim().to_string(),
            address: address.map(str::trim).filter(|a| !a.is_empty()).map(String::from),
            email: email.clone(),
            membership_id,
            role: role.to_string(),
        })
        .await?;

    // The identity and profile writes are not atomic across the two stores;
    // a role-attach failure lands after the profile is already committed.
    if let Err(e) = identities.add_role(&identity.id, role).await {
        match config.role_attach {
            RoleAttachPolicy::Warn => {
                warn!(email = %email, role, error = %e, "role attachment failed after profile commit");
            }
            RoleAttachPolicy::Strict => return Err(e.into()),
        }
    }

    info!(user_id = profile.id, membership_id = %profile.membership_id, role, "member registered");

    Ok(RegisterResponse {
        message: "Member registered successfully.".into(),
        user_id: profile.id,
        membership_id: profile.membership_id,
        role: role.to_string(),
    })
}

/// Authenticate with email + password and issue a session token.
pub async fn login(
    identities: &dyn IdentityStore,
    profiles: &dyn ProfileStore,
    issuer: &TokenIssuer,
    email: &str,
    password: &str,
) -> AppResult<TokenResponse> {
    let email = normalize_email(email);

    // Unknown email and wrong password collapse into one failure shape.
    let Some(identity) = identities.find_by_email(&email).await? else {
        return Err(AuthError::CredentialError.into());
    };
    if !identities.check_password(&identity, password).await? {
        return Err(AuthError::CredentialError.into());
    }

    let roles = identities.roles(&identity.id).await?;
    let profile = profiles
        .find_by_email(&identity.email)
        .await?
        .ok_or_else(|| AuthError::ProfileNotFound(identity.email.clone()))?;

    let issued = issuer.issue(&identity, &roles, &profile)?;

    Ok(TokenResponse {
        token: issued.token,
        expires_in: issued.expires_in,
        user_id: issued.user_id,
        membership_id: profile.membership_id,
        name: profile.name,
        roles,
    })
}

/// Resolve the caller's profile from verified token claims.
///
/// The subject is tried as the integer profile id first; when it does not
/// resolve, the email claim serves as the fallback lookup key.
pub async fn current_user(
    profiles: &dyn ProfileStore,
    claims: &TokenClaims,
) -> AppResult<CurrentUserResponse> {
    let profile = match claims.sub.parse::<i64>() {
        Ok(id) => match profiles.find_by_id(id).await? {
            Some(profile) => Some(profile),
            None => find_by_email_claim(profiles, claims).await?,
        },
        Err(_) => find_by_email_claim(profiles, claims).await?,
    };

    let Some(profile) = profile else {
        return Err(AppError::NotFound("Profile not found.".into()));
    };

    let is_admin = claims.roles.iter().any(|r| r == ROLE_ADMIN);
    Ok(CurrentUserResponse {
        id: profile.id,
        name: profile.name,
        email: profile.email,
        membership_id: profile.membership_id,
        address: profile.address,
        roles: claims.roles.clone(),
        is_admin,
    })
}

async fn find_by_email_claim(
    profiles: &dyn ProfileStore,
    claims: &TokenClaims,
) -> Result<Option<Profile>, AppError> {
    if claims.email.is_empty() {
        return Err(AppError::Unauthorized(
            "No usable identifier in token claims.".into(),
        ));
    }
    Ok(profiles.find_by_email(&claims.email).await?)
}

fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name is required.".into()));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("Email is not a valid address.".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

/// Syntactic email check: one `@`, non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Reserved administrator addresses register as `Admin`; everyone else is a
/// `Member`.
fn resolve_role(email: &str, admin_emails: &[String]) -> &'static str {
    if admin_emails.iter().any(|a| a.eq_ignore_ascii_case(email)) {
        ROLE_ADMIN
    } else {
        ROLE_MEMBER
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use kitab_core::auth::token::{DEFAULT_EXPIRY_SECS, TokenConfig};
    use kitab_core::store::mem::{MemIdentityStore, MemProfileStore};

    use super::*;

    fn test_config() -> ApiConfig {
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: "postgres://localhost:5432/kitab_ghar_test".into(),
            token: TokenConfig {
                secret: "test-secret".into(),
                issuer: "kitab-ghar".into(),
                audience: "kitab-ghar-clients".into(),
                expiry_secs: DEFAULT_EXPIRY_SECS,
            },
            admin_emails: vec!["kitab-ghar-admin@gmail.com".into()],
            role_attach: RoleAttachPolicy::Warn,
        }
    }

    fn issuer(config: &ApiConfig) -> TokenIssuer {
        TokenIssuer::new(&config.token).expect("issuer")
    }

    async fn register_ok(
        identities: &MemIdentityStore,
        profiles: &MemProfileStore,
        config: &ApiConfig,
        email: &str,
    ) -> RegisterResponse {
        register(
            identities,
            profiles,
            config,
            "Test Reader",
            Some("12 Book Lane"),
            email,
            "secret-pass",
        )
        .await
        .expect("register")
    }

    #[tokio::test]
    async fn registration_creates_both_records() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        let resp = register_ok(&identities, &profiles, &config, "reader@example.com").await;

        assert_eq!(resp.message, "Member registered successfully.");
        assert_eq!(resp.role, ROLE_MEMBER);
        assert!(resp.membership_id.starts_with("MEM-"));

        let identity = identities
            .find_by_email("reader@example.com")
            .await
            .expect("lookup")
            .expect("identity exists");
        assert_eq!(
            identities.roles(&identity.id).await.expect("roles"),
            vec![ROLE_MEMBER.to_string()]
        );
        let profile = profiles
            .find_by_id(resp.user_id)
            .await
            .expect("lookup")
            .expect("profile exists");
        assert_eq!(profile.email, "reader@example.com");
        assert_eq!(profile.role, ROLE_MEMBER);
    }

    #[tokio::test]
    async fn second_registration_with_same_email_conflicts() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        register_ok(&identities, &profiles, &config, "reader@example.com").await;

        let err = register(
            &identities,
            &profiles,
            &config,
            "Other Reader",
            None,
            "Reader@Example.com",
            "secret-pass",
        )
        .await
        .expect_err("duplicate must fail");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_duplicate_registrations_yield_one_success() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());

        // Both can pass the email pre-check; the store's uniqueness guard
        // decides the winner.
        let (a, b) = tokio::join!(
            register(
                &identities,
                &profiles,
                &config,
                "Reader A",
                None,
                "reader@example.com",
                "secret-pass",
            ),
            register(
                &identities,
                &profiles,
                &config,
                "Reader B",
                None,
                "reader@example.com",
                "secret-pass",
            ),
        );

        assert_eq!(
            u8::from(a.is_ok()) + u8::from(b.is_ok()),
            1,
            "exactly one registration succeeds"
        );
        let err = a.err().or(b.err()).expect("one failure");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn reserved_admin_email_registers_as_admin() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        let resp = register_ok(&identities, &profiles, &config, "kitab-ghar-admin@gmail.com").await;
        assert_eq!(resp.role, ROLE_ADMIN);

        let resp = register_ok(&identities, &profiles, &config, "reader@example.com").await;
        assert_eq!(resp.role, ROLE_MEMBER);
    }

    #[tokio::test]
    async fn rejects_malformed_input_with_field_detail() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());

        let cases = [
            ("", "reader@example.com", "secret-pass", "Name"),
            ("Reader", "not-an-email", "secret-pass", "Email"),
            ("Reader", "reader@example.com", "short", "Password"),
        ];
        for (name, email, password, field) in cases {
            let err = register(&identities, &profiles, &config, name, None, email, password)
                .await
                .expect_err("must fail validation");
            match err {
                AppError::Validation(msg) => {
                    assert!(msg.contains(field), "message {msg:?} names {field}")
                }
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn role_attach_failure_is_swallowed_under_warn_policy() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        identities.fail_add_role.store(true, Ordering::Relaxed);

        let resp = register_ok(&identities, &profiles, &config, "reader@example.com").await;
        assert_eq!(resp.role, ROLE_MEMBER);

        // Profile committed, identity role set left empty.
        let identity = identities
            .find_by_email("reader@example.com")
            .await
            .expect("lookup")
            .expect("identity exists");
        assert!(identities.roles(&identity.id).await.expect("roles").is_empty());
    }

    #[tokio::test]
    async fn role_attach_failure_fails_the_request_under_strict_policy() {
        let (identities, profiles, mut config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        config.role_attach = RoleAttachPolicy::Strict;
        identities.fail_add_role.store(true, Ordering::Relaxed);

        let err = register(
            &identities,
            &profiles,
            &config,
            "Test Reader",
            None,
            "reader@example.com",
            "secret-pass",
        )
        .await
        .expect_err("strict policy must surface the failure");
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn login_token_subject_is_the_profile_id() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        let issuer = issuer(&config);
        let registered = register_ok(&identities, &profiles, &config, "reader@example.com").await;

        let resp = login(&identities, &profiles, &issuer, "reader@example.com", "secret-pass")
            .await
            .expect("login");

        assert_eq!(resp.user_id, registered.user_id);
        assert_eq!(resp.membership_id, registered.membership_id);
        assert_eq!(resp.expires_in, DEFAULT_EXPIRY_SECS);
        assert_eq!(resp.roles, vec![ROLE_MEMBER.to_string()]);

        let claims = issuer.verify(&resp.token).expect("verify");
        assert_eq!(claims.sub, registered.user_id.to_string());
        assert_eq!(claims.roles, vec![ROLE_MEMBER.to_string()]);
        assert_eq!(claims.membership_id.as_deref(), Some(registered.membership_id.as_str()));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        let issuer = issuer(&config);
        register_ok(&identities, &profiles, &config, "reader@example.com").await;

        let wrong_password =
            login(&identities, &profiles, &issuer, "reader@example.com", "bad-pass")
                .await
                .expect_err("must fail");
        let unknown_email =
            login(&identities, &profiles, &issuer, "nobody@example.com", "secret-pass")
                .await
                .expect_err("must fail");

        let as_pair = |e: &AppError| match e {
            AppError::Unauthorized(m) => m.clone(),
            other => panic!("expected unauthorized, got {other:?}"),
        };
        assert_eq!(as_pair(&wrong_password), as_pair(&unknown_email));
    }

    #[tokio::test]
    async fn login_without_a_linked_profile_is_not_found() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        let issuer = issuer(&config);
        identities
            .create("orphan@example.com", "secret-pass")
            .await
            .expect("create identity");

        let err = login(&identities, &profiles, &issuer, "orphan@example.com", "secret-pass")
            .await
            .expect_err("must fail");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn current_user_resolves_by_subject_then_email() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        let issuer = issuer(&config);
        register_ok(&identities, &profiles, &config, "reader@example.com").await;
        let resp = login(&identities, &profiles, &issuer, "reader@example.com", "secret-pass")
            .await
            .expect("login");
        let mut claims = issuer.verify(&resp.token).expect("verify");

        let view = current_user(&profiles, &claims).await.expect("current user");
        assert_eq!(view.id, resp.user_id);
        assert_eq!(view.email, "reader@example.com");
        assert!(!view.is_admin);

        // A non-numeric subject falls back to the email claim.
        claims.sub = "not-a-profile-id".into();
        let view = current_user(&profiles, &claims).await.expect("email fallback");
        assert_eq!(view.id, resp.user_id);
    }

    #[tokio::test]
    async fn current_user_without_usable_identifier_is_unauthorized() {
        let (identities, profiles, config) =
            (MemIdentityStore::default(), MemProfileStore::default(), test_config());
        let issuer = issuer(&config);
        register_ok(&identities, &profiles, &config, "reader@example.com").await;
        let resp = login(&identities, &profiles, &issuer, "reader@example.com", "secret-pass")
            .await
            .expect("login");
        let mut claims = issuer.verify(&resp.token).expect("verify");

        claims.sub = "not-a-profile-id".into();
        claims.email = String::new();
        let err = current_user(&profiles, &claims).await.expect_err("must fail");
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn email_validation_covers_the_edges() {
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("reader"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("reader@"));
        assert!(!is_valid_email("reader@example"));
        assert!(!is_valid_email("reader@.com"));
        assert!(!is_valid_email("reader@example.com."));
        assert!(!is_valid_email("reader@exa@mple.com"));
    }
}
