//! API server configuration.

use thiserror::Error;

use kitab_core::auth::token::{DEFAULT_EXPIRY_SECS, TokenConfig};

/// Reserved administrator address used when `ADMIN_EMAILS` is unset.
const DEFAULT_ADMIN_EMAIL: &str = "kitab-ghar-admin@gmail.com";

/// Errors raised while assembling configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET (or AUTH_SECRET) must be set and non-empty")]
    MissingSecret,

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// What to do when attaching the role to the identity record fails after the
/// profile has already been committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleAttachPolicy {
    /// Log a warning and still report the registration as successful.
    Warn,
    /// Fail the registration request.
    Strict,
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Session-token signing configuration.
    pub token: TokenConfig,
    /// Addresses that register with the `Admin` role (case-insensitive).
    pub admin_emails: Vec<String>,
    /// Role-attachment failure policy.
    pub role_attach: RoleAttachPolicy,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable             | Default                                |
    /// |----------------------|----------------------------------------|
    /// | `BIND_ADDR`          | `127.0.0.1:3100`                       |
    /// | `DATABASE_URL`       | `postgres://localhost:5432/kitab_ghar` |
    /// | `JWT_SECRET` / `AUTH_SECRET` | required, non-empty            |
    /// | `JWT_ISSUER`         | `kitab-ghar`                           |
    /// | `JWT_AUDIENCE`       | `kitab-ghar-clients`                   |
    /// | `TOKEN_EXPIRY_SECS`  | `1800`                                 |
    /// | `ADMIN_EMAILS`       | `kitab-ghar-admin@gmail.com`           |
    /// | `ROLE_ATTACH_POLICY` | `warn`                                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env_non_empty("JWT_SECRET")
            .or_else(|| env_non_empty("AUTH_SECRET"))
            .ok_or(ConfigError::MissingSecret)?;

        let expiry_secs = match std::env::var("TOKEN_EXPIRY_SECS") {
            Err(_) => DEFAULT_EXPIRY_SECS,
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Invalid("TOKEN_EXPIRY_SECS", raw))?,
        };

        let role_attach = match std::env::var("ROLE_ATTACH_POLICY") {
            Err(_) => RoleAttachPolicy::Warn,
            Ok(raw) => match raw.as_str() {
                "warn" => RoleAttachPolicy::Warn,
                "strict" => RoleAttachPolicy::Strict,
                _ => return Err(ConfigError::Invalid("ROLE_ATTACH_POLICY", raw)),
            },
        };

        let admin_emails = std::env::var("ADMIN_EMAILS")
            .unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.into())
            .split(',')
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/kitab_ghar".into()),
            token: TokenConfig {
                secret,
                issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "kitab-ghar".into()),
                audience: std::env::var("JWT_AUDIENCE")
                    .unwrap_or_else(|_| "kitab-ghar-clients".into()),
                expiry_secs,
            },
            admin_emails,
            role_attach,
        })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
