//! Request and response models for the HTTP API.
//!
//! Wire format is camelCase JSON.

use serde::{Deserialize, Serialize};

/// Error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code (e.g. `conflict`).
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

/// `POST /auth/register` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub email: String,
    pub password: String,
}

/// `POST /auth/register` response body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    /// Profile id of the new member.
    pub user_id: i64,
    pub membership_id: String,
    pub role: String,
}

/// `POST /auth/login` request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /auth/login` response body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Compact signed session token.
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    /// Profile id (the token's subject).
    pub user_id: i64,
    pub membership_id: String,
    pub name: String,
    pub roles: Vec<String>,
}

/// `GET /auth/user` response body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub membership_id: String,
    pub address: Option<String>,
    pub roles: Vec<String>,
    pub is_admin: bool,
}

/// `POST /auth/logout` response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}
