//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CurrentUserResponse, LoginRequest, LogoutResponse, RegisterRequest, RegisterResponse,
    TokenResponse,
};
use crate::services::auth;

/// `POST /auth/register` — create identity + profile for a new member.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    let resp = auth::register(
        state.identities.as_ref(),
        state.profiles.as_ref(),
        &state.config,
        &body.name,
        body.address.as_deref(),
        &body.email,
        &body.password,
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(
        state.identities.as_ref(),
        state.profiles.as_ref(),
        &state.issuer,
        &body.email,
        &body.password,
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /auth/logout` — stateless acknowledgement; sessions end when the
/// token's embedded expiry passes.
pub async fn logout_handler() -> Json<LogoutResponse> {
    Json(LogoutResponse {
        message: "Logged out successfully.".into(),
    })
}

/// `GET /auth/user` — profile view for the authenticated caller.
pub async fn current_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> AppResult<Json<CurrentUserResponse>> {
    let resp = auth::current_user(state.profiles.as_ref(), &claims).await?;
    Ok(Json(resp))
}
