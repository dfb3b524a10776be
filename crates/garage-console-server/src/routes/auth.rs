//! Console session routes: `/auth/*`
//!
//! `POST /auth/login` is public and concurrency-limited; `GET /auth/session`
//! sits behind the session middleware.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use garage_console_core::session::{Role, SessionClaims};

use crate::error::AppError;
use crate::state::AppState;

/// Maximum concurrent login attempts.
pub const LOGIN_CONCURRENCY_LIMIT: usize = 10;

/// Build the public login router.
pub fn login_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .layer(tower::limit::ConcurrencyLimitLayer::new(LOGIN_CONCURRENCY_LIMIT))
}

/// Build the session-gated `/auth/session` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/auth/session", get(session))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Exchange the admin password for a session token.
async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(body) = body?;

    let matches: bool = body
        .password
        .as_bytes()
        .ct_eq(state.admin_password.as_bytes())
        .into();
    if !matches {
        warn!("console login rejected");
        return Err(AppError::Unauthorized("invalid credentials".to_owned()));
    }

    let (token, claims) = state.sessions.issue(Role::Admin)?;
    let expires_at = claims
        .expires_at()
        .ok_or_else(|| AppError::Internal("session expiry out of range".to_owned()))?;

    info!(%expires_at, "console session issued");
    Ok(Json(LoginResponse { token, expires_at }))
}

/// Return the verified claims of the calling session.
async fn session(Extension(claims): Extension<SessionClaims>) -> Json<SessionClaims> {
    Json(claims)
}
