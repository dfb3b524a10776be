//! Session middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies the session token, and
//! injects the verified [`SessionClaims`] into the request extensions for
//! downstream handlers. A missing or malformed header is 401; a token that
//! does not verify (bad signature, expired, garbage) is 403.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use garage_console_core::session::SessionClaims;

use crate::error::AppError;
use crate::state::AppState;

/// Middleware that gates a router behind a valid console session.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&req) else {
        return AppError::Unauthorized("missing or malformed bearer token".to_owned())
            .into_response();
    };

    match state.sessions.verify(token) {
        Ok(claims) => {
            req.extensions_mut().insert::<SessionClaims>(claims);
            next.run(req).await
        }
        Err(e) => {
            debug!(error = %e, path = %req.uri().path(), "session rejected");
            AppError::from(e).into_response()
        }
    }
}

/// The token of a well-formed `Bearer <token>` header.
fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
