//! HTTP route handlers for the Garage console.
//!
//! Routes are organized by concern:
//! - `health`: liveness probe (public)
//! - `auth`: login (public, concurrency-limited) and session introspection
//! - `clusters`: cluster bookkeeping
//! - `proxy`: authenticated reverse proxy to cluster admin APIs

pub mod auth;
pub mod clusters;
pub mod health;
pub mod proxy;

use std::sync::Arc;

use axum::http::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware as axum_mw;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::session_middleware;
use crate::state::AppState;

/// Build the full application router with all routes and middleware.
///
/// `cors_origin` restricts browser access to one origin; `None` allows any.
pub fn router(state: Arc<AppState>, cors_origin: Option<HeaderValue>) -> Router {
    let authenticated_routes = Router::new()
        .merge(auth::router())
        .merge(clusters::router())
        .merge(proxy::router())
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            session_middleware,
        ));

    let allow_origin = cors_origin.map_or_else(AllowOrigin::any, AllowOrigin::exact);
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT, AUTHORIZATION]);

    Router::new()
        .merge(health::router())
        .merge(auth::login_router())
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        // Proxied responses keep the upstream's cache policy.
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
