//! Garage console HTTP server.
//!
//! Wires the core library and the cluster registry into a running Axum
//! server: a session-gated reverse proxy at `/proxy/{cluster_id}/*`, cluster
//! bookkeeping at `/clusters`, login at `/auth/login`, and `/health`.

pub mod config;
pub mod error;
pub mod hardening;
pub mod middleware;
pub mod routes;
pub mod state;
