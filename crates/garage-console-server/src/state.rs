//! Shared application state for the Garage console server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. Everything in it is read-only after start; the
//! cluster registry owns its own consistency.

use std::sync::Arc;
use std::time::Duration;

use garage_console_core::crypto::TokenCipher;
use garage_console_core::forward::Forwarder;
use garage_console_core::proxy::ProxyService;
use garage_console_core::session::SessionAuthenticator;
use garage_console_core::transport::UpstreamTransport;
use garage_console_storage::ClusterRegistry;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Registered clusters (ciphertext tokens only).
    pub registry: Arc<dyn ClusterRegistry>,
    /// Token cipher under the process-wide key.
    pub cipher: Arc<TokenCipher>,
    /// Session issue/verify.
    pub sessions: Arc<SessionAuthenticator>,
    /// Lookup, decrypt and forward pipeline for `/proxy`.
    pub proxy: ProxyService,
    /// Password accepted by `POST /auth/login`.
    pub admin_password: String,
}

impl AppState {
    /// Wire the proxy pipeline from its collaborators.
    pub fn new(
        registry: Arc<dyn ClusterRegistry>,
        cipher: TokenCipher,
        sessions: SessionAuthenticator,
        transport: Arc<dyn UpstreamTransport>,
        upstream_timeout: Duration,
        admin_password: String,
    ) -> Self {
        let cipher = Arc::new(cipher);
        let proxy = ProxyService::new(
            Arc::clone(&registry),
            Arc::clone(&cipher),
            Forwarder::new(transport, upstream_timeout),
        );

        Self {
            registry,
            cipher,
            sessions: Arc::new(sessions),
            proxy,
            admin_password,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}
