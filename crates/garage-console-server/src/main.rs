//! Garage console server entry point.
//!
//! Loads configuration, hardens the process, opens the cluster registry,
//! then starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use garage_console_core::crypto::TokenCipher;
use garage_console_core::session::SessionAuthenticator;
use garage_console_core::transport::ReqwestTransport;
use garage_console_storage::{ClusterRegistry, MemoryRegistry};

use garage_console_server::config::{ServerConfig, StorageBackendType};
use garage_console_server::hardening;
use garage_console_server::routes;
use garage_console_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Runs before logging is initialized, so warnings go to stderr.
    apply_hardening(&config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = config.storage_backend.kind(), "garage console starting");

    let state = build_app_state(&config).await?;
    let app = routes::router(state, config.cors_origin.clone());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "garage console listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("garage console stopped");
    Ok(())
}

async fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let registry: Arc<dyn ClusterRegistry> = match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory cluster registry (data will not persist)");
            Arc::new(MemoryRegistry::new())
        }
        #[cfg(feature = "postgres-backend")]
        StorageBackendType::Postgres { url } => {
            info!(url = %"[redacted]", "using PostgreSQL cluster registry");
            Arc::new(
                garage_console_storage::PostgresRegistry::connect(url)
                    .await
                    .context("failed to connect to PostgreSQL registry")?,
            )
        }
        #[cfg(not(feature = "postgres-backend"))]
        StorageBackendType::Postgres { .. } => {
            anyhow::bail!(
                "PostgreSQL registry requested but feature 'postgres-backend' is not enabled"
            );
        }
    };

    let cipher = TokenCipher::new(config.encryption_key.clone());
    let sessions = SessionAuthenticator::new(config.session_secret.as_bytes(), config.session_ttl)
        .context("failed to build session authenticator")?;
    let transport = ReqwestTransport::new().context("failed to build upstream client")?;

    Ok(Arc::new(AppState::new(
        registry,
        cipher,
        sessions,
        Arc::new(transport),
        config.upstream_timeout,
        config.admin_password.clone(),
    )))
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}

#[allow(clippy::print_stderr)]
fn apply_hardening(config: &ServerConfig) {
    if let Err(e) = hardening::disable_core_dumps() {
        eprintln!("WARNING: failed to disable core dumps: {e}");
    }

    if config.disable_mlock {
        eprintln!(
            "WARNING: mlock disabled via CONSOLE_DISABLE_MLOCK, credentials may be swapped to disk"
        );
    } else if let Err(e) = hardening::lock_memory() {
        eprintln!("WARNING: failed to lock memory: {e} (set CONSOLE_DISABLE_MLOCK=true for dev)");
    }
}
