//! Passgate Server - passkey ceremonies and one-time code exchange
//!
//! Exposes passgate-core over HTTP:
//! - POST /webauthn/registration/{options,verify}
//! - POST /webauthn/authentication/{options,verify}
//! - POST /oauth/token
//! - GET /api/user
//! - GET /health

use std::net::SocketAddr;

use anyhow::Context;
use passgate_server::sweeper::spawn_sweeper;
use passgate_server::{create_router_with_state, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passgate_server=debug,passgate_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    let addr = config.socket_addr();

    tracing::info!(
        rp_id = %config.authority.rp_id,
        origin = %config.authority.origin,
        "Relying party configured"
    );

    let state = AppState::with_webauthn(config.authority.clone());

    let sweeper = config.sweep_interval().map(|interval| {
        tracing::info!(interval_secs = interval.as_secs(), "Expiry sweeper enabled");
        spawn_sweeper(state.authority.clone(), interval)
    });

    let app = create_router_with_state(&config, state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Passgate server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
