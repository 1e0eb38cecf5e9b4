//! splitwatch demo gateway.
//!
//! Serves the demo router with `Server-Timing` emission configured from
//! `$SPLITWATCH_CONFIG` (default `splitwatch.yaml`).

use tracing_subscriber::{fmt, EnvFilter};

use splitwatch_gateway::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var("SPLITWATCH_CONFIG").unwrap_or_else(|_| "splitwatch.yaml".into());
    let cfg = config::load_from_file(&path)?;

    let state = app_state::AppState::new(cfg)?;
    let listen = state.cfg().gateway.listen_addr()?;
    let app = router::build_router(state);

    tracing::info!(%listen, "splitwatch-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, starting graceful shutdown");
}
