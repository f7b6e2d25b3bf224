//! # Live Score Server
//!
//! Simulates a set of concurrent matches and streams them to browsers.
//!
//! ## Key Features:
//! - **Match Simulator**: one cancellable task per match, one tick per simulated
//!   minute, state written to the cache, the durable store and a per-match feed.
//! - **Realtime Hub**: `GET /ws?userId=...` WebSocket with match rooms, presence
//!   counts, rate-limited chat and self-clearing typing signals.
//! - **Read API**: `/health`, `/api/matches`, `/api/matches/{id}` and a
//!   server-sent event stream per match.
//! - **Scale-out**: with `--run-simulator false` and a shared Redis the process is
//!   a pure hub relaying what another process simulates.
//! - **Configurable**: defaults, then `server_live.conf`, then environment/CLI.

use anyhow::{Context, Result};
use lib_live::{BroadcastHub, ReadPath, SimulationScheduler};
use std::net::SocketAddr;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod live_logic;
use live_logic::{api, backends, config, logger, state};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = config::load_config();
    let _log_guard = logger::setup_logging(&config.log_dir(), config.log_level())?;

    let medium = backends::connect_medium(&config).await?;
    let store = backends::connect_store(&config).await?;

    let scheduler = if config.run_simulator() {
        Some(SimulationScheduler::start(config.simulation_settings(), medium.clone(), store.clone()).await)
    } else {
        info!("Simulator disabled, running as hub only.");
        None
    };

    let shutdown = CancellationToken::new();
    let app_state = state::AppState {
        hub: BroadcastHub::new(medium.clone(), config.relay_retry()),
        read: ReadPath::new(medium, store),
        limits: config.session_limits(),
        shutdown: shutdown.clone(),
    };
    let app = api::router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_shutdown.cancelled().await;
                info!("HTTP server shutting down.");
            })
            .await
    });

    wait_for_signal().await;
    shutdown.cancel();

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    server.await.context("HTTP server task failed")??;

    info!("Shutdown complete.");
    Ok(())
}

async fn wait_for_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(_) => std::future::pending::<()>().await,
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }
}
