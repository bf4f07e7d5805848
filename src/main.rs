//! Suite - Personal dashboard server
//!
//! Serves the dashboard site through the offline asset cache and runs the
//! widget refresh loops.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use suite::clock::SystemClock;
use suite::net::{Fetcher, HttpFetcher, StaticDirFetcher};
use suite::storage::FileStore;
use suite::{create_router, spawn_poller, AppState, Config};

/// Main entry point for the dashboard server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the persistent state file
/// 4. Install and activate the service worker
/// 5. Start the saint and weather pollers
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "suite=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Suite dashboard server");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: origin={}, cache={}, strategy={}, port={}",
        config.origin,
        config.cache_name(),
        config.fetch_strategy,
        config.server_port
    );

    let store = Arc::new(
        FileStore::open(&config.state_file)
            .with_context(|| format!("opening state file {}", config.state_file))?,
    );

    let origin: Arc<dyn Fetcher> = if config.origin.starts_with("http") {
        Arc::new(HttpFetcher::new(Some(config.origin.clone())).context("building origin client")?)
    } else {
        Arc::new(StaticDirFetcher::new(&config.origin))
    };
    let network = Arc::new(HttpFetcher::new(None).context("building network client")?);

    let state = AppState::new(&config, origin, network, store, Arc::new(SystemClock));

    // A failed install leaves the worker redundant; requests then go
    // straight to the origin.
    match state.worker.install().await {
        Ok(count) => {
            let removed = state.worker.activate().await?;
            info!(
                "Service worker {} active with {} assets, removed {:?}",
                state.worker.cache_name(),
                count,
                removed
            );
        }
        Err(err) => error!("Service worker install failed, serving uncached: {}", err),
    }

    // Resume a lockout that was running before a restart
    state.start_countdown();

    let palette = state.colors.default_palette().await;
    info!("Resolved {} palette colours", palette.len());
    for entry in &palette {
        debug!("{} = {} ({})", entry.variable, entry.hex, entry.rgb);
    }

    let pollers = spawn_pollers(&state, &config);
    info!("Started {} background pollers", pollers.len());

    // Create router with all endpoints
    let app = create_router(state.clone());

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pollers))
        .await
        .context("server error")?;

    state.stop_countdown();
    info!("Server shutdown complete");
    Ok(())
}

fn spawn_pollers(state: &AppState, config: &Config) -> Vec<JoinHandle<()>> {
    let mut pollers = Vec::new();

    let saint = Arc::clone(&state.saint);
    pollers.push(spawn_poller(
        "saint",
        Duration::from_secs(config.saint_poll_secs),
        move || {
            let saint = Arc::clone(&saint);
            async move {
                saint.refresh().await;
            }
        },
    ));

    match &state.weather {
        Some(weather) => {
            let weather = Arc::clone(weather);
            pollers.push(spawn_poller(
                "weather",
                Duration::from_secs(config.weather_poll_secs),
                move || {
                    let weather = Arc::clone(&weather);
                    async move {
                        weather.refresh().await;
                    }
                },
            ));
        }
        None => warn!("WEATHER_API_KEY not set, weather widget disabled"),
    }

    pollers
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the pollers and allows graceful shutdown.
async fn shutdown_signal(pollers: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for poller in &pollers {
        poller.abort();
    }
    warn!("Aborted {} pollers", pollers.len());
}
