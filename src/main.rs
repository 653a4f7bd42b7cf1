//! Back/lay arbitrage scanner entry point.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use backlay_arb::api::{create_router, AppState};
use backlay_arb::config::Config;
use backlay_arb::metrics;
use backlay_arb::poller::Poller;
use backlay_arb::utils::shutdown_signal;

/// Back/lay arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "backlay-arb")]
#[command(about = "Scans bookmaker and exchange odds for back/lay arbitrage and sends alerts")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Run a single scan and exit.
    #[arg(long)]
    once: bool,

    /// HTTP server port for health/metrics (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("backlay_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration
    info!("Loading configuration...");
    let config = Config::from_env().map_err(|e| {
        error!("{}", e);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("Min profit: {}%", config.min_profit_pct);
    info!("Bankroll: {}", config.bankroll);
    info!("Poll interval: {}s", config.poll_interval_secs);
    info!(
        "Sports: {}",
        if config.sports.is_empty() { "all active" } else { config.sports.as_str() }
    );

    let mut poller = Poller::from_config(&config)?;

    if args.once {
        info!("Running a single scan...");
        poller.step().await;
        return Ok(());
    }

    // Initialize metrics
    let mut app_state = AppState::new();
    match metrics::install_prometheus() {
        Ok(handle) => app_state = app_state.with_metrics(handle),
        Err(e) => warn!("Prometheus recorder not installed: {}", e),
    }

    // Start HTTP server
    let port = args.port.unwrap_or(config.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());

    // Spawn HTTP server
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    info!("========================================");
    info!("BACK/LAY ARBITRAGE SCANNER STARTED");
    info!("========================================");

    let mut poller = poller.with_app_state(app_state);
    poller.run_until(shutdown_signal()).await;

    if let Err(e) = server_handle.await? {
        warn!("HTTP server error: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}
