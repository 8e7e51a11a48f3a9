//! Open Dispatch Console
//!
//! A headless fleet monitor: subscribes to the live event stream,
//! projects driver positions into the in-memory store and logs periodic
//! fleet summaries.

mod config;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::FileConfig;
use odc_core::live::LiveSession;
use odc_core::store::LiveStateStore;
use odc_core::stream::{EnvToken, StreamConfig, TokenProvider};
use odc_sdk::objects::Channel;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Open Dispatch Console - headless dispatch fleet monitor
#[derive(Parser, Debug)]
#[command(name = "odc-console")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./odc-config.toml")]
    config: PathBuf,

    /// Tail a single driver's channel instead of the fleet-wide admin stream
    #[arg(long)]
    driver: Option<i64>,

    /// Override the server base URL from the configuration file
    #[arg(long)]
    base_url: Option<Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting odc-console v{}", env!("CARGO_PKG_VERSION"));

    let config = FileConfig::load(&args.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // The token is re-read from the environment on every reconnect, but a
    // missing variable at startup is a configuration mistake worth failing
    // on immediately.
    if std::env::var(&config.auth.token_env).is_err() {
        tracing::error!("{} environment variable not set", config.auth.token_env);
        anyhow::bail!("environment variable {} not set", config.auth.token_env);
    }

    let base_url = args.base_url.unwrap_or_else(|| config.server.base_url.clone());
    let channel = match args.driver {
        Some(id) => Channel::Driver(id),
        None => Channel::Admin,
    };
    let tokens: Arc<dyn TokenProvider> = Arc::new(EnvToken::new(config.auth.token_env.clone()));

    tracing::info!(%channel, %base_url, "Subscribing to event stream");
    let session = LiveSession::start(channel, StreamConfig::new(base_url), tokens).await;

    let mut summary =
        tokio::time::interval(Duration::from_secs(config.console.summary_interval_secs));
    summary.tick().await; // skip immediate tick

    let shutdown = shutdown::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = summary.tick() => log_summary(session.store()).await,
        }
    }

    session.shutdown().await;
    tracing::info!("Console shutdown complete");

    Ok(())
}

/// Log one fleet summary line, plus per-driver positions at debug.
async fn log_summary(store: &LiveStateStore) {
    let snapshot = store.snapshot().await;

    tracing::info!(
        connection = %snapshot.connection,
        drivers = snapshot.drivers.len(),
        last_update = ?snapshot.last_update,
        "fleet summary"
    );

    for location in snapshot.drivers.values() {
        tracing::debug!(
            driver_id = location.driver_id,
            lat = location.lat,
            lng = location.lng,
            recorded_at = %location.recorded_at,
            "driver position"
        );
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
