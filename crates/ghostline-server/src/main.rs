//! Ghostline server binary
//!
//! Wires the in-memory store, registry, limiter, and classifier behind
//! the HTTP router, and runs the scheduled sweep off the request path.

use anyhow::Result;
use clap::Parser;
use ghostline_core::SystemClock;
use ghostline_server::{
    router, AppState, ChannelAlertSink, HoneypotClassifier, MemoryStore, RateLimiter, ServerConfig,
    SessionRegistry,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ghostline-server")]
#[command(about = "Ephemeral session registry with honeypot detection", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overriding the configuration file
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(SessionRegistry::new(
        store.clone(),
        clock.clone(),
        config.registry(),
    ));
    let limiter = Arc::new(RateLimiter::new(
        store.clone(),
        clock.clone(),
        config.rate_limit(),
    ));

    let (alert_sink, mut alerts) = ChannelAlertSink::new(config.alert_buffer);
    // Alerts surface on the live notification channel of the session's
    // transport; until a transport is attached they are drained to logs
    tokio::spawn(async move {
        while let Some(alert) = alerts.recv().await {
            info!(creator = %alert.creator, at_ms = alert.at_ms, "trap alert");
        }
    });

    let classifier = Arc::new(HoneypotClassifier::new(
        registry.clone(),
        Arc::new(alert_sink),
    ));

    let state = AppState {
        registry: registry.clone(),
        limiter: limiter.clone(),
        classifier,
    };

    let sweep_interval = Duration::from_millis(config.sweep_interval_ms);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            match registry.sweep().await {
                Ok(count) if count > 0 => info!(deleted = count, "sweep removed expired sessions"),
                Ok(_) => {}
                Err(err) => warn!(%err, "session sweep failed"),
            }
            if let Err(err) = limiter.prune().await {
                warn!(%err, "bucket prune failed");
            }
        }
    });

    let addr: SocketAddr = config.bind_address.parse()?;
    info!("starting ghostline server on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
