//! dtnrouted — external routing agent for a DTN node.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use dtnroute_core::config::{url_for_addr, RouteConfig};
use dtnroute_services::{Session, SessionEnd};

mod reconnect;

use reconnect::Backoff;

#[derive(Debug, Parser)]
#[command(name = "dtnrouted", version, about = "Direct-delivery external routing agent for a DTN node")]
struct Cli {
    /// Node address; expands to ws://HOST:PORT/ws/erouting.
    #[arg(short, long, value_name = "HOST:PORT", conflicts_with = "url")]
    addr: Option<String>,

    /// Full WebSocket URL of the node's external routing channel.
    #[arg(long)]
    url: Option<String>,

    /// Exit when the channel closes instead of reconnecting.
    #[arg(long)]
    no_reconnect: bool,

    /// Log at debug level when RUST_LOG is unset.
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    /// Layer command-line flags over the loaded config.
    fn apply(&self, config: &mut RouteConfig) {
        if let Some(addr) = &self.addr {
            config.node.url = url_for_addr(addr);
        }
        if let Some(url) = &self.url {
            config.node.url = url.clone();
        }
        if self.no_reconnect {
            config.reconnect.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.debug { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load config
    if let Err(e) = RouteConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = RouteConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        RouteConfig::default()
    });
    cli.apply(&mut config);
    config.validate().context("invalid node url")?;

    tracing::info!(
        url = %config.node.url,
        reconnect = config.reconnect.enabled,
        stats_secs = config.stats.interval_secs,
        "dtnrouted starting"
    );

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    run(&config, &shutdown_tx).await?;

    tracing::info!("shutting down");
    Ok(())
}

/// Connect, serve, and reconnect until shutdown or the reconnect policy gives up.
async fn run(config: &RouteConfig, shutdown_tx: &broadcast::Sender<()>) -> Result<()> {
    let url = config.node.url.as_str();
    let mut backoff = Backoff::new(&config.reconnect);

    loop {
        let mut shutdown_rx = shutdown_tx.subscribe();

        let connected = tokio::select! {
            _ = shutdown_rx.recv() => return Ok(()),
            r = Session::connect(url) => r,
        };

        let delay = match connected {
            Ok(session) => {
                let outcome = session
                    .with_stats_interval(config.stats.interval())
                    .run(shutdown_tx.subscribe())
                    .await;
                match outcome {
                    Ok((SessionEnd::Shutdown, _)) => return Ok(()),
                    Ok((SessionEnd::Closed, stats)) => {
                        tracing::info!(decisions = stats.decisions, "node closed the event channel");
                    }
                    Err(e) if !config.reconnect.enabled => {
                        return Err(anyhow::Error::new(e).context("event channel failed"));
                    }
                    Err(e) => tracing::warn!(error = %e, "event channel failed"),
                }
                if !config.reconnect.enabled {
                    return Ok(());
                }
                backoff.closed()
            }
            Err(e) if !config.reconnect.enabled => {
                return Err(anyhow::Error::new(e).context("could not reach node"));
            }
            Err(e) => match backoff.failed() {
                Some(delay) => {
                    tracing::warn!(
                        error = %e,
                        attempt = backoff.failures(),
                        retry_in_ms = delay.as_millis() as u64,
                        "connect failed"
                    );
                    delay
                }
                None => {
                    return Err(anyhow::Error::new(e).context(format!(
                        "giving up after {} connect attempts",
                        backoff.failures()
                    )));
                }
            },
        };

        tokio::select! {
            _ = shutdown_rx.recv() => return Ok(()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
