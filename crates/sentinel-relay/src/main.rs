//! # sentinel-relay
//!
//! Background relay between monitored chat pages and the moderation
//! backend.
//!
//! This binary provides:
//! - a **single backend connection** that extraction events are forwarded
//!   on, best effort and never queued while the link is down
//! - a **local surface socket** page agents attach to
//! - **alert routing** of backend warnings to the focused page

mod bridge;
mod config;
mod error;
mod registry;
mod surfaces;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sentinel_net::TcpConnector;

use crate::bridge::{BridgeEvent, RelayBridge};
use crate::config::RelayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sentinel_relay=debug,sentinel_net=debug")),
        )
        .init();

    info!("Starting sentinel relay v{}", env!("CARGO_PKG_VERSION"));

    let config = RelayConfig::from_env();
    info!(?config, "Loaded configuration");

    let (events_tx, events_rx) = mpsc::channel::<BridgeEvent>(256);

    let listener = TcpListener::bind(config.surface_addr).await?;
    info!(addr = %config.surface_addr, "Accepting page agents");
    tokio::spawn(surfaces::serve_surfaces(
        listener,
        events_tx.clone(),
        config.alert_queue,
    ));

    let mut bridge = RelayBridge::new(TcpConnector::new(config.backend_addr.clone()));
    if config.connect_on_start {
        bridge.connect().await;
    }

    let shutdown_tx = events_tx;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            let _ = shutdown_tx.send(BridgeEvent::Shutdown).await;
        }
    });

    bridge.run(events_rx).await;
    Ok(())
}
