//! mei-bridge - channel multiplexing between a management engine and host sockets
//!
//! This binary accepts management-interface sessions on a local TCP port,
//! dispatches every framed message and opens host sockets on demand.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use mei_bridge::{
    config, logger, BridgeError, EventLoopNotifier, FqdnCache, IngressListener,
    ProtocolDispatcher, Result, TokioSocketTransport,
};

#[derive(Parser)]
#[command(name = "mei-bridge")]
#[command(version)]
#[command(about = "Channel-multiplexing bridge between a management engine and host sockets")]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listen address
    #[arg(long)]
    listen_address: Option<String>,

    /// Override listen port
    #[arg(long)]
    listen_port: Option<u16>,

    /// Enable trace logging for the bridge
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_config_from_str("")?,
    };

    logger::initialize_logger(&config.logging.level, cli.verbose)
        .map_err(|e| BridgeError::Config(e.to_string()))?;

    info!("Starting mei-bridge v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {:?}", path);
    }

    if let Some(addr) = cli.listen_address {
        config.ingress.listen_address = addr;
    }
    if let Some(port) = cli.listen_port {
        config.ingress.listen_port = port;
    }

    let transport = Arc::new(TokioSocketTransport::new(&config.transport));
    let notifier = EventLoopNotifier::new();
    let identity = Arc::new(FqdnCache::new());
    let dispatcher = Arc::new(ProtocolDispatcher::new(
        &config,
        transport,
        notifier.clone(),
        identity,
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    // Event-loop side: wake on every new channel and report the live set.
    let registry = dispatcher.registry();
    let mut loop_shutdown = shutdown_tx.subscribe();
    let event_loop = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = notifier.notified() => {
                    let live = registry.lock().await.local_ids();
                    info!("Event loop woke with {} live channels: {:?}", live.len(), live);
                }
                _ = loop_shutdown.recv() => break,
            }
        }
    });

    let listener =
        IngressListener::bind(&config.ingress, Arc::clone(&dispatcher), shutdown_rx).await?;
    let listener_handle = tokio::spawn(async move {
        if let Err(e) = listener.run().await {
            error!("Listener error: {}", e);
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    let _ = shutdown_tx.send(());
    let _ = listener_handle.await;
    let _ = event_loop.await;

    let closed = dispatcher.shutdown().await;
    let metrics = dispatcher.metrics().snapshot();
    info!(
        "Shutdown complete. Messages handled: {}, channels opened: {}, closed on exit: {}",
        metrics.messages_received, metrics.channels_opened, closed
    );

    Ok(())
}
