//! Chatbridge - IRC to game-world chat bridge
//!
//! A clientless bot that logs a character into a game realm, joins a custom
//! chat channel and relays messages between it and an IRC channel.

mod bridge;
mod common;
mod config;
mod irc;
mod protocol;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use backon::BackoffBuilder;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use bridge::{spawn_request_forwarder, BridgeWorker, SessionConfig};
use common::RunOutcome;
use config::{env::get_config_path, load_and_validate, Config};
use irc::IrcRelay;
use protocol::version::GameVersion;
use protocol::ProtocolConnector;

/// Exit code for a configured protocol version we cannot speak.
const EXIT_UNSUPPORTED_VERSION: i32 = 3;

/// How long a stopping bridge gets to log out of the game.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Chatbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    let version = match GameVersion::parse(&config.game.version) {
        Ok(version) => version,
        Err(e) => {
            error!("{}", e);
            std::process::exit(EXIT_UNSUPPORTED_VERSION);
        }
    };

    info!("Configuration loaded successfully");
    info!("  Client: {}", version);
    info!("  IRC: {}:{} {}", config.irc.server, config.irc.port, config.irc.channel);
    info!("  Realm: {} ({}:{})", config.game.realm.name, config.game.realm.host, config.game.realm.port);
    info!("  Character: {}", config.game.character);
    info!("  Channel: {}", config.game.channel);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received - initiating graceful logout...");
        shutdown_tx.send_replace(true);
    });

    let mut backoff = irc_backoff();

    loop {
        match run_bridge(&config, version, &mut shutdown_rx).await {
            Ok(RunOutcome::Shutdown) => break,
            Ok(RunOutcome::Restart) => {
                info!("Restarting bridge");
                backoff = irc_backoff();
            }
            Err(e) => {
                error!("IRC connection failed: {}", e);
                let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                info!("Reconnecting in {:.1} seconds...", delay.as_secs_f64());

                let mut stop = shutdown_rx.clone();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stop.wait_for(|stopped| *stopped) => {
                        info!("Shutdown signal received during backoff");
                        break;
                    }
                }
            }
        }
    }

    info!("Exiting...");
    Ok(())
}

/// Exponential backoff between IRC connection attempts.
/// 5s initial, 5min max, factor 2, with jitter, unlimited retries.
fn irc_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(2.0)
        .with_jitter()
        .without_max_times()
        .build()
}

/// Build both endpoints and run them until the IRC side ends.
async fn run_bridge(
    config: &Config,
    version: GameVersion,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<RunOutcome> {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let mut relay = IrcRelay::new(&config.irc, request_tx);

    let worker = Arc::new(BridgeWorker::new(
        SessionConfig::from_config(&config.game, version),
        ProtocolConnector,
        Arc::new(relay.publisher()),
    ));

    let mut poll_task = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run().await }
    });
    let forwarder = spawn_request_forwarder(worker.clone(), request_rx);

    let mut stop = shutdown.clone();
    let outcome = tokio::select! {
        connected = irc::connect(&config.irc) => match connected {
            Ok(stream) => relay.run(stream, shutdown).await,
            Err(e) => Err(e),
        },
        _ = stop.wait_for(|stopped| *stopped) => Ok(RunOutcome::Shutdown),
    };

    // Tear down the game side whatever ended the IRC side
    drop(relay);
    forwarder.abort();
    let stopped = tokio::time::timeout(STOP_TIMEOUT, async {
        worker.stop().await;
        (&mut poll_task).await
    })
    .await;
    match stopped {
        Ok(Ok(())) => debug!("Bridge worker stopped"),
        Ok(Err(e)) => warn!("Bridge worker task panicked: {}", e),
        Err(_) => {
            warn!("Bridge worker stop timed out");
            poll_task.abort();
        }
    }

    Ok(outcome?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
