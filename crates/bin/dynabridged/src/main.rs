//! # dynabridged — climate ↔ DyNet bridge daemon
//!
//! Composition root that wires the broker adapter to the translation engine.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and initialise logging
//! - Connect to the broker and start the response sweeper
//! - Feed inbound messages to the router one at a time
//! - Handle graceful shutdown (SIGTERM/SIGINT): the current message and
//!   sweep finish, the bridge announces `offline`, then the process exits
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no translation logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use dynabridge_adapter_mqtt::MqttConnection;
use dynabridge_app::correlation::CorrelationTracker;
use dynabridge_app::router::Router;
use dynabridge_app::state_cache::StateCache;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting dynabridge");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let topics = config.topic_layout();

    let MqttConnection {
        publisher,
        mut inbound,
        task: mqtt_task,
    } = dynabridge_adapter_mqtt::connect(&config.mqtt, config.session(&topics), shutdown_rx.clone());

    let tracker = Arc::new(CorrelationTracker::new(config.response_ttl()));
    let sweeper =
        CorrelationTracker::spawn_sweeper(Arc::clone(&tracker), config.response_ttl(), shutdown_rx);

    let router = Router::new(
        publisher,
        topics,
        config.bridge_settings(),
        StateCache::new(config.bridge.temperature_precision),
        tracker,
    );

    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            () = &mut signal => break,
            message = inbound.recv() => match message {
                Some(message) => {
                    let dispatch = router.handle(&message.topic, &message.payload).await;
                    tracing::trace!(topic = %message.topic, ?dispatch, "message handled");
                }
                None => {
                    tracing::warn!("broker connection closed");
                    break;
                }
            },
        }
    }

    tracing::info!("shutting down");
    shutdown_tx.send_replace(true);
    sweeper.await.context("response sweeper panicked")?;
    mqtt_task.await.context("MQTT event loop panicked")?;
    tracing::info!(pending = router.tracker().len(), "dynabridge stopped");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
