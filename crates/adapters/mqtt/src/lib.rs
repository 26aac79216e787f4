//! # dynabridge-adapter-mqtt
//!
//! MQTT adapter — the single broker connection both domains share.
//!
//! ## Responsibilities
//! - Connect to the broker with a retained `offline` last will on the
//!   bridge status topic
//! - On every (re)connect: announce `online` and subscribe to the inbound
//!   topics
//! - Forward inbound publishes over a bounded channel, in arrival order
//! - Implement the [`MessagePublisher`] port
//!
//! ## Dependency rule
//! Depends on `dynabridge-app` and `dynabridge-domain`.

pub mod config;
pub mod error;

use std::time::Duration;

use dynabridge_app::ports::MessagePublisher;
use dynabridge_domain::error::BridgeError;
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub use config::MqttConfig;
pub use error::MqttError;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

const ONLINE: &str = "online";
const OFFLINE: &str = "offline";

/// A publish received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// What the connection announces and listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Retained `online` / `offline` status of the bridge itself.
    pub status_topic: String,
    /// Filters subscribed on every connect.
    pub subscriptions: Vec<String>,
}

/// [`MessagePublisher`] backed by a rumqttc client. QoS 1, never retained.
///
/// Publishing never waits for room in the request queue: a full queue is
/// reported as a transport error and the command is dropped.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MessagePublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BridgeError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|err| MqttError::from(err).into())
    }
}

/// A running broker connection.
pub struct MqttConnection {
    pub publisher: MqttPublisher,
    /// Inbound publishes, in arrival order.
    pub inbound: mpsc::Receiver<InboundMessage>,
    /// Event-loop task; finishes after `shutdown` flips and the `offline`
    /// status has been flushed.
    pub task: JoinHandle<()>,
}

/// Build the client options, including the last will.
#[must_use]
pub fn mqtt_options(config: &MqttConfig, session: &Session) -> MqttOptions {
    let mut options = MqttOptions::new(
        config.client_id.clone(),
        config.broker_host.clone(),
        config.broker_port,
    );
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    if let Some((username, password)) = config.credentials() {
        options.set_credentials(username, password);
    }
    options.set_last_will(LastWill::new(
        session.status_topic.clone(),
        OFFLINE,
        QoS::AtLeastOnce,
        true,
    ));
    options
}

/// Start the broker connection. The event loop runs on its own task until
/// `shutdown` turns `true`.
#[must_use]
pub fn connect(
    config: &MqttConfig,
    session: Session,
    shutdown: watch::Receiver<bool>,
) -> MqttConnection {
    // room for the status publish and every subscription of a reconnect
    let capacity = config.channel_capacity.max(session.subscriptions.len() + 2);
    let (client, eventloop) = AsyncClient::new(mqtt_options(config, &session), capacity);
    let (tx, inbound) = mpsc::channel(capacity);

    tracing::info!(
        host = %config.broker_host,
        port = config.broker_port,
        client_id = %config.client_id,
        "connecting to MQTT broker"
    );

    let task = tokio::spawn(run(client.clone(), eventloop, session, tx, shutdown));
    MqttConnection {
        publisher: MqttPublisher { client },
        inbound,
        task,
    }
}

async fn run(
    client: AsyncClient,
    mut eventloop: EventLoop,
    session: Session,
    tx: mpsc::Sender<InboundMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("connected to MQTT broker");
                    if let Err(err) = on_connected(&client, &session) {
                        tracing::error!(error = %err, "failed to set up MQTT session");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = InboundMessage {
                        topic: topic_string(&publish.topic),
                        payload: publish.payload.to_vec(),
                    };
                    if tx.send(message).await.is_err() {
                        tracing::debug!("inbound receiver dropped, stopping MQTT loop");
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    let err = MqttError::Connection(err);
                    tracing::warn!(error = %err, "MQTT connection lost, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            },
        }
    }

    disconnect(&client, &mut eventloop, &session).await;
}

/// Runs on the event-loop task, so requests must not wait for queue room.
fn on_connected(client: &AsyncClient, session: &Session) -> Result<(), MqttError> {
    client.try_publish(session.status_topic.clone(), QoS::AtLeastOnce, true, ONLINE)?;
    for filter in &session.subscriptions {
        client.try_subscribe(filter.clone(), QoS::AtLeastOnce)?;
        tracing::debug!(%filter, "subscribed");
    }
    Ok(())
}

/// Announce `offline`, then drive the event loop until the disconnect is
/// written or the flush times out.
async fn disconnect(client: &AsyncClient, eventloop: &mut EventLoop, session: &Session) {
    let requested = client
        .try_publish(session.status_topic.clone(), QoS::AtLeastOnce, true, OFFLINE)
        .and_then(|()| client.try_disconnect());
    if let Err(err) = requested {
        tracing::warn!(error = %err, "failed to request MQTT disconnect");
        return;
    }

    let flush = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };
    if tokio::time::timeout(FLUSH_TIMEOUT, flush).await.is_err() {
        tracing::warn!("timed out flushing MQTT disconnect");
    }
    tracing::info!("disconnected from MQTT broker");
}

fn topic_string(topic: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(topic.as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            status_topic: "dynabridge/status".to_string(),
            subscriptions: vec!["climate/+/state".to_string()],
        }
    }

    #[test]
    fn should_build_options_from_config() {
        let config = MqttConfig {
            broker_host: "broker.local".to_string(),
            broker_port: 1884,
            keep_alive_secs: 45,
            ..MqttConfig::default()
        };
        let options = mqtt_options(&config, &session());

        assert_eq!(
            options.broker_address(),
            ("broker.local".to_string(), 1884)
        );
        assert_eq!(options.client_id(), "dynabridge");
        assert_eq!(options.keep_alive(), Duration::from_secs(45));
        assert!(options.last_will().is_some());
    }

    #[test]
    fn should_decode_topic_bytes_lossily() {
        assert_eq!(topic_string("climate/hvac_area_1/state"), "climate/hvac_area_1/state");
        assert_eq!(topic_string([0x61, 0xFF]), "a\u{FFFD}");
    }

    #[tokio::test]
    async fn should_fail_publish_instead_of_waiting_when_queue_is_full() {
        let config = MqttConfig {
            channel_capacity: 1,
            ..MqttConfig::default()
        };
        // the event loop is never polled, so nothing drains the queue
        let (client, _eventloop) = AsyncClient::new(mqtt_options(&config, &session()), 1);
        let publisher = MqttPublisher { client };

        publisher.publish("dynalite/set", b"{}".to_vec()).await.unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            publisher.publish("dynalite/set", b"{}".to_vec()),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(BridgeError::Transport(_))));
    }

    #[tokio::test]
    async fn should_stop_event_loop_on_shutdown() {
        let config = MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1,
            ..MqttConfig::default()
        };
        let (tx, rx) = watch::channel(false);
        let connection = connect(&config, session(), rx);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), connection.task)
            .await
            .unwrap()
            .unwrap();
    }
}
