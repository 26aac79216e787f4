//! Broker connection configuration.

use serde::Deserialize;

/// Configuration for the broker connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Optional username; empty means anonymous.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Capacity of the inbound message channel and of the client request
    /// queue.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "dynabridge".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            channel_capacity: 256,
        }
    }
}

impl MqttConfig {
    /// Username and password, when a non-empty username is configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|user| !user.is_empty())?;
        Some((username, self.password.as_deref().unwrap_or_default()))
    }
}
