//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `dynabridge.toml` in the working directory, or at the path in
//! `DYNABRIDGE_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::time::Duration;

use dynabridge_adapter_mqtt::{MqttConfig, Session};
use dynabridge_app::router::BridgeSettings;
use dynabridge_app::topics::TopicLayout;
use dynabridge_domain::dynet::BodyAddress;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_PATH: &str = "dynabridge.toml";
const MAX_PRECISION: u32 = 6;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub climate: ClimateConfig,
    pub bus: BusConfig,
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

/// Climate-side topics.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub base_topic: String,
    /// Device segment prefix; the area number follows it.
    pub device_prefix: String,
    pub availability_topic: String,
}

/// Bus-side topics.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub base_topic: String,
    pub availability_topic: String,
}

/// Bridge behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Retained status topic of the bridge (last will target).
    pub status_topic: String,
    /// Join written into outgoing DyNet bodies.
    pub out_join: u8,
    /// Decimal places kept of the current temperature.
    pub temperature_precision: u32,
    /// Seconds to wait for an acknowledgement before giving up.
    pub response_ttl_secs: u64,
    /// DyNet device code of the HVAC controller.
    pub device: u8,
    pub box_id: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or malformed,
    /// or if the result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DYNABRIDGE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("DYNABRIDGE_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = var("DYNABRIDGE_MQTT_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.broker_port = port;
        }
        if let Some(val) = var("DYNABRIDGE_MQTT_USER") {
            self.mqtt.username = Some(val);
        }
        if let Some(val) = var("DYNABRIDGE_MQTT_PASS") {
            self.mqtt.password = Some(val);
        }
        if let Some(val) = var("DYNABRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation("broker port must be non-zero".to_string()));
        }
        if self.mqtt.keep_alive_secs < 5 {
            return Err(ConfigError::Validation(
                "keep-alive must be at least 5 seconds".to_string(),
            ));
        }
        if self.bridge.response_ttl_secs == 0 {
            return Err(ConfigError::Validation("response TTL must be non-zero".to_string()));
        }
        if self.bridge.temperature_precision > MAX_PRECISION {
            return Err(ConfigError::Validation(format!(
                "temperature precision must be at most {MAX_PRECISION}"
            )));
        }
        if self.climate.base_topic.is_empty() || self.bus.base_topic.is_empty() {
            return Err(ConfigError::Validation("base topics must be non-empty".to_string()));
        }
        EnvFilter::try_new(&self.logging.filter)
            .map_err(|err| ConfigError::Validation(format!("invalid log filter: {err}")))?;
        Ok(())
    }

    #[must_use]
    pub fn topic_layout(&self) -> TopicLayout {
        TopicLayout {
            climate_base: self.climate.base_topic.clone(),
            device_prefix: self.climate.device_prefix.clone(),
            climate_availability: self.climate.availability_topic.clone(),
            bus_base: self.bus.base_topic.clone(),
            bus_availability: self.bus.availability_topic.clone(),
        }
    }

    #[must_use]
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            out_join: self.bridge.out_join,
            address: BodyAddress {
                device: self.bridge.device,
                box_id: self.bridge.box_id,
            },
        }
    }

    /// Broker session for the given topic layout.
    #[must_use]
    pub fn session(&self, topics: &TopicLayout) -> Session {
        Session {
            status_topic: self.bridge.status_topic.clone(),
            subscriptions: topics.subscriptions(),
        }
    }

    #[must_use]
    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.bridge.response_ttl_secs)
    }
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            base_topic: "climate".to_string(),
            device_prefix: "hvac_area_".to_string(),
            availability_topic: "climate/bridge/status".to_string(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            base_topic: "dynalite".to_string(),
            availability_topic: "dynalite/bridge/status".to_string(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let address = BodyAddress::hvac();
        Self {
            status_topic: "dynabridge/status".to_string(),
            out_join: 0xFE,
            temperature_precision: 1,
            response_ttl_secs: 10,
            device: address.device,
            box_id: address.box_id,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "dynabridged=info,dynabridge=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
