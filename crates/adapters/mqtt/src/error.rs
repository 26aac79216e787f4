//! MQTT adapter error types.

use dynabridge_domain::error::BridgeError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client rejected a request (its queue is full or closed).
    #[error("MQTT client error: {0}")]
    Client(#[source] rumqttc::ClientError),

    /// The connection to the broker failed.
    #[error("MQTT connection error: {0}")]
    Connection(#[source] rumqttc::ConnectionError),
}

impl From<MqttError> for BridgeError {
    fn from(err: MqttError) -> Self {
        BridgeError::transport(err)
    }
}

impl From<rumqttc::ClientError> for MqttError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Client(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_connection_error_to_transport_error() {
        let err = MqttError::Connection(rumqttc::ConnectionError::RequestsDone);
        let bridge: BridgeError = err.into();
        assert!(matches!(bridge, BridgeError::Transport(_)));
    }

    #[test]
    fn should_display_connection_error_with_cause() {
        let err = MqttError::Connection(rumqttc::ConnectionError::RequestsDone);
        assert!(err.to_string().starts_with("MQTT connection error: "));
    }
}
