//! Publisher port — fire-and-forget publish on the shared broker.

use std::future::Future;

use dynabridge_domain::error::BridgeError;

/// Publishes raw payloads to broker topics.
///
/// Implementations must not wait for any application-level response; a
/// returned `Ok` only means the broker client accepted the message.
pub trait MessagePublisher {
    /// Publish `payload` on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

impl<T: MessagePublisher + Send + Sync> MessagePublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).publish(topic, payload)
    }
}
