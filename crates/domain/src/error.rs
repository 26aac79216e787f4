//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`BridgeError`]
//! via `#[from]`. None of these are fatal during steady-state operation: the
//! router logs them and moves on to the next message.

/// Top-level error for everything that can go wrong while translating a
/// single inbound message.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// An inbound climate state failed validation.
    #[error("invalid climate state: {0}")]
    Validation(#[from] ValidationError),

    /// A DyNet command body could not be built.
    #[error("failed to encode bus command: {0}")]
    Encode(#[from] EncodeError),

    /// A bus frame did not match the layout its type declares.
    #[error("invalid bus frame: {0}")]
    Frame(#[from] FrameError),

    /// A topic could not be mapped to an area or correlation id.
    #[error("unroutable topic: {0}")]
    Topic(#[from] TopicError),

    /// An inbound payload was not the JSON we expected.
    #[error("failed to parse payload: {0}")]
    Payload(#[source] serde_json::Error),

    /// The broker collaborator failed to publish or subscribe.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Climate state invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// One or more of the five required fields were absent.
    #[error("missing keys: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Failures while building a DyNet body.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// A temperature was NaN or infinite.
    #[error("{field} is not a finite number: {value}")]
    NotFinite {
        /// Which argument was rejected.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Failures while interpreting a bus frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The frame's `type` is not one the bridge knows.
    #[error("unsupported frame type `{0}`")]
    UnsupportedType(String),

    /// The positional field list does not have the length the frame type
    /// requires for this command.
    #[error("{command} on {frame_type} expects {expected} fields, got {actual}")]
    FieldCount {
        /// Command being decoded (e.g. `"recall level"`).
        command: &'static str,
        /// Declared frame type.
        frame_type: &'static str,
        /// Required field count.
        expected: usize,
        /// Received field count.
        actual: usize,
    },

    /// A positional field could not be parsed.
    #[error("field `{name}` has invalid value `{value}`")]
    InvalidField {
        /// Logical name of the field (`area`, `join`, …).
        name: &'static str,
        /// Raw value as received.
        value: String,
    },
}

/// Failures while extracting routing information from a topic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    /// No area number could be read from the topic.
    #[error("no area in topic `{0}`")]
    MissingArea(String),

    /// The area number does not fit the 16-bit DyNet area address.
    #[error("area out of range in topic `{0}`")]
    AreaOutOfRange(String),

    /// The trailing segment of a response topic is not a correlation id.
    #[error("invalid correlation id in topic `{0}`")]
    InvalidCorrelationId(String),
}

impl BridgeError {
    /// Wrap any collaborator error as [`BridgeError::Transport`].
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }
}
