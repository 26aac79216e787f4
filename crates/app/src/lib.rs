//! # dynabridge-app
//!
//! Application layer — the translation engine and its **port definitions**
//! (traits).
//!
//! ## Responsibilities
//! - Define the **driven/outbound port** the broker adapter implements:
//!   - `MessagePublisher` — publish a payload on a topic
//! - Own the three shared tables, each behind its own lock:
//!   - `StateCache` — last published climate state per area, and the diff
//!   - `CorrelationTracker` — in-flight bus commands awaiting an ack
//!   - `DependencyGate` — liveness of the two upstream adapters
//! - Provide the **driving/inbound entry point**: `Router::handle`, which
//!   classifies one inbound message by topic and translates it
//! - Run the periodic response sweep as a background task
//!
//! ## Dependency rule
//! Depends on `dynabridge-domain` only (plus `tokio` for the sweep task).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod correlation;
pub mod gate;
pub mod ports;
pub mod router;
pub mod state_cache;
pub mod topics;
