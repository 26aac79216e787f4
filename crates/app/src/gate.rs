//! Dependency gate: translation is suspended until both upstream adapters
//! have announced themselves online.
//!
//! Each adapter is authoritative for its own liveness: the gate only moves
//! on availability messages (including the adapter's last will), never on a
//! timer. Messages dropped while the gate is closed are not replayed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// An upstream adapter the bridge depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    /// The bus-side adapter that decodes and sends DyNet traffic.
    Dynalite,
    /// The climate-side adapter publishing area states.
    Climate,
}

impl Upstream {
    pub const ALL: [Self; 2] = [Self::Dynalite, Self::Climate];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dynalite => "dynalite",
            Self::Climate => "climate",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Liveness {
    #[default]
    Offline,
    Online,
}

impl Liveness {
    /// `online` in any case is online; every other payload is offline.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        let text = String::from_utf8_lossy(payload);
        if text.trim().eq_ignore_ascii_case("online") {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

/// Liveness table for the upstream adapters.
pub struct DependencyGate {
    table: Mutex<HashMap<Upstream, Liveness>>,
}

impl Default for DependencyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGate {
    /// Create a gate with every adapter offline.
    #[must_use]
    pub fn new() -> Self {
        let table = Upstream::ALL
            .into_iter()
            .map(|upstream| (upstream, Liveness::Offline))
            .collect();
        Self {
            table: Mutex::new(table),
        }
    }

    /// Record an availability announcement.
    pub fn set(&self, upstream: Upstream, liveness: Liveness) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = table.insert(upstream, liveness);
        if previous != Some(liveness) {
            tracing::info!(%upstream, ?liveness, "dependency liveness changed");
        }
    }

    /// Adapters currently offline, in a stable order.
    #[must_use]
    pub fn offline(&self) -> Vec<Upstream> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Upstream::ALL
            .into_iter()
            .filter(|upstream| table.get(upstream) != Some(&Liveness::Online))
            .collect()
    }

    /// Whether every adapter is online.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.offline().is_empty()
    }
}
