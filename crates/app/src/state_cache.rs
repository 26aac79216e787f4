//! Last climate state published for each area, and the diff that decides
//! which bus commands an update needs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use dynabridge_domain::climate::{AreaState, ClimatePayload, StateField};
use dynabridge_domain::error::ValidationError;
use dynabridge_domain::id::AreaId;

/// Result of applying a climate update.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// The state now cached for the area.
    pub state: AreaState,
    /// Fields that differ from the previous snapshot, in declaration order.
    pub changes: Vec<StateField>,
}

/// Per-area snapshot table.
///
/// An area stays known once seen: invalidating it clears the snapshot but
/// keeps the slot, so the next update reports every field as changed.
pub struct StateCache {
    precision: u32,
    areas: Mutex<HashMap<AreaId, Option<AreaState>>>,
}

impl StateCache {
    #[must_use]
    pub fn new(precision: u32) -> Self {
        Self {
            precision,
            areas: Mutex::new(HashMap::new()),
        }
    }

    /// Validate `incoming`, diff it against the cached snapshot and replace
    /// the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when any field is missing; the cache is
    /// left untouched.
    pub fn apply(&self, area: AreaId, incoming: ClimatePayload) -> Result<Applied, ValidationError> {
        let state = AreaState::from_payload(incoming, self.precision)?;
        let mut areas = self.lock();
        let slot = areas.entry(area).or_default();
        let changes = state.changed_fields(slot.as_ref());
        *slot = Some(state.clone());
        Ok(Applied { state, changes })
    }

    /// Clear the snapshot of `area` and re-apply it as an incoming update,
    /// so every field is reported as changed.
    ///
    /// Returns `None` when nothing is cached for the area.
    pub fn force_resend(&self, area: AreaId) -> Option<Applied> {
        let previous = self.lock().get_mut(&area).and_then(Option::take);
        let Some(previous) = previous else {
            tracing::warn!(%area, "no cached state to resend");
            return None;
        };
        match self.apply(area, previous.to_payload()) {
            Ok(applied) => Some(applied),
            Err(err) => {
                tracing::warn!(%area, error = %err, "cached state no longer valid");
                None
            }
        }
    }

    /// Whether a snapshot is currently cached for `area`.
    #[must_use]
    pub fn has_snapshot(&self, area: AreaId) -> bool {
        self.lock().get(&area).is_some_and(Option::is_some)
    }

    #[must_use]
    pub fn snapshot(&self, area: AreaId) -> Option<AreaState> {
        self.lock().get(&area).cloned().flatten()
    }

    /// Whether a valid state was ever received for `area`.
    #[must_use]
    pub fn contains(&self, area: AreaId) -> bool {
        self.lock().contains_key(&area)
    }

    /// Drop the snapshot of `area`, keeping the area known.
    pub fn invalidate(&self, area: AreaId) {
        if let Some(slot) = self.lock().get_mut(&area) {
            *slot = None;
        }
    }

    /// Known areas, sorted.
    #[must_use]
    pub fn areas(&self) -> Vec<AreaId> {
        let mut areas: Vec<AreaId> = self.lock().keys().copied().collect();
        areas.sort_unstable();
        areas
    }

    /// Overwrite the cached setpoint. Returns `false` when no snapshot exists.
    pub fn set_setpoint(&self, area: AreaId, setpoint: f64) -> bool {
        self.update(area, |state| state.setpoint = setpoint)
    }

    /// Overwrite the cached HVAC mode. Returns `false` when no snapshot exists.
    pub fn set_hvac_mode(&self, area: AreaId, mode: &str) -> bool {
        self.update(area, |state| state.hvac_mode = mode.to_string())
    }

    /// Overwrite the cached fan mode. Returns `false` when no snapshot exists.
    pub fn set_fan_mode(&self, area: AreaId, mode: &str) -> bool {
        self.update(area, |state| state.fan_mode = mode.to_string())
    }

    fn update(&self, area: AreaId, write: impl FnOnce(&mut AreaState)) -> bool {
        match self.lock().get_mut(&area).and_then(Option::as_mut) {
            Some(state) => {
                write(state);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AreaId, Option<AreaState>>> {
        self.areas.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
