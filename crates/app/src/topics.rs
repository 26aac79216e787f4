//! Topic layout shared by both domains, and classification of inbound
//! topics.
//!
//! | Direction | Topic |
//! |-----------|-------|
//! | in  | `<climate>/<prefix><area>/state` |
//! | out | `<climate>/<prefix><area>/set/{temperature,mode,fan_mode}` |
//! | in  | `<bus>/event[/…]` (decoded bus frames) |
//! | out | `<bus>/set` (DyNet commands) |
//! | in  | `<bus>/response/<correlation id>` (acknowledgements) |
//! | in  | availability topic of each adapter |

use dynabridge_domain::error::TopicError;
use dynabridge_domain::id::{AreaId, CorrelationId};

use crate::gate::Upstream;

/// Climate-side "set" sub-topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateTarget {
    Temperature,
    Mode,
    FanMode,
}

impl ClimateTarget {
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Mode => "mode",
            Self::FanMode => "fan_mode",
        }
    }
}

/// Where an inbound message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    ClimateState(AreaId),
    BusFrame,
    BusResponse(CorrelationId),
    /// Not a topic the bridge handles (e.g. its own `set` publishes).
    Unroutable,
}

/// Topic names for both domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    /// Root of the climate namespace (e.g. `climate`).
    pub climate_base: String,
    /// Prefix of the per-area device segment (e.g. `hvac_area_`).
    pub device_prefix: String,
    /// Availability topic of the climate adapter.
    pub climate_availability: String,
    /// Root of the bus namespace (e.g. `dynalite`).
    pub bus_base: String,
    /// Availability topic of the bus adapter.
    pub bus_availability: String,
}

impl Default for TopicLayout {
    fn default() -> Self {
        Self {
            climate_base: "climate".to_string(),
            device_prefix: "hvac_area_".to_string(),
            climate_availability: "climate/bridge/status".to_string(),
            bus_base: "dynalite".to_string(),
            bus_availability: "dynalite/bridge/status".to_string(),
        }
    }
}

impl TopicLayout {
    /// Subscription filter for climate state messages.
    #[must_use]
    pub fn climate_state_filter(&self) -> String {
        format!("{}/+/state", self.climate_base)
    }

    /// Topic bus frames arrive on.
    #[must_use]
    pub fn bus_event_topic(&self) -> String {
        format!("{}/event", self.bus_base)
    }

    /// Topic DyNet commands are published to.
    #[must_use]
    pub fn bus_set_topic(&self) -> String {
        format!("{}/set", self.bus_base)
    }

    /// Subscription filter for command acknowledgements.
    #[must_use]
    pub fn bus_response_filter(&self) -> String {
        format!("{}/response/+", self.bus_base)
    }

    /// Climate "set" topic for one area.
    #[must_use]
    pub fn climate_set_topic(&self, area: AreaId, target: ClimateTarget) -> String {
        format!(
            "{}/{}{}/set/{}",
            self.climate_base,
            self.device_prefix,
            area,
            target.suffix()
        )
    }

    /// Every filter the broker connection must subscribe to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            self.climate_state_filter(),
            format!("{}/#", self.bus_event_topic()),
            self.bus_response_filter(),
            self.climate_availability.clone(),
            self.bus_availability.clone(),
        ]
    }

    /// The adapter whose availability `topic` announces, if any.
    #[must_use]
    pub fn availability(&self, topic: &str) -> Option<Upstream> {
        if topic == self.bus_availability {
            Some(Upstream::Dynalite)
        } else if topic == self.climate_availability {
            Some(Upstream::Climate)
        } else {
            None
        }
    }

    /// Classify a non-availability topic.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError`] when a state topic carries no area number, an
    /// area wider than 16 bits, or a response topic carries no valid
    /// correlation id.
    pub fn classify(&self, topic: &str) -> Result<Inbound, TopicError> {
        if let Some(rest) = strip_segment_prefix(topic, &self.bus_base) {
            if let Some(id) = rest.strip_prefix("response/") {
                return id
                    .parse()
                    .map(Inbound::BusResponse)
                    .map_err(|_| TopicError::InvalidCorrelationId(topic.to_string()));
            }
            if rest == "event" || rest.starts_with("event/") {
                return Ok(Inbound::BusFrame);
            }
            return Ok(Inbound::Unroutable);
        }

        if let Some(device) = strip_segment_prefix(topic, &self.climate_base)
            .and_then(|rest| rest.strip_suffix("/state"))
            .filter(|device| !device.contains('/'))
        {
            return area_from_device(topic, device).map(Inbound::ClimateState);
        }

        Ok(Inbound::Unroutable)
    }
}

/// `topic` minus `base/`, if `topic` lives under `base`.
fn strip_segment_prefix<'a>(topic: &'a str, base: &str) -> Option<&'a str> {
    topic.strip_prefix(base)?.strip_prefix('/')
}

/// The area is the number after the last `_` of the device segment
/// (`hvac_area_3` → 3).
fn area_from_device(topic: &str, device: &str) -> Result<AreaId, TopicError> {
    let number = device.rsplit('_').next().unwrap_or(device);
    if let Ok(area) = number.parse::<u16>() {
        return Ok(AreaId::new(area));
    }
    if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) {
        Err(TopicError::AreaOutOfRange(topic.to_string()))
    } else {
        Err(TopicError::MissingArea(topic.to_string()))
    }
}
