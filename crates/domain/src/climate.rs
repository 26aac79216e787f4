//! Climate-side view of an HVAC area: the five mirrored fields and the mode
//! vocabularies shared with the bus.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Status value that means "no fault".
pub const STATUS_OK: &str = "ok";

/// HVAC operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacMode {
    Cool,
    Heat,
    Fan,
    Dry,
    Auto,
    Off,
}

impl HvacMode {
    /// Modes addressable by index on bus channel 102, in code order.
    pub const RECALL_ORDER: [Self; 5] = [Self::Cool, Self::Heat, Self::Fan, Self::Dry, Self::Auto];

    /// Numeric code carried on channel 102.
    ///
    /// `Off` shares code 0 with `Cool`: on/off travels separately on
    /// channel 101.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Cool | Self::Off => 0,
            Self::Heat => 1,
            Self::Fan => 2,
            Self::Dry => 3,
            Self::Auto => 4,
        }
    }

    /// Mode for a channel-102 recall index, if in range.
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::RECALL_ORDER.get(i).copied())
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cool => "cool",
            Self::Heat => "heat",
            Self::Fan => "fan",
            Self::Dry => "dry",
            Self::Auto => "auto",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HvacMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cool" => Ok(Self::Cool),
            "heat" => Ok(Self::Heat),
            "fan" => Ok(Self::Fan),
            "dry" => Ok(Self::Dry),
            "auto" => Ok(Self::Auto),
            "off" => Ok(Self::Off),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Fan speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    Low,
    Medium,
    High,
    Top,
    Auto,
}

impl FanMode {
    /// Speeds addressable by index on bus channel 103, in code order.
    pub const RECALL_ORDER: [Self; 5] = [Self::Low, Self::Medium, Self::High, Self::Top, Self::Auto];

    /// Numeric code carried on channel 103.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Top => 3,
            Self::Auto => 4,
        }
    }

    /// Speed for a channel-103 recall index, if in range.
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::RECALL_ORDER.get(i).copied())
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Top => "top",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FanMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "top" => Ok(Self::Top),
            "auto" => Ok(Self::Auto),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// A mode string outside the closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode `{0}`")]
pub struct UnknownMode(pub String);

/// Whether a free-text status means "no fault" (case-insensitive `ok`).
#[must_use]
pub fn status_is_ok(status: &str) -> bool {
    status.eq_ignore_ascii_case(STATUS_OK)
}

/// Climate state message as received, before validation.
///
/// Every field is optional on the wire; [`AreaState::from_payload`] enforces
/// that all five are present.
///
/// Temperatures may arrive as numbers or numeric strings. Any other non-null
/// value is kept as NaN, so only the bus commands built from that field fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimatePayload {
    #[serde(default, deserialize_with = "lenient_number")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub current_temperature: Option<f64>,
    pub hvac_mode: Option<String>,
    pub fan_mode: Option<String>,
    pub status: Option<String>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        serde_json::Value::Null => None,
        serde_json::Value::Number(number) => Some(number.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(text) => Some(text.trim().parse().unwrap_or(f64::NAN)),
        _ => Some(f64::NAN),
    }))
}

/// The five fields mirrored between the climate and bus sides for one area.
///
/// Mode strings are kept as received; they are mapped onto
/// [`HvacMode`] / [`FanMode`] only when bus commands are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaState {
    pub setpoint: f64,
    pub current_temperature: f64,
    pub hvac_mode: String,
    pub fan_mode: String,
    pub status: String,
}

impl AreaState {
    /// Validate a payload and round its current temperature to `precision`
    /// decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] naming every absent field.
    pub fn from_payload(payload: ClimatePayload, precision: u32) -> Result<Self, ValidationError> {
        let missing: Vec<&'static str> = [
            ("temperature", payload.temperature.is_none()),
            ("current_temperature", payload.current_temperature.is_none()),
            ("hvac_mode", payload.hvac_mode.is_none()),
            ("fan_mode", payload.fan_mode.is_none()),
            ("status", payload.status.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match payload {
            ClimatePayload {
                temperature: Some(setpoint),
                current_temperature: Some(current),
                hvac_mode: Some(hvac_mode),
                fan_mode: Some(fan_mode),
                status: Some(status),
            } => Ok(Self {
                setpoint,
                current_temperature: round_to_precision(current, precision),
                hvac_mode,
                fan_mode,
                status,
            }),
            _ => Err(ValidationError::MissingFields(missing)),
        }
    }

    /// Relabel this state back into the incoming-message shape.
    #[must_use]
    pub fn to_payload(&self) -> ClimatePayload {
        ClimatePayload {
            temperature: Some(self.setpoint),
            current_temperature: Some(self.current_temperature),
            hvac_mode: Some(self.hvac_mode.clone()),
            fan_mode: Some(self.fan_mode.clone()),
            status: Some(self.status.clone()),
        }
    }

    /// Fields whose value differs from `previous`, in declaration order.
    ///
    /// With no previous snapshot every field counts as changed. An
    /// unconvertible temperature seen twice in a row is not a change.
    #[must_use]
    pub fn changed_fields(&self, previous: Option<&Self>) -> Vec<StateField> {
        let Some(prev) = previous else {
            return StateField::ALL.to_vec();
        };
        if prev == self {
            return Vec::new();
        }

        let mut changed = Vec::new();
        if !same_reading(self.setpoint, prev.setpoint) {
            changed.push(StateField::Setpoint);
        }
        if !same_reading(self.current_temperature, prev.current_temperature) {
            changed.push(StateField::CurrentTemperature);
        }
        if self.hvac_mode != prev.hvac_mode {
            changed.push(StateField::HvacMode);
        }
        if self.fan_mode != prev.fan_mode {
            changed.push(StateField::FanMode);
        }
        if self.status != prev.status {
            changed.push(StateField::Status);
        }
        changed
    }
}

/// One of the five mirrored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    Setpoint,
    CurrentTemperature,
    HvacMode,
    FanMode,
    Status,
}

impl StateField {
    pub const ALL: [Self; 5] = [
        Self::Setpoint,
        Self::CurrentTemperature,
        Self::HvacMode,
        Self::FanMode,
        Self::Status,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setpoint => "setpoint",
            Self::CurrentTemperature => "current temperature",
            Self::HvacMode => "hvac mode",
            Self::FanMode => "fan mode",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::float_cmp)]
fn same_reading(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Round `value` to `precision` decimal places.
#[must_use]
pub fn round_to_precision(value: f64, precision: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    if !factor.is_finite() {
        return value;
    }
    (value * factor).round() / factor
}
