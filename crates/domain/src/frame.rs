//! Bus frames (decoded DyNet traffic as published by the bus adapter) and
//! their classification into the closed set of commands the bridge acts on.
//!
//! The bus adapter describes each frame in free text. Matching on that text
//! happens only in [`BusCommand::classify`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameError;
use crate::id::AreaId;

/// Marker present in frames the bridge itself sent (its join is `FE`).
const OWN_ECHO: &str = "join fe";
const REQUEST: &str = "request";
const TEMPERATURE_SET_POINT: &str = "temperature set point";
const SET_TEMPERATURE_SET_POINT: &str = "set temperature set point to";
const RECALL_LEVEL: &str = "recall level";

/// DyNet protocol generation declared by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    Dynet1,
    Dynet2,
}

impl FrameType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dynet1 => "dynet1",
            Self::Dynet2 => "dynet2",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameType {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynet1" => Ok(Self::Dynet1),
            "dynet2" => Ok(Self::Dynet2),
            _ => Err(FrameError::UnsupportedType(s.to_string())),
        }
    }
}

/// A decoded bus frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusFrame {
    pub description: String,
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub fields: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// A bus command the bridge understands.
#[derive(Debug, Clone, PartialEq)]
pub enum BusCommand {
    /// A keypad asks for the current setpoint of an area.
    RequestSetpoint { area: AreaId, join: u8 },
    /// A keypad changed the setpoint of an area.
    SetSetpoint {
        area: AreaId,
        join: u8,
        setpoint: f64,
    },
    /// A channel in an area was recalled to a level (percent).
    RecallLevel {
        area: AreaId,
        join: u8,
        channel: u16,
        level: i64,
    },
}

/// Outcome of classifying a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Sent by the bridge itself; must not be translated back.
    OwnEcho,
    /// Not a command the bridge acts on.
    Unrecognized,
    Command(BusCommand),
}

/// Commands recognized from a frame description.
#[derive(Clone, Copy)]
enum Kind {
    RequestSetpoint,
    SetSetpoint,
    RecallLevel,
}

impl Kind {
    fn from_description(description: &str) -> Option<Self> {
        if description.contains(REQUEST) && description.contains(TEMPERATURE_SET_POINT) {
            Some(Self::RequestSetpoint)
        } else if description.contains(SET_TEMPERATURE_SET_POINT) {
            Some(Self::SetSetpoint)
        } else if description.contains(RECALL_LEVEL) {
            Some(Self::RecallLevel)
        } else {
            None
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::RequestSetpoint => "request temperature set point",
            Self::SetSetpoint => "set temperature set point",
            Self::RecallLevel => "recall level",
        }
    }

    /// Required field count per frame type.
    const fn field_count(self, frame_type: FrameType) -> usize {
        match (self, frame_type) {
            (Self::RequestSetpoint, FrameType::Dynet1) => 2,
            (Self::RequestSetpoint, FrameType::Dynet2) => 4,
            (Self::SetSetpoint, FrameType::Dynet1) => 3,
            (Self::SetSetpoint, FrameType::Dynet2) => 5,
            (Self::RecallLevel, FrameType::Dynet1) => 4,
            (Self::RecallLevel, FrameType::Dynet2) => 7,
        }
    }

    /// Check the field count and return the offset of the area field.
    /// DyNet2 frames lead with device and box.
    fn base(self, frame_type: FrameType, fields: &[Value]) -> Result<usize, FrameError> {
        let expected = self.field_count(frame_type);
        if fields.len() != expected {
            return Err(FrameError::FieldCount {
                command: self.name(),
                frame_type: frame_type.as_str(),
                expected,
                actual: fields.len(),
            });
        }
        Ok(match frame_type {
            FrameType::Dynet1 => 0,
            FrameType::Dynet2 => 2,
        })
    }
}

impl BusCommand {
    /// Classify a frame by its description and decode its positional
    /// fields according to its declared type.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when a recognized command carries an unknown
    /// frame type, the wrong number of fields, or unparseable values.
    pub fn classify(frame: &BusFrame) -> Result<Classified, FrameError> {
        let description = frame.description.to_ascii_lowercase();

        if description.contains(OWN_ECHO) {
            return Ok(Classified::OwnEcho);
        }

        let Some(kind) = Kind::from_description(&description) else {
            return Ok(Classified::Unrecognized);
        };

        let frame_type: FrameType = frame.frame_type.parse()?;
        let fields = frame.fields.as_slice();
        let base = kind.base(frame_type, fields)?;
        let area = area_field(&fields[base])?;
        let join = join_field(&fields[base + 1])?;

        let command = match kind {
            Kind::RequestSetpoint => Self::RequestSetpoint { area, join },
            Kind::SetSetpoint => Self::SetSetpoint {
                area,
                join,
                setpoint: float_field("setpoint", &fields[base + 2])?,
            },
            Kind::RecallLevel => Self::RecallLevel {
                area,
                join,
                channel: channel_field(&fields[base + 2])?,
                level: level_field(&fields[base + 3])?,
            },
        };
        Ok(Classified::Command(command))
    }

    #[must_use]
    pub fn area(&self) -> AreaId {
        match self {
            Self::RequestSetpoint { area, .. }
            | Self::SetSetpoint { area, .. }
            | Self::RecallLevel { area, .. } => *area,
        }
    }
}

fn raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid(name: &'static str, value: &Value) -> FrameError {
    FrameError::InvalidField {
        name,
        value: raw(value),
    }
}

fn int_field(name: &'static str, value: &Value) -> Result<i64, FrameError> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(name, value))
}

fn float_field(name: &'static str, value: &Value) -> Result<f64, FrameError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
    .ok_or_else(|| invalid(name, value))
}

fn area_field(value: &Value) -> Result<AreaId, FrameError> {
    let area = int_field("area", value)?;
    u16::try_from(area)
        .map(AreaId::new)
        .map_err(|_| invalid("area", value))
}

fn join_field(value: &Value) -> Result<u8, FrameError> {
    let join = int_field("join", value)?;
    u8::try_from(join).map_err(|_| invalid("join", value))
}

fn channel_field(value: &Value) -> Result<u16, FrameError> {
    let channel = int_field("channel", value)?;
    u16::try_from(channel).map_err(|_| invalid("channel", value))
}

/// Levels arrive as percent strings (`"40%"`).
fn level_field(value: &Value) -> Result<i64, FrameError> {
    match value {
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse()
            .map_err(|_| invalid("level", value)),
        other => int_field("level", other),
    }
}
