//! DyNet command bodies.
//!
//! Every command the bridge sends shares one skeleton:
//!
//! | Byte | Meaning |
//! |------|---------|
//! | 0 | opcode |
//! | 1 | device id |
//! | 2–3 | box id (big-endian) |
//! | 4–5 | area id (big-endian) |
//! | 6 | join / preset |
//! | 7.. | command tag and payload |
//!
//! Bodies are rendered as space-separated, two-digit uppercase hex, which is
//! what the bus adapter expects in `hex_string`.

use std::fmt;

use crate::error::EncodeError;
use crate::id::AreaId;

const OPCODE_PRESET: u8 = 0x02;
const OPCODE_CHANNEL_LEVEL: u8 = 0x10;
const OPCODE_TEMPERATURE: u8 = 0x56;

const TAG_CHANNEL_LEVEL: u8 = 0x02;
const TAG_CURRENT_TEMPERATURE: u8 = 0x0C;
const TAG_SETPOINT: u8 = 0x0D;

/// Highest native channel level.
pub const MAX_NATIVE_LEVEL: u8 = 254;

/// Channels reserved for HVAC control within an area.
pub mod channel {
    /// On/off (level 0 = off).
    pub const ON_OFF: u16 = 101;
    /// HVAC mode code.
    pub const HVAC_MODE: u16 = 102;
    /// Fan mode code.
    pub const FAN_MODE: u16 = 103;
    /// Fault status (level 0 = ok).
    pub const STATUS: u16 = 105;
}

/// Source address stamped into a body: device id and box id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyAddress {
    pub device: u8,
    pub box_id: u16,
}

impl BodyAddress {
    /// Default address for temperature and channel commands (`BB`, box 8).
    #[must_use]
    pub const fn hvac() -> Self {
        Self {
            device: 0xBB,
            box_id: 8,
        }
    }

    /// Default address for preset recalls (device 1, box 1).
    #[must_use]
    pub const fn preset() -> Self {
        Self {
            device: 1,
            box_id: 1,
        }
    }
}

impl Default for BodyAddress {
    fn default() -> Self {
        Self::hvac()
    }
}

/// An immutable DyNet command body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DynetBody(Vec<u8>);

impl DynetBody {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Space-separated uppercase hex, e.g. `56 BB 00 08`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DynetBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Build a setpoint body (opcode `0x56`, tag `0x0D`).
///
/// # Errors
///
/// Returns [`EncodeError::NotFinite`] when `setpoint` is NaN or infinite.
pub fn encode_setpoint(
    area: AreaId,
    join: u8,
    setpoint: f64,
    address: BodyAddress,
) -> Result<DynetBody, EncodeError> {
    let (whole, hundredths) = decimal_bytes("setpoint", setpoint)?;
    Ok(temperature_body(area, join, TAG_SETPOINT, whole, hundredths, address))
}

/// Build a current-temperature body (opcode `0x56`, tag `0x0C`).
///
/// # Errors
///
/// Returns [`EncodeError::NotFinite`] when `temperature` is NaN or infinite.
pub fn encode_current_temperature(
    area: AreaId,
    join: u8,
    temperature: f64,
    address: BodyAddress,
) -> Result<DynetBody, EncodeError> {
    let (whole, hundredths) = decimal_bytes("temperature", temperature)?;
    Ok(temperature_body(
        area,
        join,
        TAG_CURRENT_TEMPERATURE,
        whole,
        hundredths,
        address,
    ))
}

/// Build a channel-level body (opcode `0x10`, tag `0x02`).
///
/// `level` is a percentage; it is clamped to `0..=100` and scaled onto the
/// native `0..=254` range. `fade` is a 24-bit duration, most significant
/// byte first.
///
/// # Errors
///
/// Returns [`EncodeError::NotFinite`] when `level` is NaN or infinite.
pub fn encode_channel_level(
    area: AreaId,
    channel: u16,
    level: f64,
    join: u8,
    fade: u32,
    address: BodyAddress,
) -> Result<DynetBody, EncodeError> {
    let native = percent_to_native_level(level)?;
    let [area_hi, area_lo] = area.get().to_be_bytes();
    let [box_hi, box_lo] = address.box_id.to_be_bytes();
    let [channel_hi, channel_lo] = channel.to_be_bytes();
    let [_, fade_hi, fade_mid, fade_lo] = fade.to_be_bytes();

    Ok(DynetBody(vec![
        OPCODE_CHANNEL_LEVEL,
        address.device,
        box_hi,
        box_lo,
        area_hi,
        area_lo,
        join,
        TAG_CHANNEL_LEVEL,
        channel_hi,
        channel_lo,
        native,
        0x00,
        fade_hi,
        fade_mid,
        fade_lo,
        0x00,
    ]))
}

/// Build an area preset recall body (opcode `0x02`).
#[must_use]
pub fn encode_area_preset(area: AreaId, preset: u8, address: BodyAddress) -> DynetBody {
    let [area_hi, area_lo] = area.get().to_be_bytes();
    let [box_hi, box_lo] = address.box_id.to_be_bytes();

    DynetBody(vec![
        OPCODE_PRESET,
        address.device,
        box_hi,
        box_lo,
        area_hi,
        area_lo,
        preset,
        0xFF,
    ])
}

/// Scale a 0–100 percentage onto the native 0–254 level range.
///
/// Lossy: `254 / 100` is not an integer, so values do not round-trip.
///
/// # Errors
///
/// Returns [`EncodeError::NotFinite`] when `percent` is NaN or infinite.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent_to_native_level(percent: f64) -> Result<u8, EncodeError> {
    if !percent.is_finite() {
        return Err(EncodeError::NotFinite {
            field: "level",
            value: percent,
        });
    }
    let scaled = (percent.clamp(0.0, 100.0) / 100.0 * f64::from(MAX_NATIVE_LEVEL)).round();
    Ok(scaled as u8)
}

fn temperature_body(
    area: AreaId,
    join: u8,
    tag: u8,
    whole: u8,
    hundredths: u8,
    address: BodyAddress,
) -> DynetBody {
    let [area_hi, area_lo] = area.get().to_be_bytes();
    let [box_hi, box_lo] = address.box_id.to_be_bytes();

    DynetBody(vec![
        OPCODE_TEMPERATURE,
        address.device,
        box_hi,
        box_lo,
        area_hi,
        area_lo,
        join,
        tag,
        whole,
        hundredths,
        0x00,
        0x00,
    ])
}

/// Split a temperature into its integer part and hundredths, each masked to
/// eight bits. This is decimal, not fixed-point: `21.75` is `(21, 75)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decimal_bytes(field: &'static str, value: f64) -> Result<(u8, u8), EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::NotFinite { field, value });
    }
    let whole = value.trunc();
    let hundredths = ((value - whole) * 100.0).round();
    Ok(((whole as i64) as u8, (hundredths as i64) as u8))
}
