// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion between raw device values and typed port state.
//!
//! The device reports values in several overlapping shapes:
//!
//! - plain scalars (`"ON"`, `"OFF"`, `1`, `"128"`) for extension ports
//! - a mapping with a `"value"` key for regular ports (`{"value": "ON"}`)
//! - for dual-channel ports, a `"value"` mapping from channel address to a
//!   `/`-delimited composite string (`{"value": {"A1": "ON/OFF"}}`)
//!
//! All functions here are pure. They return [`DecodeError`] for payloads they
//! cannot interpret; callers absorb these as an unknown state.
//!
//! # Examples
//!
//! ```
//! use megad_lib::codec::{self, ValueKind};
//! use megad_lib::types::PortId;
//! use serde_json::json;
//!
//! let port: PortId = "3".parse().unwrap();
//! let raw = json!({"value": "ON"});
//!
//! let on = codec::decode_state(Some(&raw), &port, ValueKind::Binary, false, None, None);
//! assert_eq!(on, Ok(true));
//!
//! let inverted = codec::decode_state(Some(&raw), &port, ValueKind::Binary, true, None, None);
//! assert_eq!(inverted, Ok(false));
//! ```

use serde_json::{Map, Value, json};

use crate::error::DecodeError;
use crate::types::{DimmerScale, LevelRange, PortId};

/// Key holding the port value in regular cache entries.
pub const VALUE_KEY: &str = "value";

/// Delimiter between the sub-values of a dual-channel port.
const CHANNEL_DELIMITER: char = '/';

/// How the value of a port is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// On/off output or input.
    Binary,
    /// PWM output with the given resolution.
    Level(DimmerScale),
}

/// Reads an integer out of a raw token.
///
/// `"ON"` and `"OFF"` map to `on` and `off`. Integers, floats (truncated) and
/// numeric strings are read as numbers. Anything else is `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn safe_int(value: &Value, on: i64, off: i64) -> Option<i64> {
    match value {
        Value::String(s) if s == "ON" => Some(on),
        Value::String(s) if s == "OFF" => Some(off),
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::Bool(b) => Some(if *b { on } else { off }),
        _ => None,
    }
}

/// Returns `true` if the cache entry carries no reported value.
#[must_use]
pub fn is_empty(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Picks one channel out of a dual-channel value.
///
/// The address is looked up exactly, then lowercased, then uppercased, since
/// firmware casing differs across device kinds.
///
/// # Errors
///
/// - `DecodeError::NotAMapping` if `raw` is not a mapping
/// - `DecodeError::MissingChannel` if no string entry exists for `addr`
/// - `DecodeError::WrongLength` if the entry has fewer than 2 elements
/// - `DecodeError::IndexOutOfRange` if `index` is past the last element
pub fn select_channel(raw: &Value, addr: &str, index: usize) -> Result<String, DecodeError> {
    let Value::Object(map) = raw else {
        return Err(DecodeError::NotAMapping(raw.to_string()));
    };
    let entry = lookup_address(map, addr).ok_or_else(|| DecodeError::MissingChannel {
        addr: addr.to_string(),
    })?;
    let Value::String(composite) = entry else {
        return Err(DecodeError::MissingChannel {
            addr: addr.to_string(),
        });
    };

    let parts: Vec<&str> = composite.split(CHANNEL_DELIMITER).collect();
    if parts.len() < 2 {
        return Err(DecodeError::WrongLength(composite.clone()));
    }
    parts
        .get(index)
        .map(|part| (*part).to_string())
        .ok_or_else(|| DecodeError::IndexOutOfRange {
            index,
            value: composite.clone(),
        })
}

fn lookup_address<'a>(map: &'a Map<String, Value>, addr: &str) -> Option<&'a Value> {
    map.get(addr)
        .or_else(|| map.get(&addr.to_lowercase()))
        .or_else(|| map.get(&addr.to_uppercase()))
}

/// Decodes the on/off state of a port.
///
/// `addr` and `index` select a channel of a dual-channel port. `invert` swaps
/// the on/off mapping.
///
/// # Errors
///
/// - `DecodeError::Empty` if nothing has been reported yet
/// - `DecodeError::MissingAddress` if `index` is given without `addr`
/// - any error from [`select_channel`]
/// - `DecodeError::InvalidToken` if the final token is not a state
pub fn decode_state(
    raw: Option<&Value>,
    port: &PortId,
    kind: ValueKind,
    invert: bool,
    addr: Option<&str>,
    index: Option<usize>,
) -> Result<bool, DecodeError> {
    if is_empty(raw) {
        return Err(DecodeError::Empty);
    }
    let raw = raw.ok_or(DecodeError::Empty)?;

    if port.is_extension() {
        let on = match kind {
            ValueKind::Level(_) => safe_int(raw, 1, 0)
                .map(|level| level > 0)
                .ok_or_else(|| DecodeError::InvalidToken(raw.to_string()))?,
            ValueKind::Binary => token_is_on(raw)?,
        };
        return Ok(on != invert);
    }

    let value = unwrap_value(raw).ok_or(DecodeError::Empty)?;
    let on = match (index, addr) {
        (Some(index), Some(addr)) if !value.is_string() => {
            token_is_on(&Value::String(select_channel(value, addr, index)?))?
        }
        (Some(_), None) => return Err(DecodeError::MissingAddress),
        _ => token_is_on(value)?,
    };
    Ok(on != invert)
}

/// Decodes the device-space level of a dimmer port.
///
/// Returns `Ok(None)` when nothing has been reported. `"ON"` reads as the
/// scale's maximum and `"OFF"` as zero; numbers are clamped to the scale.
///
/// # Errors
///
/// Returns `DecodeError::InvalidToken` if the value is not a level.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn decode_level(
    raw: Option<&Value>,
    port: &PortId,
    scale: DimmerScale,
) -> Result<Option<u16>, DecodeError> {
    if is_empty(raw) {
        return Ok(None);
    }
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = if port.is_extension() {
        raw
    } else {
        match unwrap_value(raw) {
            Some(value) => value,
            None => return Ok(None),
        }
    };
    let max = i64::from(scale.max_level());
    safe_int(value, max, 0)
        .map(|level| Some(level.clamp(0, max) as u16))
        .ok_or_else(|| DecodeError::InvalidToken(value.to_string()))
}

/// Returns the command value that switches a port on or off.
#[must_use]
pub const fn encode_state(on: bool, invert: bool) -> u16 {
    if on != invert { 1 } else { 0 }
}

/// Returns the device level for a platform brightness.
#[must_use]
pub fn encode_level(brightness: u8, range: LevelRange) -> u16 {
    range.brightness_to_level(brightness)
}

/// Returns the platform brightness for a device level.
#[must_use]
pub fn level_to_brightness(level: u16, range: LevelRange) -> u8 {
    range.level_to_brightness(level)
}

/// Returns the state token written into the cache of extension relays.
#[must_use]
pub const fn state_token(on: bool, invert: bool) -> &'static str {
    if on != invert { "ON" } else { "OFF" }
}

/// Wraps a value in the cache shape used for the given port.
///
/// Extension ports store bare scalars; everything else stores
/// `{"value": ...}`.
#[must_use]
pub fn cache_entry(port: &PortId, value: Value) -> Value {
    if port.is_extension() {
        value
    } else {
        json!({ VALUE_KEY: value })
    }
}

fn unwrap_value(raw: &Value) -> Option<&Value> {
    match raw {
        Value::Object(map) => map.get(VALUE_KEY).filter(|v| !v.is_null()),
        Value::Null => None,
        scalar => Some(scalar),
    }
}

fn token_is_on(token: &Value) -> Result<bool, DecodeError> {
    safe_int(token, 1, 0)
        .map(|n| n > 0)
        .ok_or_else(|| DecodeError::InvalidToken(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(s: &str) -> PortId {
        s.parse().unwrap()
    }

    fn binary(raw: &Value, invert: bool) -> Result<bool, DecodeError> {
        decode_state(Some(raw), &port("3"), ValueKind::Binary, invert, None, None)
    }

    #[test]
    fn safe_int_tokens() {
        assert_eq!(safe_int(&json!("ON"), 255, 0), Some(255));
        assert_eq!(safe_int(&json!("OFF"), 255, 0), Some(0));
        assert_eq!(safe_int(&json!("42"), 1, 0), Some(42));
        assert_eq!(safe_int(&json!(7), 1, 0), Some(7));
        assert_eq!(safe_int(&json!(2.9), 1, 0), Some(2));
        assert_eq!(safe_int(&json!("x"), 1, 0), None);
        assert_eq!(safe_int(&Value::Null, 1, 0), None);
    }

    #[test]
    fn binary_tokens() {
        assert_eq!(binary(&json!({"value": "ON"}), false), Ok(true));
        assert_eq!(binary(&json!({"value": "OFF"}), false), Ok(false));
        assert_eq!(binary(&json!({"value": "1"}), false), Ok(true));
        assert_eq!(binary(&json!({"value": 0}), false), Ok(false));
        assert_eq!(binary(&json!({"value": 200}), false), Ok(true));
    }

    #[test]
    fn inversion_is_symmetric() {
        let samples = [
            json!({"value": "ON"}),
            json!({"value": "OFF"}),
            json!({"value": "1"}),
            json!({"value": "0"}),
            json!({"value": 17}),
            json!({"value": 0}),
        ];
        for raw in &samples {
            assert_eq!(binary(raw, true).unwrap(), !binary(raw, false).unwrap());
        }
    }

    #[test]
    fn empty_entries_are_reported() {
        let p = port("3");
        assert_eq!(
            decode_state(None, &p, ValueKind::Binary, false, None, None),
            Err(DecodeError::Empty)
        );
        assert_eq!(
            decode_state(Some(&json!({})), &p, ValueKind::Binary, false, None, None),
            Err(DecodeError::Empty)
        );
        assert_eq!(decode_level(Some(&json!({})), &p, DimmerScale::Standard), Ok(None));
    }

    #[test]
    fn garbage_token_is_ambiguous() {
        assert!(matches!(
            binary(&json!({"value": "maybe"}), false),
            Err(DecodeError::InvalidToken(_))
        ));
    }

    #[test]
    fn dual_channel_selects_index() {
        let p = port("7");
        let raw = json!({"value": {"A": "1/0"}});
        let first = decode_state(Some(&raw), &p, ValueKind::Binary, false, Some("A"), Some(0));
        let second = decode_state(Some(&raw), &p, ValueKind::Binary, false, Some("A"), Some(1));
        assert_eq!(first, Ok(true));
        assert_eq!(second, Ok(false));
    }

    #[test]
    fn dual_channel_without_delimiter_is_ambiguous() {
        let p = port("7");
        let raw = json!({"value": {"B": "1"}});
        for index in 0..2 {
            assert_eq!(
                decode_state(Some(&raw), &p, ValueKind::Binary, false, Some("B"), Some(index)),
                Err(DecodeError::WrongLength("1".to_string()))
            );
        }
    }

    #[test]
    fn dual_channel_address_casing_fallback() {
        let lower = json!({"ff00a1": "ON/OFF"});
        let upper = json!({"FF00A1": "OFF/ON"});
        assert_eq!(select_channel(&lower, "FF00A1", 0), Ok("ON".to_string()));
        assert_eq!(select_channel(&upper, "ff00a1", 0), Ok("OFF".to_string()));
    }

    #[test]
    fn dual_channel_exact_match_wins() {
        let raw = json!({"Ab": "1/1", "ab": "0/0", "AB": "0/0"});
        assert_eq!(select_channel(&raw, "Ab", 0), Ok("1".to_string()));
    }

    #[test]
    fn dual_channel_non_mapping() {
        assert!(matches!(
            select_channel(&json!(5), "A", 0),
            Err(DecodeError::NotAMapping(_))
        ));
        assert!(matches!(
            select_channel(&json!({"A": 5}), "A", 0),
            Err(DecodeError::MissingChannel { .. })
        ));
    }

    #[test]
    fn dual_channel_missing_address() {
        let raw = json!({"value": {"A": "1/0"}});
        assert_eq!(
            decode_state(Some(&raw), &port("7"), ValueKind::Binary, false, None, Some(0)),
            Err(DecodeError::MissingAddress)
        );
    }

    #[test]
    fn extension_ports_decode_scalars() {
        let p = port("3e2");
        assert_eq!(
            decode_state(Some(&json!("ON")), &p, ValueKind::Binary, false, None, None),
            Ok(true)
        );
        assert_eq!(
            decode_state(Some(&json!("OFF")), &p, ValueKind::Binary, true, None, None),
            Ok(true)
        );
        let dimmer = ValueKind::Level(DimmerScale::Standard);
        assert_eq!(
            decode_state(Some(&json!(0)), &p, dimmer, false, None, None),
            Ok(false)
        );
        assert_eq!(
            decode_level(Some(&json!("120")), &p, DimmerScale::Standard),
            Ok(Some(120))
        );
    }

    #[test]
    fn levels_clamp_to_scale() {
        let p = port("4");
        assert_eq!(
            decode_level(Some(&json!({"value": 9000})), &p, DimmerScale::Standard),
            Ok(Some(255))
        );
        assert_eq!(
            decode_level(Some(&json!({"value": "ON"})), &p, DimmerScale::Extended),
            Ok(Some(4095))
        );
        assert_eq!(
            decode_level(Some(&json!({"value": -3})), &p, DimmerScale::Standard),
            Ok(Some(0))
        );
    }

    #[test]
    fn encode_respects_inversion() {
        assert_eq!(encode_state(true, false), 1);
        assert_eq!(encode_state(true, true), 0);
        assert_eq!(encode_state(false, true), 1);
        assert_eq!(state_token(false, true), "ON");
    }

    #[test]
    fn brightness_round_trip() {
        let range = LevelRange::new(1, 255).unwrap();
        for b in 1..=255u8 {
            let level = encode_level(b, range);
            assert!(level_to_brightness(level, range).abs_diff(b) <= 1);
        }
    }

    #[test]
    fn cache_shapes() {
        assert_eq!(cache_entry(&port("3"), json!(128)), json!({"value": 128}));
        assert_eq!(cache_entry(&port("3e1"), json!("ON")), json!("ON"));
    }
}
