// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output level types and brightness-space conversion.
//!
//! The platform speaks brightness in `0..=255`. The device speaks PWM levels
//! in `0..=255` or `0..=4095` depending on the dimmer resolution. A
//! configurable [`LevelRange`] maps platform brightness `1..=255` onto the
//! device levels `low..=high`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Maximum platform brightness.
pub const MAX_BRIGHTNESS: u8 = 255;

/// PWM resolution of a dimmer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DimmerScale {
    /// 8-bit output, levels `0..=255`.
    #[default]
    Standard,
    /// 12-bit output, levels `0..=4095`.
    Extended,
}

impl DimmerScale {
    /// Creates a scale from the device's configuration multiplier.
    ///
    /// The device reports `16` for 12-bit outputs; anything else is 8-bit.
    #[must_use]
    pub const fn from_multiplier(multiplier: u8) -> Self {
        if multiplier == 16 {
            Self::Extended
        } else {
            Self::Standard
        }
    }

    /// Returns the highest level the output accepts.
    #[must_use]
    pub const fn max_level(&self) -> u16 {
        match self {
            Self::Standard => 255,
            Self::Extended => 4095,
        }
    }
}

/// Device-space bounds that platform brightness `1..=255` maps onto.
///
/// # Examples
///
/// ```
/// use megad_lib::types::LevelRange;
///
/// let range = LevelRange::new(1, 255).unwrap();
/// assert_eq!(range.brightness_to_level(128), 128);
/// assert_eq!(range.level_to_brightness(128), 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u16; 2]", into = "[u16; 2]")]
pub struct LevelRange {
    low: u16,
    high: u16,
}

impl LevelRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRange` if `low >= high`.
    pub fn new(low: u16, high: u16) -> Result<Self, ValueError> {
        if low >= high {
            return Err(ValueError::InvalidRange { low, high });
        }
        Ok(Self { low, high })
    }

    /// Returns the default range `[1, max_level]` for a scale.
    #[must_use]
    pub const fn full(scale: DimmerScale) -> Self {
        Self {
            low: 1,
            high: scale.max_level(),
        }
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn low(&self) -> u16 {
        self.low
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn high(&self) -> u16 {
        self.high
    }

    fn states(low: f64, high: f64) -> f64 {
        high - low + 1.0
    }

    /// Converts platform brightness to a device level.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn brightness_to_level(&self, brightness: u8) -> u16 {
        let level = scale_between(
            (1.0, f64::from(MAX_BRIGHTNESS)),
            (f64::from(self.low), f64::from(self.high)),
            f64::from(brightness),
        );
        level.round().clamp(0.0, f64::from(u16::MAX)) as u16
    }

    /// Converts a device level to platform brightness, clamped to `1..=255`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn level_to_brightness(&self, level: u16) -> u8 {
        let brightness = scale_between(
            (f64::from(self.low), f64::from(self.high)),
            (1.0, f64::from(MAX_BRIGHTNESS)),
            f64::from(level),
        );
        brightness.round().clamp(1.0, f64::from(MAX_BRIGHTNESS)) as u8
    }
}

/// Linearly rescales `value` from one inclusive range onto another.
fn scale_between(source: (f64, f64), target: (f64, f64), value: f64) -> f64 {
    let source_offset = source.0 - 1.0;
    let target_offset = target.0 - 1.0;
    (value - source_offset) * LevelRange::states(target.0, target.1)
        / LevelRange::states(source.0, source.1)
        + target_offset
}

impl TryFrom<[u16; 2]> for LevelRange {
    type Error = ValueError;

    fn try_from([low, high]: [u16; 2]) -> Result<Self, Self::Error> {
        Self::new(low, high)
    }
}

impl From<LevelRange> for [u16; 2] {
    fn from(range: LevelRange) -> Self {
        [range.low, range.high]
    }
}

impl fmt::Display for LevelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}
