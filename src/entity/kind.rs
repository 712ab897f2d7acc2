// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability variants of port entities.

use crate::codec::ValueKind;
use crate::types::DimmerScale;

/// What an entity bound to a port can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// On/off output.
    Relay,
    /// PWM output with the given resolution.
    Dimmer(DimmerScale),
    /// Push-driven input that emits gestures.
    DigitalInput,
    /// One channel of a two-channel expander sharing a port.
    ///
    /// `addr` is the expander address. A missing address leaves the state
    /// unknown instead of failing.
    DualChannelRelay {
        /// Expander address, as reported in channel lists.
        addr: Option<String>,
        /// Channel index, 0 for A and 1 for B.
        index: usize,
    },
}

impl EntityKind {
    /// Returns how the port value is interpreted.
    #[must_use]
    pub const fn value_kind(&self) -> ValueKind {
        match self {
            Self::Dimmer(scale) => ValueKind::Level(*scale),
            _ => ValueKind::Binary,
        }
    }

    /// Returns `true` for PWM outputs.
    #[must_use]
    pub const fn is_dimmer(&self) -> bool {
        matches!(self, Self::Dimmer(_))
    }

    /// Returns `true` if the entity can be switched.
    #[must_use]
    pub const fn is_actuator(&self) -> bool {
        !matches!(self, Self::DigitalInput)
    }

    /// Returns the level resolution, `Standard` for non-dimmers.
    #[must_use]
    pub const fn scale(&self) -> DimmerScale {
        match self {
            Self::Dimmer(scale) => *scale,
            _ => DimmerScale::Standard,
        }
    }

    /// Returns the channel address, if any.
    #[must_use]
    pub fn addr(&self) -> Option<&str> {
        match self {
            Self::DualChannelRelay { addr, .. } => addr.as_deref(),
            _ => None,
        }
    }

    /// Returns the channel index, if any.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        match self {
            Self::DualChannelRelay { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Returns the platform domain the entity belongs to.
    #[must_use]
    pub const fn domain(&self) -> &'static str {
        match self {
            Self::Relay | Self::DualChannelRelay { .. } => "switch",
            Self::Dimmer(_) => "light",
            Self::DigitalInput => "binary_sensor",
        }
    }

    /// Returns the suffix appended to the port when addressing a channel.
    pub(crate) const fn channel_letter(&self) -> Option<char> {
        match self {
            Self::DualChannelRelay { index: 0, .. } => Some('A'),
            Self::DualChannelRelay { .. } => Some('B'),
            _ => None,
        }
    }
}
