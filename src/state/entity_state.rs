// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity state snapshot and restored state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of an entity's platform-visible state.
///
/// `is_on` is `None` while the state is unknown: nothing reported yet and
/// nothing restored, or the last payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState {
    /// Platform entity id.
    pub entity_id: String,
    /// Whether the device connection is online.
    pub available: bool,
    /// On/off state, `None` when unknown.
    pub is_on: Option<bool>,
    /// Brightness `1..=255` for dimmers.
    pub brightness: Option<u8>,
    /// When the snapshot was taken.
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    /// Returns the platform state string: `"on"`, `"off"`, `"unknown"` or
    /// `"unavailable"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match (self.available, self.is_on) {
            (false, _) => "unavailable",
            (true, None) => "unknown",
            (true, Some(true)) => "on",
            (true, Some(false)) => "off",
        }
    }
}

/// Last known state handed back by the platform at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RestoredState {
    /// Whether the entity was on.
    pub is_on: bool,
    /// Brightness attribute, if the entity was a dimmer.
    pub brightness: Option<u8>,
}

impl RestoredState {
    /// Restored "on" state without brightness.
    #[must_use]
    pub const fn on() -> Self {
        Self {
            is_on: true,
            brightness: None,
        }
    }

    /// Restored "off" state without brightness.
    #[must_use]
    pub const fn off() -> Self {
        Self {
            is_on: false,
            brightness: None,
        }
    }

    /// Sets the restored brightness.
    #[must_use]
    pub const fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }
}
