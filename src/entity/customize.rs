// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-entity customization overlay.
//!
//! Overrides come from two places in the user configuration:
//!
//! ```json
//! {
//!   "devices": {
//!     "mega1": {
//!       "5": { "range": [10, 200], "smooth": 2 },
//!       "7": { "ff01_a": { "invert": true } }
//!     }
//!   },
//!   "entities": {
//!     "light.mega1_5": { "name": "Kitchen" }
//!   }
//! }
//! ```
//!
//! Port overrides are looked up by device id, then port, then (for
//! dual-channel ports) the `<addr>_a` / `<addr>_b` sub-key. Entity-id
//! overrides are merged on top.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::types::{LevelRange, PortId};

/// Overrides applied to one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customize {
    /// Display name. Non-string values are ignored.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Swap on and off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,
    /// Device-space bounds for brightness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<LevelRange>,
    /// Smoothing time in seconds for a full-range sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smooth: Option<f64>,
    /// Remaining keys, including per-channel overrides.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(str::to_string)))
}

impl Customize {
    /// Returns the smoothing duration, `None` when unset or zero.
    #[must_use]
    pub fn smooth_duration(&self) -> Option<Duration> {
        self.smooth
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|d| !d.is_zero())
    }

    /// Returns the nested override of one channel of a dual-channel port.
    #[must_use]
    pub fn channel(&self, addr: &str, index: usize) -> Self {
        let key = channel_key(addr, index);
        match self.extra.get(&key) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "Ignoring malformed channel customization");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Applies the fields set in `other` on top of `self`.
    pub fn merge(&mut self, other: Self) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.invert.is_some() {
            self.invert = other.invert;
        }
        if other.range.is_some() {
            self.range = other.range;
        }
        if other.smooth.is_some() {
            self.smooth = other.smooth;
        }
        self.extra.extend(other.extra);
    }
}

/// Key of a channel override: `"<addr lowercase>_a"` or `"_b"`.
#[must_use]
pub fn channel_key(addr: &str, index: usize) -> String {
    let letter = if index == 0 { 'a' } else { 'b' };
    format!("{}_{letter}", addr.to_lowercase())
}

/// All customization supplied by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomizeConfig {
    /// Port overrides by device id, then port.
    #[serde(default)]
    pub devices: HashMap<String, HashMap<String, Customize>>,
    /// Overrides by platform entity id.
    #[serde(default)]
    pub entities: HashMap<String, Customize>,
}

impl CustomizeConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfiguration(e.to_string()))
    }

    /// Resolves the overlay of one entity.
    ///
    /// `channel` is the `(addr, index)` pair of a dual-channel entity.
    #[must_use]
    pub fn resolve(
        &self,
        device: &str,
        port: &PortId,
        channel: Option<(&str, usize)>,
        entity_id: &str,
    ) -> Customize {
        let port_level = self
            .devices
            .get(device)
            .and_then(|ports| ports.get(&port.to_string()));

        let mut resolved = match (port_level, channel) {
            (Some(c), Some((addr, index))) => c.channel(addr, index),
            (Some(c), None) => c.clone(),
            (None, _) => Customize::default(),
        };
        if let Some(by_entity) = self.entities.get(entity_id) {
            resolved.merge(by_entity.clone());
        }
        resolved
    }
}
