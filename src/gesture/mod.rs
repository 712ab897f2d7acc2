// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Classification of digital input pushes into button gestures.
//!
//! A digital input reports clicks through the `click` field (1 = single,
//! 2 = double) and hold state through the `m` field (0 = pressed,
//! 1 = released, 2 = held long). Whether a release ends a long press depends
//! on the per-port long-press latch kept by the device connection.
//!
//! # Examples
//!
//! ```
//! use megad_lib::gesture::{Gesture, classify};
//! use serde_json::json;
//!
//! let mut latch = false;
//! assert_eq!(classify(&json!({"m": 2}), &mut latch), Some(Gesture::LongPress));
//! assert!(latch);
//! assert_eq!(classify(&json!({"m": 1}), &mut latch), Some(Gesture::LongRelease));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::safe_int;

/// Semantic button gesture emitted for digital inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    /// A single click.
    #[serde(rename = "single")]
    SingleClick,
    /// A double click.
    #[serde(rename = "double")]
    DoubleClick,
    /// The button went down.
    Press,
    /// The button was released after a short press.
    Release,
    /// The button has been held long enough to count as a long press.
    #[serde(rename = "long")]
    LongPress,
    /// The button was released after a long press.
    LongRelease,
}

impl Gesture {
    /// Returns the event type string used on the platform event bus.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SingleClick => "single",
            Self::DoubleClick => "double",
            Self::Press => "press",
            Self::Release => "release",
            Self::LongPress => "long",
            Self::LongRelease => "long_release",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn field(payload: &Value, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| safe_int(v, 1, 0))
}

/// Classifies a push payload, updating the long-press latch.
///
/// The first matching rule wins:
///
/// | condition    | gesture                             | latch   |
/// |--------------|-------------------------------------|---------|
/// | `click == 1` | [`Gesture::SingleClick`]            |         |
/// | `click == 2` | [`Gesture::DoubleClick`]            |         |
/// | `m == 2`     | [`Gesture::LongPress`]              | `true`  |
/// | `m == 1`     | [`Gesture::LongRelease`] if latched, else [`Gesture::Release`] | |
/// | `m == 0`     | [`Gesture::Press`]                  | `false` |
///
/// Returns `None` for payloads matching no rule.
pub fn classify(payload: &Value, latch: &mut bool) -> Option<Gesture> {
    match field(payload, "click") {
        Some(1) => return Some(Gesture::SingleClick),
        Some(2) => return Some(Gesture::DoubleClick),
        _ => {}
    }
    match field(payload, "m") {
        Some(2) => {
            *latch = true;
            Some(Gesture::LongPress)
        }
        Some(1) if *latch => Some(Gesture::LongRelease),
        Some(1) => Some(Gesture::Release),
        Some(0) => {
            *latch = false;
            Some(Gesture::Press)
        }
        _ => None,
    }
}
