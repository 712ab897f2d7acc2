// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity event types.

use serde::{Deserialize, Serialize};

use crate::gesture::Gesture;
use crate::state::EntityState;

/// Events emitted by port entities.
///
/// `StateChanged` is the platform state write. `Gesture` is the button event
/// fired only by digital inputs.
///
/// # Examples
///
/// ```
/// use megad_lib::event::EntityEvent;
/// use megad_lib::gesture::Gesture;
///
/// let event = EntityEvent::gesture("binary_sensor.mega_7", Gesture::DoubleClick);
/// assert_eq!(event.entity_id(), "binary_sensor.mega_7");
/// assert!(event.is_gesture());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EntityEvent {
    /// The entity's state was written to the platform.
    StateChanged {
        /// New state snapshot.
        state: EntityState,
    },

    /// A digital input produced a button gesture.
    Gesture {
        /// Platform entity id of the input.
        entity_id: String,
        /// Classified gesture.
        #[serde(rename = "type")]
        gesture: Gesture,
    },
}

impl EntityEvent {
    /// Returns the entity id the event belongs to.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        match self {
            Self::StateChanged { state } => &state.entity_id,
            Self::Gesture { entity_id, .. } => entity_id,
        }
    }

    /// Returns `true` if this is a state write.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Returns `true` if this is a gesture event.
    #[must_use]
    pub fn is_gesture(&self) -> bool {
        matches!(self, Self::Gesture { .. })
    }

    /// Creates a state changed event.
    #[must_use]
    pub fn state_changed(state: EntityState) -> Self {
        Self::StateChanged { state }
    }

    /// Creates a gesture event.
    #[must_use]
    pub fn gesture(entity_id: impl Into<String>, gesture: Gesture) -> Self {
        Self::Gesture {
            entity_id: entity_id.into(),
            gesture,
        }
    }
}
