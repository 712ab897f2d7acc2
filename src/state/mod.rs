// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity state projections.
//!
//! [`EntityState`] is the snapshot written to the platform whenever an
//! entity's state changes. [`RestoredState`] is what the platform hands back
//! at startup from its own persistence.
//!
//! # Examples
//!
//! ```
//! use megad_lib::state::RestoredState;
//!
//! let restored = RestoredState::on().with_brightness(180);
//! assert!(restored.is_on);
//! assert_eq!(restored.brightness, Some(180));
//! ```

mod entity_state;

pub use entity_state::{EntityState, RestoredState};
