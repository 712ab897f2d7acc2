// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for MegaD port control.
//!
//! # Types
//!
//! - [`PortAddr`] - A single port, optionally behind an extension board
//! - [`PortId`] - The port(s) an entity is bound to
//! - [`DimmerScale`] - PWM resolution of a dimmer output
//! - [`LevelRange`] - Device levels that platform brightness maps onto

mod level;
mod port;

pub use level::{DimmerScale, LevelRange, MAX_BRIGHTNESS};
pub use port::{PortAddr, PortId};
