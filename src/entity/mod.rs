// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Port entities.
//!
//! A [`PortEntity`] projects the cached value of one port into the state a
//! home-automation platform shows (on/off, brightness, availability) and
//! turns user intent back into device commands.
//!
//! The entity's capabilities are fixed by its [`EntityKind`]:
//!
//! | Kind | Domain | Actuation | Gestures |
//! |------|--------|-----------|----------|
//! | `Relay` | switch | on/off | no |
//! | `Dimmer` | light | on/off, brightness, ramps | no |
//! | `DigitalInput` | binary_sensor | none | yes |
//! | `DualChannelRelay` | switch | on/off, re-read after command | no |
//!
//! The state is `unknown` until the device reports the port or a restored
//! state is handed in through [`PortEntity::added_to_platform`]. Payloads
//! that cannot be decoded are logged and also read as `unknown`.
//!
//! State writes and gestures are published as [`EntityEvent`]s on the
//! device's [`EventBus`].
//!
//! [`EntityEvent`]: crate::event::EntityEvent
//! [`EventBus`]: crate::event::EventBus

mod config;
mod customize;
mod info;
mod kind;
mod port_entity;

pub use config::EntityConfig;
pub use customize::{Customize, CustomizeConfig, channel_key};
pub use info::{DOMAIN, DeviceInfo, MANUFACTURER, display_name, slugify, unique_id};
pub use kind::EntityKind;
pub use port_entity::PortEntity;

pub(crate) use port_entity::EntityShared;
