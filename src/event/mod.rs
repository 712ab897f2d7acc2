// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events published by port entities.
//!
//! [`EventBus`] wraps a tokio broadcast channel. Entities publish
//! [`EntityEvent::StateChanged`] whenever their platform state should be
//! written, and digital inputs publish [`EntityEvent::Gesture`] for button
//! gestures.

mod entity_event;
mod event_bus;

pub use entity_event::EntityEvent;
pub use event_bus::EventBus;
