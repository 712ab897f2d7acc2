// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push subscription fan-out.
//!
//! The device pushes port changes as they happen. Entities register one
//! callback per port with the device connection; an inbound push updates the
//! value cache and then runs every callback registered for that port.
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription
//! - [`PushRegistry`] - Registry that stores callbacks and dispatches pushes
//! - [`PushPayload`] - A push notification decoded from its query string
//!
//! # Usage
//!
//! ```
//! use megad_lib::subscription::PushRegistry;
//! use megad_lib::types::PortId;
//! use serde_json::json;
//!
//! let registry = PushRegistry::new();
//! let id = registry.subscribe(PortId::from(3), |payload| {
//!     println!("port 3 pushed {payload}");
//!     Ok(())
//! });
//!
//! registry.dispatch(&PortId::from(3), &json!({"value": "ON"}));
//! registry.unsubscribe(id);
//! ```

mod callback;
mod payload;

pub use callback::{DispatchReport, PushCallback, PushRegistry, SubscriptionId};
pub use payload::PushPayload;
