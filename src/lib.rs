// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `MegaD` Lib - port state synchronization and actuation for MegaD I/O
//! controllers.
//!
//! A MegaD controller exposes numbered ports (relays, PWM dimmers, digital
//! inputs, expander channels) over a small HTTP API and pushes port changes
//! back as they happen. This library keeps a per-device cache of the last
//! reported values and turns it into platform-facing entity state.
//!
//! # Features
//!
//! - **Value codec**: decode raw port payloads into on/off and brightness,
//!   including inverted ports and dual-channel expanders
//! - **Gestures**: classify click, double click, press, long press and
//!   release from digital input pushes
//! - **Smooth transitions**: firmware or software ramps, at most one per
//!   entity
//! - **Entities**: debounced turn on/off with brightness restore
//! - **Push fan-out**: route device pushes to the entities of a port
//!
//! # Quick Start
//!
//! ```no_run
//! use megad_lib::device::{ConnectionConfig, DeviceConnection};
//! use megad_lib::entity::{CustomizeConfig, EntityConfig, EntityKind, PortEntity};
//! use megad_lib::protocol::HttpConfig;
//! use megad_lib::subscription::PushPayload;
//! use megad_lib::types::{DimmerScale, PortId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> megad_lib::Result<()> {
//!     let transport = HttpConfig::new("192.168.0.14").with_password("sec").into_transport()?;
//!     let device = DeviceConnection::new(ConnectionConfig::new("mega1"), transport);
//!     let overlay = Arc::new(CustomizeConfig::default());
//!
//!     let lamp = PortEntity::new(
//!         &device,
//!         EntityConfig::new(PortId::from(10), EntityKind::Dimmer(DimmerScale::Standard)),
//!         Arc::clone(&overlay),
//!     )?;
//!     let button = PortEntity::new(
//!         &device,
//!         EntityConfig::new(PortId::from(3), EntityKind::DigitalInput),
//!         overlay,
//!     )?;
//!     lamp.added_to_platform(None);
//!     button.added_to_platform(None);
//!
//!     let mut events = device.events().subscribe();
//!
//!     // A push received by the HTTP server the device reports to.
//!     let push = PushPayload::from_query("pt=3&click=1")?;
//!     device.handle_push(&push.port, &push.fields);
//!
//!     lamp.turn_on(Some(200), None).await?;
//!
//!     while let Ok(event) = events.try_recv() {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod command;
pub mod device;
pub mod entity;
pub mod error;
pub mod event;
pub mod gesture;
pub mod protocol;
pub mod smooth;
pub mod state;
pub mod subscription;
pub mod types;

pub use command::{Command, PortCmd, PortQuery, Priority};
pub use device::{ConnectionConfig, DeviceConnection};
pub use entity::{Customize, CustomizeConfig, DeviceInfo, EntityConfig, EntityKind, PortEntity};
pub use error::{DecodeError, Error, ProtocolError, Result, ValueError};
pub use event::{EntityEvent, EventBus};
pub use gesture::Gesture;
#[cfg(feature = "http")]
pub use protocol::{HttpConfig, HttpTransport};
pub use protocol::Transport;
pub use state::{EntityState, RestoredState};
pub use subscription::{PushPayload, PushRegistry, SubscriptionId};
pub use types::{DimmerScale, LevelRange, PortAddr, PortId};
