// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection to one MegaD device.
//!
//! [`DeviceConnection`] owns everything the port entities of one device
//! share:
//!
//! - the value cache, mapping each port to its last reported raw value
//! - the long-press latch used by gesture classification
//! - the push registry that fans inbound pushes out to entities
//! - the settle window during which gestures are suppressed
//! - the online flag mirrored by entity availability
//! - weak handles to the entities bound to the device
//!
//! Locks are only held for synchronous sections, so every cache mutation is
//! complete before any task yields.
//!
//! ```no_run
//! use megad_lib::device::{ConnectionConfig, DeviceConnection};
//! use megad_lib::protocol::HttpConfig;
//!
//! # fn example() -> megad_lib::Result<()> {
//! let transport = HttpConfig::new("192.168.0.14").into_transport()?;
//! let connection = DeviceConnection::new(ConnectionConfig::new("mega1"), transport);
//!
//! let mut events = connection.events().subscribe();
//! # Ok(())
//! # }
//! ```

mod config;

pub use config::ConnectionConfig;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::time::Instant;

use crate::codec;
use crate::command::{Command, PortQuery, Priority};
use crate::entity::{EntityShared, PortEntity};
use crate::error::ProtocolError;
use crate::event::EventBus;
use crate::gesture::{self, Gesture};
use crate::protocol::Transport;
use crate::subscription::{DispatchReport, PushRegistry, SubscriptionId};
use crate::types::PortId;

/// Shared state and transport of one MegaD device.
pub struct DeviceConnection<T: Transport> {
    config: ConnectionConfig,
    transport: T,
    values: RwLock<HashMap<PortId, Value>>,
    last_long: Mutex<HashMap<PortId, bool>>,
    push: PushRegistry,
    events: EventBus,
    online: AtomicBool,
    settled_at: Mutex<Instant>,
    entities: RwLock<Vec<Weak<EntityShared<T>>>>,
}

impl<T: Transport> DeviceConnection<T> {
    /// Creates a connection and starts its settle window.
    #[must_use]
    pub fn new(config: ConnectionConfig, transport: T) -> Arc<Self> {
        let settled_at = Instant::now() + config.settle_window();
        tracing::debug!(device = %config.id(), "Device connection created");
        Arc::new(Self {
            config,
            transport,
            values: RwLock::new(HashMap::new()),
            last_long: Mutex::new(HashMap::new()),
            push: PushRegistry::new(),
            events: EventBus::new(),
            online: AtomicBool::new(true),
            settled_at: Mutex::new(settled_at),
            entities: RwLock::new(Vec::new()),
        })
    }

    /// Returns the connection configuration.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the device id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.config.id()
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the event bus entities publish to.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========== Settle window ==========

    /// Returns `true` once the startup settle window has elapsed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        Instant::now() >= *self.settled_at.lock()
    }

    /// Restarts the settle window, e.g. after a reconnect.
    pub fn restart_settle_window(&self) {
        *self.settled_at.lock() = Instant::now() + self.config.settle_window();
        tracing::debug!(device = %self.id(), "Settle window restarted");
    }

    // ========== Availability ==========

    /// Returns `true` if the device is reachable.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Updates the online flag, writing entity state when it changes.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::AcqRel);
        if previous != online {
            tracing::debug!(device = %self.id(), online, "Device availability changed");
            for entity in self.entities() {
                entity.write_state();
            }
        }
    }

    // ========== Value cache ==========

    /// Returns the cached raw value of a port.
    #[must_use]
    pub fn value(&self, port: &PortId) -> Option<Value> {
        self.values.read().get(port).cloned()
    }

    /// Replaces the cached raw value of a port.
    pub fn set_value(&self, port: PortId, value: Value) {
        tracing::trace!(%port, %value, "Cache updated");
        self.values.write().insert(port, value);
    }

    /// Applies a batch of values read by the polling coordinator, then writes
    /// the state of every entity.
    pub fn apply_poll(&self, values: impl IntoIterator<Item = (PortId, Value)>) {
        {
            let mut cache = self.values.write();
            for (port, value) in values {
                cache.insert(port, value);
            }
        }
        for entity in self.entities() {
            entity.write_state();
        }
    }

    // ========== Gesture latch ==========

    /// Returns the long-press latch of a port.
    #[must_use]
    pub fn last_long(&self, port: &PortId) -> bool {
        self.last_long.lock().get(port).copied().unwrap_or(false)
    }

    /// Classifies a push payload against the port's latch, updating it.
    pub fn classify_gesture(&self, port: &PortId, payload: &Value) -> Option<Gesture> {
        let mut latches = self.last_long.lock();
        let latch = latches.entry(port.clone()).or_insert(false);
        gesture::classify(payload, latch)
    }

    // ========== Push fan-out ==========

    /// Registers a push callback for a port.
    pub fn subscribe<F>(&self, port: PortId, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) -> crate::Result<()> + Send + Sync + 'static,
    {
        self.push.subscribe(port, callback)
    }

    /// Removes a push callback.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.push.unsubscribe(id)
    }

    /// Handles an inbound push: updates the cache, then runs the port's
    /// callbacks.
    ///
    /// Regular ports merge the payload fields into their cached mapping so a
    /// hold event without a `value` keeps the last known state. Extension
    /// ports cache the bare `value` field.
    pub fn handle_push(&self, port: &PortId, payload: &Value) -> DispatchReport {
        tracing::debug!(device = %self.id(), %port, %payload, "Push received");
        {
            let mut cache = self.values.write();
            if port.is_extension() {
                if let Some(value) = payload.get(codec::VALUE_KEY) {
                    cache.insert(port.clone(), value.clone());
                }
            } else {
                let entry = cache
                    .entry(port.clone())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                match (entry, payload) {
                    (Value::Object(current), Value::Object(fields)) => {
                        for (key, value) in fields {
                            current.insert(key.clone(), value.clone());
                        }
                    }
                    (entry, payload) => *entry = payload.clone(),
                }
            }
        }
        self.push.dispatch(port, payload)
    }

    // ========== Transport ==========

    /// Sends a command to the device.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the transport fails.
    pub async fn request(&self, command: &Command, priority: Priority) -> Result<(), ProtocolError> {
        tracing::debug!(device = %self.id(), %command, ?priority, "Sending command");
        self.transport.request(command, priority).await
    }

    /// Re-reads a port from the device and stores the answer in the cache.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the transport fails.
    pub async fn get_port(&self, port: &PortId, query: PortQuery) -> Result<Value, ProtocolError> {
        let value = self.transport.read_port(&port.to_string(), query).await?;
        tracing::debug!(device = %self.id(), %port, %value, "Port re-read");
        self.set_value(port.clone(), codec::cache_entry(port, value.clone()));
        Ok(value)
    }

    // ========== Entity registry ==========

    pub(crate) fn register_entity(&self, entity: &Arc<EntityShared<T>>) {
        let mut entities = self.entities.write();
        entities.retain(|weak| weak.strong_count() > 0);
        entities.push(Arc::downgrade(entity));
    }

    /// Returns the live entities bound to this device.
    #[must_use]
    pub fn entities(&self) -> Vec<PortEntity<T>> {
        self.entities
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .map(PortEntity::from_shared)
            .collect()
    }
}

impl<T: Transport> std::fmt::Debug for DeviceConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConnection")
            .field("id", &self.id())
            .field("online", &self.is_online())
            .field("push", &self.push)
            .finish_non_exhaustive()
    }
}
