// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-port push callback registry.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`PushRegistry`] - Stores callbacks by port and dispatches push payloads

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::Error;
use crate::types::PortId;

/// Unique identifier for a subscription.
///
/// IDs are unique within a device connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Callback invoked with the push payload of a port.
pub type PushCallback = Arc<dyn Fn(&Value) -> Result<(), Error> + Send + Sync>;

/// Outcome of dispatching one push payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Callbacks that ran to completion.
    pub delivered: usize,
    /// Callbacks that returned an error.
    pub failed: usize,
}

/// Registry of push callbacks keyed by port.
///
/// Callbacks for one port run in registration order. A failing callback is
/// logged and does not stop the remaining callbacks for the same payload.
pub struct PushRegistry {
    next_id: AtomicU64,
    callbacks: RwLock<HashMap<PortId, Vec<(SubscriptionId, PushCallback)>>>,
}

impl PushRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a callback for pushes on `port`.
    pub fn subscribe<F>(&self, port: PortId, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) -> Result<(), Error> + Send + Sync + 'static,
    {
        let id = self.next_id();
        tracing::debug!(%port, subscription = %id, "Registering push callback");
        self.callbacks
            .write()
            .entry(port)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write();
        let mut removed = false;
        callbacks.retain(|_, subscribers| {
            let before = subscribers.len();
            subscribers.retain(|(sub, _)| *sub != id);
            removed |= subscribers.len() != before;
            !subscribers.is_empty()
        });
        removed
    }

    /// Invokes every callback registered for `port` with `payload`.
    pub fn dispatch(&self, port: &PortId, payload: &Value) -> DispatchReport {
        // Snapshot so callbacks may subscribe or unsubscribe without deadlocking.
        let subscribers: Vec<(SubscriptionId, PushCallback)> = self
            .callbacks
            .read()
            .get(port)
            .cloned()
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        for (id, callback) in subscribers {
            match callback(payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(%port, subscription = %id, error = %e, "Push callback failed");
                    report.failed += 1;
                }
            }
        }
        tracing::trace!(%port, ?report, "Dispatched push payload");
        report
    }

    /// Returns the number of callbacks registered for `port`.
    #[must_use]
    pub fn callback_count(&self, port: &PortId) -> usize {
        self.callbacks.read().get(port).map_or(0, Vec::len)
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }
}

impl Default for PushRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PushRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushRegistry")
            .field("ports", &self.callbacks.read().len())
            .finish_non_exhaustive()
    }
}
