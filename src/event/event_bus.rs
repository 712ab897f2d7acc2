// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event bus for broadcasting entity events.

use tokio::sync::broadcast;

use super::EntityEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast channel carrying entity state writes and gestures.
///
/// Entities publish here in place of writing to the platform directly; the
/// platform integration subscribes. A subscriber that falls more than the
/// capacity behind loses the oldest events (`RecvError::Lagged`).
///
/// # Examples
///
/// ```
/// use megad_lib::event::{EntityEvent, EventBus};
/// use megad_lib::gesture::Gesture;
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(EntityEvent::gesture("binary_sensor.mega_1", Gesture::Press));
/// assert!(rx.try_recv().unwrap().is_gesture());
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EntityEvent>,
}

impl EventBus {
    /// Creates a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new event bus buffering at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EntityEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event, returning how many subscribers received it.
    ///
    /// Events published without subscribers are discarded.
    pub fn publish(&self, event: EntityEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Gesture;

    #[test]
    fn publish_without_subscribers_is_discarded() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(EntityEvent::gesture("x", Gesture::Press)), 0);
    }

    #[tokio::test]
    async fn clones_share_the_channel() {
        let bus = EventBus::with_capacity(8);
        let mut rx = bus.subscribe();
        let other = bus.clone();
        assert_eq!(other.subscriber_count(), 1);

        other.publish(EntityEvent::gesture("binary_sensor.a", Gesture::Release));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.entity_id(), "binary_sensor.a");
    }

    #[test]
    fn dropped_subscriber_is_not_counted() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
