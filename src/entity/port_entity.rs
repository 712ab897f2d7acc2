// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Port entity state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::codec;
use crate::command::{Command, PortQuery, Priority};
use crate::device::DeviceConnection;
use crate::entity::info::{self, DeviceInfo};
use crate::entity::{Customize, CustomizeConfig, EntityConfig, EntityKind};
use crate::error::{DecodeError, Error, Result};
use crate::event::EntityEvent;
use crate::protocol::Transport;
use crate::smooth::{self, RampHandle, RampPlan, RampTiming};
use crate::state::{EntityState, RestoredState};
use crate::subscription::SubscriptionId;
use crate::types::{LevelRange, MAX_BRIGHTNESS, PortId};

/// Transitions longer than this publish state on every ramp step.
const STEP_STATE_THRESHOLD: Duration = Duration::from_secs(3);

/// An entity bound to one port (or a group of ports) of a device.
///
/// Cloning is cheap; clones share the same state.
///
/// # Examples
///
/// ```no_run
/// use megad_lib::device::{ConnectionConfig, DeviceConnection};
/// use megad_lib::entity::{CustomizeConfig, EntityConfig, EntityKind, PortEntity};
/// use megad_lib::protocol::HttpConfig;
/// use megad_lib::types::{DimmerScale, PortId};
/// use std::sync::Arc;
///
/// # async fn example() -> megad_lib::Result<()> {
/// let transport = HttpConfig::new("192.168.0.14").into_transport()?;
/// let device = DeviceConnection::new(ConnectionConfig::new("mega1"), transport);
///
/// let lamp = PortEntity::new(
///     &device,
///     EntityConfig::new(PortId::from(5), EntityKind::Dimmer(DimmerScale::Standard)),
///     Arc::new(CustomizeConfig::default()),
/// )?;
/// lamp.added_to_platform(None);
///
/// lamp.turn_on(Some(128), None).await?;
/// assert_eq!(lamp.is_on(), Some(true));
/// # Ok(())
/// # }
/// ```
pub struct PortEntity<T: Transport> {
    shared: Arc<EntityShared<T>>,
}

impl<T: Transport> Clone for PortEntity<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[derive(Debug, Default)]
struct Memory {
    brightness: Option<u8>,
    restore_brightness: Option<u8>,
    last_called: Option<Instant>,
    restored: Option<RestoredState>,
}

pub(crate) struct EntityShared<T: Transport> {
    device: Arc<DeviceConnection<T>>,
    port: PortId,
    kind: EntityKind,
    id_suffix: Option<String>,
    unique_id: String,
    base_name: String,
    entity_id: String,
    default_smooth: Option<Duration>,
    explicit_customize: Option<Customize>,
    overlay: Arc<CustomizeConfig>,
    customize: OnceLock<Customize>,
    memory: Mutex<Memory>,
    added: AtomicBool,
    removed: AtomicBool,
    ramp: RampHandle,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl<T: Transport> PortEntity<T> {
    /// Creates an entity, registers it with the device and subscribes it to
    /// pushes for its port.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if a composite port lacks its
    /// suffix, name or overlay.
    pub fn new(
        device: &Arc<DeviceConnection<T>>,
        config: EntityConfig,
        overlay: Arc<CustomizeConfig>,
    ) -> Result<Self> {
        config.validate()?;
        let EntityConfig {
            port,
            kind,
            id_suffix,
            name,
            unique_id,
            entity_id,
            customize,
            smooth,
        } = config;

        let suffix = id_suffix.as_deref();
        let unique_id = unique_id.unwrap_or_else(|| info::unique_id(device.id(), &port, suffix));
        let base_name = name.unwrap_or_else(|| {
            info::display_name(device.id(), &port.name(device.config().new_naming()), suffix)
        });
        let entity_id =
            entity_id.unwrap_or_else(|| format!("{}.{}", kind.domain(), info::slugify(&base_name)));

        let shared = Arc::new(EntityShared {
            device: Arc::clone(device),
            port,
            kind,
            id_suffix,
            unique_id,
            base_name,
            entity_id,
            default_smooth: smooth,
            explicit_customize: customize,
            overlay,
            customize: OnceLock::new(),
            memory: Mutex::new(Memory::default()),
            added: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            ramp: RampHandle::new(),
            subscription: Mutex::new(None),
        });

        device.register_entity(&shared);
        let weak = Arc::downgrade(&shared);
        let id = device.subscribe(shared.port.clone(), move |payload| {
            let Some(entity) = weak.upgrade() else {
                return Err(Error::Removed);
            };
            entity.on_push(payload);
            Ok(())
        });
        *shared.subscription.lock() = Some(id);

        tracing::debug!(
            entity_id = %shared.entity_id,
            port = %shared.port,
            kind = ?shared.kind,
            "Entity created"
        );
        Ok(Self { shared })
    }

    pub(crate) fn from_shared(shared: Arc<EntityShared<T>>) -> Self {
        Self { shared }
    }

    /// Returns the device connection.
    #[must_use]
    pub fn device(&self) -> &Arc<DeviceConnection<T>> {
        &self.shared.device
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> &PortId {
        &self.shared.port
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> &EntityKind {
        &self.shared.kind
    }

    /// Returns the unique id.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.shared.unique_id
    }

    /// Returns the platform entity id.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.shared.entity_id
    }

    /// Returns the display name, preferring the overlay's.
    #[must_use]
    pub fn name(&self) -> String {
        self.shared.name()
    }

    /// Returns `false` for entities whose name contains `<`.
    #[must_use]
    pub fn enabled_by_default(&self) -> bool {
        !self.name().contains('<')
    }

    /// Returns `true` while the device is online.
    #[must_use]
    pub fn available(&self) -> bool {
        self.shared.device.is_online()
    }

    /// Returns the resolved customization overlay.
    #[must_use]
    pub fn customize(&self) -> &Customize {
        self.shared.customize()
    }

    /// Returns `true` if on and off are swapped.
    #[must_use]
    pub fn invert(&self) -> bool {
        self.shared.invert()
    }

    /// Returns the device-space brightness range.
    #[must_use]
    pub fn range(&self) -> LevelRange {
        self.shared.range()
    }

    /// Returns the smoothing time for a full-range sweep.
    #[must_use]
    pub fn smooth(&self) -> Option<Duration> {
        self.shared.smooth()
    }

    /// Returns `true` if the firmware can ramp this entity's ports.
    #[must_use]
    pub fn hardware_capable(&self) -> bool {
        self.shared.hardware_capable()
    }

    /// Returns `true` if level changes go through a ramp.
    #[must_use]
    pub fn smooth_dim(&self) -> bool {
        self.shared.smooth_dim()
    }

    /// Returns `true` while a software ramp is running.
    #[must_use]
    pub fn is_ramping(&self) -> bool {
        self.shared.ramp.is_running()
    }

    /// Returns the on/off state, `None` when unknown.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.shared.is_on()
    }

    /// Returns the brightness of a dimmer.
    #[must_use]
    pub fn brightness(&self) -> Option<u8> {
        self.shared.brightness()
    }

    /// Returns the registry entry grouping this entity under its device.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(
            self.shared.device.config(),
            &self.shared.port,
            self.shared.id_suffix.as_deref(),
            &self.name(),
        )
    }

    /// Returns a snapshot of the platform-visible state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.shared.state()
    }

    /// Publishes the current state on the device event bus.
    ///
    /// Does nothing before [`added_to_platform`](Self::added_to_platform) or
    /// after removal.
    pub fn write_state(&self) {
        self.shared.write_state();
    }

    /// Marks the entity as added, keeping the last state known to the
    /// platform as fallback while the device has reported nothing.
    pub fn added_to_platform(&self, restored: Option<RestoredState>) {
        {
            let mut memory = self.shared.memory.lock();
            if let Some(brightness) = restored.and_then(|r| r.brightness) {
                memory.brightness = Some(brightness);
                memory.restore_brightness = Some(brightness);
            }
            memory.restored = restored;
        }
        self.shared.added.store(true, Ordering::Release);
        tracing::debug!(entity_id = %self.entity_id(), ?restored, "Entity added");
        self.shared.write_state();
    }

    /// Cancels any live ramp and stops receiving pushes.
    pub fn will_remove_from_platform(&self) {
        self.shared.removed.store(true, Ordering::Release);
        self.shared.ramp.cancel();
        if let Some(id) = self.shared.subscription.lock().take() {
            self.shared.device.unsubscribe(id);
        }
        tracing::debug!(entity_id = %self.entity_id(), "Entity removed");
    }

    /// Switches the entity on.
    ///
    /// Calls within the debounce window of the previous actuation are
    /// dropped. `brightness` and `transition` only apply to dimmers.
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityNotSupported` for digital inputs
    /// - `Error::Removed` after removal
    /// - `Error::Protocol` if the device could not be reached
    pub async fn turn_on(&self, brightness: Option<u8>, transition: Option<Duration>) -> Result<()> {
        self.shared.turn_on(brightness, transition).await
    }

    /// Switches the entity off, remembering the brightness for the next
    /// [`turn_on`](Self::turn_on).
    ///
    /// # Errors
    ///
    /// Same as [`turn_on`](Self::turn_on).
    pub async fn turn_off(&self, transition: Option<Duration>) -> Result<()> {
        self.shared.turn_off(transition).await
    }
}

impl<T: Transport> std::fmt::Debug for PortEntity<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortEntity")
            .field("entity_id", &self.shared.entity_id)
            .field("port", &self.shared.port)
            .field("kind", &self.shared.kind)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> EntityShared<T> {
    fn name(&self) -> String {
        self.customize()
            .name
            .clone()
            .unwrap_or_else(|| self.base_name.clone())
    }

    fn customize(&self) -> &Customize {
        self.customize.get_or_init(|| match &self.explicit_customize {
            Some(customize) => customize.clone(),
            None => {
                let channel = self.kind.addr().zip(self.kind.index());
                self.overlay
                    .resolve(self.device.id(), &self.port, channel, &self.entity_id)
            }
        })
    }

    fn invert(&self) -> bool {
        self.customize().invert.unwrap_or(false)
    }

    fn range(&self) -> LevelRange {
        self.customize()
            .range
            .unwrap_or_else(|| LevelRange::full(self.kind.scale()))
    }

    fn smooth(&self) -> Option<Duration> {
        self.customize()
            .smooth_duration()
            .or(self.default_smooth)
            .filter(|d| !d.is_zero())
    }

    fn hardware_capable(&self) -> bool {
        let config = self.device.config();
        match &self.port {
            PortId::Single(addr) => config.supports_hardware_smoothing(*addr),
            PortId::Composite(addrs) => addrs
                .iter()
                .all(|addr| !addr.is_extension() && config.supports_hardware_smoothing(*addr)),
        }
    }

    fn smooth_dim(&self) -> bool {
        self.kind.is_dimmer() && (self.smooth().is_some() || self.hardware_capable())
    }

    fn is_live(&self) -> bool {
        self.added.load(Ordering::Acquire) && !self.removed.load(Ordering::Acquire)
    }

    // ========== Projections ==========

    fn is_on(&self) -> Option<bool> {
        let raw = self.device.value(&self.port);
        if codec::is_empty(raw.as_ref()) {
            return self.memory.lock().restored.map(|r| r.is_on);
        }
        match codec::decode_state(
            raw.as_ref(),
            &self.port,
            self.kind.value_kind(),
            self.invert(),
            self.kind.addr(),
            self.kind.index(),
        ) {
            Ok(on) => Some(on),
            Err(DecodeError::Empty) => None,
            Err(DecodeError::MissingAddress) => {
                tracing::warn!(entity_id = %self.entity_id, "Channel index configured without address");
                None
            }
            Err(e) => {
                tracing::warn!(entity_id = %self.entity_id, error = %e, "Cannot decode port state");
                None
            }
        }
    }

    fn device_level(&self) -> Option<u16> {
        let raw = self.device.value(&self.port);
        codec::decode_level(raw.as_ref(), &self.port, self.kind.scale())
            .unwrap_or_else(|e| {
                tracing::warn!(entity_id = %self.entity_id, error = %e, "Cannot decode port level");
                None
            })
    }

    fn brightness(&self) -> Option<u8> {
        if !self.kind.is_dimmer() {
            return None;
        }
        match self.device_level() {
            None | Some(0) => self.memory.lock().brightness,
            Some(level) => Some(codec::level_to_brightness(level, self.range())),
        }
    }

    fn state(&self) -> EntityState {
        EntityState {
            entity_id: self.entity_id.clone(),
            available: self.device.is_online(),
            is_on: self.is_on(),
            brightness: self.brightness(),
            last_updated: Utc::now(),
        }
    }

    pub(crate) fn write_state(&self) {
        if !self.is_live() {
            return;
        }
        let state = self.state();
        tracing::debug!(entity_id = %self.entity_id, state = state.as_str(), "Writing state");
        self.device.events().publish(EntityEvent::state_changed(state));
    }

    // ========== Push ==========

    fn on_push(&self, payload: &Value) {
        if !self.is_live() {
            return;
        }
        self.write_state();

        if self.kind != EntityKind::DigitalInput {
            return;
        }
        if !self.device.is_settled() {
            tracing::debug!(entity_id = %self.entity_id, "Device settling, gesture ignored");
            return;
        }
        if let Some(gesture) = self.device.classify_gesture(&self.port, payload) {
            tracing::debug!(entity_id = %self.entity_id, gesture = gesture.as_str(), "Gesture");
            self.device
                .events()
                .publish(EntityEvent::gesture(self.entity_id.clone(), gesture));
        }
    }

    // ========== Actuation ==========

    fn check_actuator(&self, operation: &'static str) -> Result<()> {
        if self.removed.load(Ordering::Acquire) {
            return Err(Error::Removed);
        }
        if !self.kind.is_actuator() {
            return Err(Error::CapabilityNotSupported(operation));
        }
        Ok(())
    }

    /// Returns `false` if the call falls within the debounce window.
    fn debounce(&self) -> bool {
        let window = self.device.config().debounce();
        let now = Instant::now();
        let mut memory = self.memory.lock();
        if memory
            .last_called
            .is_some_and(|last| now.duration_since(last) < window)
        {
            return false;
        }
        memory.last_called = Some(now);
        true
    }

    fn cmd_ports(&self) -> Vec<String> {
        let letter = self.kind.channel_letter();
        self.port
            .addrs()
            .iter()
            .map(|addr| match letter {
                Some(letter) => format!("{addr}{letter}"),
                None => addr.to_string(),
            })
            .collect()
    }

    fn command_addr(&self) -> Option<String> {
        self.kind.addr().map(str::to_string)
    }

    async fn send_direct(&self, value: u16) -> Result<()> {
        for port in self.cmd_ports() {
            let command = Command::set(port, value).with_addr(self.command_addr());
            self.device.request(&command, Priority::Urgent).await?;
        }
        Ok(())
    }

    fn store_level(device: &DeviceConnection<T>, port: &PortId, level: u16) {
        device.set_value(port.clone(), codec::cache_entry(port, json!(level)));
    }

    /// Moves the level from `from` to `to` through a ramp.
    ///
    /// Firmware ramps are awaited. Software ramps run on their own task and
    /// overwrite the cache with each applied step until they finish or are
    /// replaced.
    async fn start_ramp(
        self: &Arc<Self>,
        from: u16,
        to: u16,
        transition: Option<Duration>,
    ) -> Result<()> {
        let config = self.device.config();
        let timing = match transition {
            Some(duration) => RampTiming::Transition(duration),
            None => RampTiming::Smooth(self.smooth().unwrap_or_default()),
        };
        let plan = RampPlan::new(self.cmd_ports(), from, to, self.kind.scale().max_level())
            .with_addr(self.command_addr())
            .with_timing(timing)
            .with_hardware(self.hardware_capable())
            .with_min_step(config.ramp_step());

        if plan.delegates_to_hardware() {
            self.ramp.cancel();
            let device = &self.device;
            let port = &self.port;
            smooth::ramp(device.transport(), &plan, |level| {
                Self::store_level(device, port, level);
            })
            .await?;
            return Ok(());
        }

        let publish_steps = transition.is_some_and(|d| d > STEP_STATE_THRESHOLD);
        let device = Arc::clone(&self.device);
        let port = self.port.clone();
        let entity: Weak<Self> = Arc::downgrade(self);
        let entity_id = self.entity_id.clone();

        self.ramp.start(async move {
            let result = smooth::ramp(device.transport(), &plan, |level| {
                Self::store_level(&device, &port, level);
                if publish_steps && let Some(entity) = entity.upgrade() {
                    entity.write_state();
                }
            })
            .await;
            if let Err(e) = result {
                tracing::warn!(entity_id = %entity_id, error = %e, "Ramp aborted");
            }
            if let Some(entity) = entity.upgrade() {
                entity.write_state();
            }
        });
        Ok(())
    }

    /// Refreshes the cache after a direct command.
    async fn sync_after(&self, on: bool, level: u16) -> Result<()> {
        if self.kind.index().is_some() {
            // Expander channels do not echo their state.
            self.device
                .get_port(&self.port, PortQuery::channel_list())
                .await?;
        } else if self.port.is_extension() && !self.kind.is_dimmer() {
            self.device.set_value(
                self.port.clone(),
                Value::from(codec::state_token(on, self.invert())),
            );
        } else {
            Self::store_level(&self.device, &self.port, level);
        }
        Ok(())
    }

    async fn turn_on(self: &Arc<Self>, brightness: Option<u8>, transition: Option<Duration>) -> Result<()> {
        self.check_actuator("turn_on")?;
        if !self.debounce() {
            return Ok(());
        }

        let dimmer = self.kind.is_dimmer();
        let transition = transition.filter(|_| dimmer);
        let ramped = dimmer && (self.smooth_dim() || transition.is_some());

        let requested = brightness.filter(|b| *b > 0);
        let restore = if requested.is_none() && self.is_on() != Some(true) {
            self.memory.lock().restore_brightness
        } else {
            None
        };
        let target = requested
            .or(restore)
            .or_else(|| self.brightness())
            .unwrap_or(MAX_BRIGHTNESS);

        let value = if dimmer {
            self.memory.lock().brightness = Some(target);
            codec::encode_level(target, self.range())
        } else {
            codec::encode_state(true, self.invert())
        };
        tracing::debug!(
            entity_id = %self.entity_id,
            brightness = target,
            value,
            ramped,
            "Turning on"
        );

        if ramped {
            let from = self.device_level().unwrap_or(0);
            self.start_ramp(from, value, transition).await?;
            Self::store_level(&self.device, &self.port, value);
        } else {
            self.send_direct(value).await?;
            self.sync_after(true, value).await?;
        }
        self.write_state();
        Ok(())
    }

    async fn turn_off(self: &Arc<Self>, transition: Option<Duration>) -> Result<()> {
        self.check_actuator("turn_off")?;
        if !self.debounce() {
            return Ok(());
        }

        let dimmer = self.kind.is_dimmer();
        let transition = transition.filter(|_| dimmer);
        let ramped = dimmer && (self.smooth_dim() || transition.is_some());
        {
            let mut memory = self.memory.lock();
            memory.restore_brightness = memory.brightness;
        }

        let value = codec::encode_state(false, self.invert());
        tracing::debug!(entity_id = %self.entity_id, value, ramped, "Turning off");

        if ramped {
            let from = self.device_level().unwrap_or(0);
            self.start_ramp(from, 0, transition).await?;
            Self::store_level(&self.device, &self.port, 0);
        } else {
            self.send_direct(value).await?;
            self.sync_after(false, value).await?;
        }
        self.write_state();
        Ok(())
    }
}

impl<T: Transport> Drop for EntityShared<T> {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.get_mut().take() {
            self.device.unsubscribe(id);
        }
    }
}
