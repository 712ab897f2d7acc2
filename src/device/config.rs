// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device connection configuration.

use std::collections::HashSet;
use std::time::Duration;

use crate::types::PortAddr;

/// Configuration for a device connection.
///
/// # Examples
///
/// ```
/// use megad_lib::device::ConnectionConfig;
/// use megad_lib::types::PortAddr;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new("mega1")
///     .with_model("MegaD-2561")
///     .with_firmware("4.48b5")
///     .with_new_naming(true)
///     .with_hardware_smoothing([PortAddr::new(10), PortAddr::new(11)])
///     .with_settle_window(Duration::from_secs(5));
///
/// assert_eq!(config.id(), "mega1");
/// assert!(config.supports_hardware_smoothing(PortAddr::new(10)));
/// assert_eq!(config.debounce(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    id: String,
    model: String,
    firmware: Option<String>,
    new_naming: bool,
    debounce: Duration,
    settle_window: Duration,
    ramp_step: Duration,
    hardware_smoothing: HashSet<PortAddr>,
}

impl ConnectionConfig {
    /// Window in which repeated actuation calls are dropped.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
    /// Startup period during which gestures are not classified.
    pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_secs(10);
    /// Shortest interval between software ramp steps.
    pub const DEFAULT_RAMP_STEP: Duration = Duration::from_millis(50);
    /// Model reported when none is configured.
    pub const DEFAULT_MODEL: &'static str = "MegaD";

    /// Creates a configuration for the device with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            firmware: None,
            new_naming: false,
            debounce: Self::DEFAULT_DEBOUNCE,
            settle_window: Self::DEFAULT_SETTLE_WINDOW,
            ramp_step: Self::DEFAULT_RAMP_STEP,
            hardware_smoothing: HashSet::new(),
        }
    }

    /// Sets the device model string.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the firmware version.
    #[must_use]
    pub fn with_firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = Some(firmware.into());
        self
    }

    /// Enables zero-padded port names (`"03"` instead of `"3"`).
    #[must_use]
    pub fn with_new_naming(mut self, new_naming: bool) -> Self {
        self.new_naming = new_naming;
        self
    }

    /// Sets the actuation debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the startup settle window.
    #[must_use]
    pub fn with_settle_window(mut self, settle_window: Duration) -> Self {
        self.settle_window = settle_window;
        self
    }

    /// Sets the shortest interval between software ramp steps.
    #[must_use]
    pub fn with_ramp_step(mut self, ramp_step: Duration) -> Self {
        self.ramp_step = ramp_step;
        self
    }

    /// Declares the ports whose firmware can ramp PWM levels itself.
    #[must_use]
    pub fn with_hardware_smoothing(mut self, ports: impl IntoIterator<Item = PortAddr>) -> Self {
        self.hardware_smoothing.extend(ports);
        self
    }

    /// Returns the device id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the model string.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the firmware version, if known.
    #[must_use]
    pub fn firmware(&self) -> Option<&str> {
        self.firmware.as_deref()
    }

    /// Returns `true` if zero-padded port names are used.
    #[must_use]
    pub fn new_naming(&self) -> bool {
        self.new_naming
    }

    /// Returns the actuation debounce window.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Returns the startup settle window.
    #[must_use]
    pub fn settle_window(&self) -> Duration {
        self.settle_window
    }

    /// Returns the shortest interval between software ramp steps.
    #[must_use]
    pub fn ramp_step(&self) -> Duration {
        self.ramp_step
    }

    /// Returns `true` if the port's firmware can ramp levels itself.
    #[must_use]
    pub fn supports_hardware_smoothing(&self, port: PortAddr) -> bool {
        self.hardware_smoothing.contains(&port)
    }
}
