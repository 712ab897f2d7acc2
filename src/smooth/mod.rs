// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Smooth level transitions for dimmer outputs.
//!
//! A transition either runs in the device firmware, which ramps a PWM output
//! on its own after a single `pwm` command, or in software, where a task
//! sends interpolated levels at a fixed cadence.
//!
//! The firmware path is used when the port supports it and the caller did
//! not ask for an explicit duration. The software path derives its duration
//! from the explicit transition, or from the configured smoothing time
//! scaled by the fraction of the full range being travelled.
//!
//! [`RampHandle`] keeps at most one software ramp alive per entity: starting
//! a new one aborts the previous task first. Abort only takes effect at an
//! await point, so a step's cache write is never half applied.
//!
//! # Examples
//!
//! ```
//! use megad_lib::smooth::{RampPlan, RampTiming};
//! use std::time::Duration;
//!
//! let plan = RampPlan::new(vec!["5".to_string()], 0, 255, 255)
//!     .with_timing(RampTiming::Smooth(Duration::from_secs(2)));
//!
//! assert_eq!(plan.duration(), Duration::from_secs(2));
//! assert!(!plan.delegates_to_hardware());
//! ```

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::command::{Command, Priority};
use crate::error::ProtocolError;
use crate::protocol::Transport;

/// How long a ramp should take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampTiming {
    /// Duration requested explicitly by the platform; always software-driven.
    Transition(Duration),
    /// Configured smoothing time for a full-range sweep.
    Smooth(Duration),
}

/// Parameters of one level transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampPlan {
    ports: Vec<String>,
    addr: Option<String>,
    from: u16,
    to: u16,
    max_level: u16,
    timing: RampTiming,
    hardware_capable: bool,
    min_step: Duration,
}

impl RampPlan {
    /// Default shortest interval between software steps.
    pub const DEFAULT_MIN_STEP: Duration = Duration::from_millis(50);

    /// Creates a plan moving the given command ports from `from` to `to`.
    #[must_use]
    pub fn new(ports: Vec<String>, from: u16, to: u16, max_level: u16) -> Self {
        Self {
            ports,
            addr: None,
            from,
            to,
            max_level: max_level.max(1),
            timing: RampTiming::Smooth(Duration::ZERO),
            hardware_capable: false,
            min_step: Self::DEFAULT_MIN_STEP,
        }
    }

    /// Sets the channel address carried by every command.
    #[must_use]
    pub fn with_addr(mut self, addr: Option<String>) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the timing.
    #[must_use]
    pub fn with_timing(mut self, timing: RampTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Marks the ports as able to ramp in firmware.
    #[must_use]
    pub fn with_hardware(mut self, capable: bool) -> Self {
        self.hardware_capable = capable;
        self
    }

    /// Sets the shortest interval between software steps.
    #[must_use]
    pub fn with_min_step(mut self, min_step: Duration) -> Self {
        self.min_step = min_step;
        self
    }

    /// Returns the starting level.
    #[must_use]
    pub fn from_level(&self) -> u16 {
        self.from
    }

    /// Returns the target level.
    #[must_use]
    pub fn to_level(&self) -> u16 {
        self.to
    }

    /// Returns `true` if the firmware performs this ramp.
    #[must_use]
    pub fn delegates_to_hardware(&self) -> bool {
        self.hardware_capable && matches!(self.timing, RampTiming::Smooth(_))
    }

    /// Returns the total duration of a software ramp.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self.timing {
            RampTiming::Transition(duration) => duration,
            RampTiming::Smooth(full) => {
                let distance = f64::from(self.from.abs_diff(self.to));
                full.mul_f64(distance / f64::from(self.max_level))
            }
        }
    }

    /// Returns the interpolated levels and the pause after each.
    ///
    /// The last level is always the target.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn steps(&self) -> (Vec<u16>, Duration) {
        let distance = u32::from(self.from.abs_diff(self.to));
        let duration = self.duration();
        if distance == 0 || duration.is_zero() {
            return (vec![self.to], Duration::ZERO);
        }

        let by_time = (duration.as_secs_f64() / self.min_step.as_secs_f64().max(f64::EPSILON))
            .floor()
            .max(1.0) as u32;
        let count = by_time.min(distance);
        let interval = duration / count;

        let from = f64::from(self.from);
        let delta = f64::from(self.to) - from;
        let levels = (1..=count)
            .map(|i| (from + delta * f64::from(i) / f64::from(count)).round() as u16)
            .collect();
        (levels, interval)
    }

    /// Returns the firmware step count of a delegated ramp.
    ///
    /// The count is the time of a full-range sweep in seconds. `None` leaves
    /// the device default in place.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn firmware_count(&self) -> Option<u32> {
        let distance = f64::from(self.from.abs_diff(self.to));
        let duration = self.duration();
        if distance == 0.0 || duration.is_zero() {
            return None;
        }
        let count = (duration.as_secs_f64() / distance * f64::from(self.max_level)).round();
        (count >= 1.0).then_some(count as u32)
    }

    fn command(&self, port: &str, level: u16) -> Command {
        if self.delegates_to_hardware() {
            Command::pwm(port, level)
                .with_count(self.firmware_count())
                .with_addr(self.addr.clone())
        } else {
            Command::set(port, level).with_addr(self.addr.clone())
        }
    }
}

/// Runs a ramp, calling `on_step` after each level is applied.
///
/// Firmware ramps send one `pwm` command per port and report the target as
/// the only step. Software ramps send every interpolated level and sleep
/// between steps.
///
/// # Errors
///
/// Returns the first transport error. Steps applied before the failure stay
/// in effect.
pub async fn ramp<T, F>(transport: &T, plan: &RampPlan, mut on_step: F) -> Result<(), ProtocolError>
where
    T: Transport,
    F: FnMut(u16) + Send,
{
    if plan.delegates_to_hardware() {
        tracing::debug!(ports = ?plan.ports, to = plan.to, "Delegating ramp to firmware");
        for port in &plan.ports {
            transport
                .request(&plan.command(port, plan.to), Priority::Urgent)
                .await?;
        }
        on_step(plan.to);
        return Ok(());
    }

    let (levels, interval) = plan.steps();
    tracing::debug!(
        ports = ?plan.ports,
        from = plan.from,
        to = plan.to,
        steps = levels.len(),
        interval_ms = interval.as_millis(),
        "Starting software ramp"
    );

    let last = levels.len().saturating_sub(1);
    for (i, level) in levels.into_iter().enumerate() {
        for port in &plan.ports {
            transport
                .request(&plan.command(port, level), Priority::Background)
                .await?;
        }
        on_step(level);
        tracing::trace!(level, step = i, "Ramp step applied");
        if i < last {
            tokio::time::sleep(interval).await;
        }
    }
    Ok(())
}

/// Holder of the single live ramp task of an entity.
#[derive(Debug, Default)]
pub struct RampHandle {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RampHandle {
    /// Creates an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts the running ramp, if any, then spawns `future` as the new one.
    pub fn start<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            if !previous.is_finished() {
                tracing::debug!("Cancelling running ramp");
            }
            previous.abort();
        }
        *task = Some(tokio::spawn(future));
    }

    /// Aborts the running ramp, if any.
    pub fn cancel(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Returns `true` while a ramp task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for RampHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::PortQuery;
    use serde_json::Value;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Command>>,
    }

    impl Transport for RecordingTransport {
        async fn request(&self, command: &Command, _: Priority) -> Result<(), ProtocolError> {
            self.sent.lock().push(command.clone());
            Ok(())
        }

        async fn read_port(&self, _: &str, _: PortQuery) -> Result<Value, ProtocolError> {
            Ok(Value::Null)
        }
    }

    fn plan(from: u16, to: u16, timing: RampTiming) -> RampPlan {
        RampPlan::new(vec!["5".to_string()], from, to, 255).with_timing(timing)
    }

    #[test]
    fn smooth_duration_scales_with_distance() {
        let half = plan(0, 128, RampTiming::Smooth(Duration::from_secs(10)));
        let secs = half.duration().as_secs_f64();
        assert!((secs - 10.0 * 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn explicit_transition_overrides_smoothing() {
        let p = plan(0, 10, RampTiming::Transition(Duration::from_secs(4)));
        assert_eq!(p.duration(), Duration::from_secs(4));
        assert!(!p.clone().with_hardware(true).delegates_to_hardware());
    }

    #[test]
    fn steps_end_at_target() {
        let (levels, interval) = plan(0, 255, RampTiming::Transition(Duration::from_secs(1))).steps();
        assert_eq!(levels.len(), 20);
        assert_eq!(interval, Duration::from_millis(50));
        assert_eq!(levels.last(), Some(&255));
        assert!(levels.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn steps_never_exceed_distance() {
        let (levels, _) = plan(100, 97, RampTiming::Transition(Duration::from_secs(5))).steps();
        assert_eq!(levels, vec![99, 98, 97]);
    }

    #[test]
    fn zero_distance_is_single_step() {
        let (levels, interval) = plan(40, 40, RampTiming::Smooth(Duration::from_secs(3))).steps();
        assert_eq!(levels, vec![40]);
        assert_eq!(interval, Duration::ZERO);
    }

    #[test]
    fn firmware_count_follows_sweep_time() {
        let p = plan(255, 0, RampTiming::Smooth(Duration::from_secs(3))).with_hardware(true);
        assert_eq!(p.firmware_count(), Some(3));

        let unset = plan(0, 100, RampTiming::Smooth(Duration::ZERO)).with_hardware(true);
        assert_eq!(unset.firmware_count(), None);
        assert_eq!(plan(7, 7, RampTiming::Smooth(Duration::from_secs(3))).firmware_count(), None);
    }

    #[tokio::test]
    async fn hardware_ramp_sends_single_pwm() {
        let transport = RecordingTransport::default();
        let p = plan(0, 200, RampTiming::Smooth(Duration::from_secs(2))).with_hardware(true);
        let mut steps = Vec::new();

        ramp(&transport, &p, |level| steps.push(level)).await.unwrap();

        assert_eq!(
            *transport.sent.lock(),
            vec![Command::pwm("5", 200).with_count(Some(2))]
        );
        assert_eq!(steps, vec![200]);
    }

    #[tokio::test(start_paused = true)]
    async fn software_ramp_applies_every_step() {
        let transport = RecordingTransport::default();
        let p = plan(0, 4, RampTiming::Transition(Duration::from_secs(1)));
        let mut steps = Vec::new();

        ramp(&transport, &p, |level| steps.push(level)).await.unwrap();

        assert_eq!(steps, vec![1, 2, 3, 4]);
        assert_eq!(transport.sent.lock().last(), Some(&Command::set("5", 4)));
    }

    #[tokio::test(start_paused = true)]
    async fn new_ramp_cancels_previous() {
        let transport = Arc::new(RecordingTransport::default());
        let cache = Arc::new(Mutex::new(None::<u16>));
        let handle = RampHandle::new();

        let spawn_ramp = |p: RampPlan| {
            let transport = Arc::clone(&transport);
            let cache = Arc::clone(&cache);
            async move {
                let _ = ramp(transport.as_ref(), &p, |level| *cache.lock() = Some(level)).await;
            }
        };

        handle.start(spawn_ramp(plan(0, 255, RampTiming::Transition(Duration::from_secs(5)))));
        tokio::time::sleep(Duration::from_millis(1025)).await;
        let reached = cache.lock().expect("first ramp applied steps");
        assert!(reached > 0 && reached < 255);

        handle.start(spawn_ramp(plan(reached, 0, RampTiming::Transition(Duration::from_secs(1)))));
        assert_eq!(*cache.lock(), Some(reached));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*cache.lock(), Some(0));
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ramp() {
        let transport = Arc::new(RecordingTransport::default());
        let handle = RampHandle::new();
        let t = Arc::clone(&transport);
        handle.start(async move {
            let p = plan(0, 255, RampTiming::Transition(Duration::from_secs(5)));
            let _ = ramp(t.as_ref(), &p, |_| {}).await;
        });
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(handle.is_running());

        handle.cancel();
        let sent = transport.sent.lock().len();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(transport.sent.lock().len(), sent);
        assert!(!handle.is_running());
    }
}
