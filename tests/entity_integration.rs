// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for port entities against a recording transport.

use std::sync::Arc;
use std::time::Duration;

use megad_lib::command::{Command, PortQuery, Priority};
use megad_lib::device::{ConnectionConfig, DeviceConnection};
use megad_lib::entity::{Customize, CustomizeConfig, EntityConfig, EntityKind, PortEntity};
use megad_lib::error::ProtocolError;
use megad_lib::event::EntityEvent;
use megad_lib::gesture::Gesture;
use megad_lib::protocol::Transport;
use megad_lib::state::RestoredState;
use megad_lib::types::{DimmerScale, PortAddr, PortId};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::broadcast;

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(Command, Priority)>>,
    fail_after: Option<usize>,
}

impl RecordingTransport {
    /// Accepts `accepted` commands, then fails every later one.
    fn failing_after(accepted: usize) -> Self {
        Self {
            fail_after: Some(accepted),
            ..Self::default()
        }
    }

    fn commands(&self) -> Vec<Command> {
        self.sent.lock().iter().map(|(c, _)| c.clone()).collect()
    }
}

impl Transport for RecordingTransport {
    async fn request(&self, command: &Command, priority: Priority) -> Result<(), ProtocolError> {
        let mut sent = self.sent.lock();
        if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
            return Err(ProtocolError::ConnectionFailed("device unreachable".to_string()));
        }
        sent.push((command.clone(), priority));
        Ok(())
    }

    async fn read_port(&self, _: &str, _: PortQuery) -> Result<Value, ProtocolError> {
        Ok(Value::Null)
    }
}

type Device = Arc<DeviceConnection<RecordingTransport>>;

fn device(config: ConnectionConfig) -> Device {
    DeviceConnection::new(config, RecordingTransport::default())
}

fn settled() -> ConnectionConfig {
    ConnectionConfig::new("mega1").with_settle_window(Duration::ZERO)
}

fn add(device: &Device, config: EntityConfig) -> PortEntity<RecordingTransport> {
    add_with(device, config, CustomizeConfig::default())
}

fn add_with(
    device: &Device,
    config: EntityConfig,
    overlay: CustomizeConfig,
) -> PortEntity<RecordingTransport> {
    let entity = PortEntity::new(device, config, Arc::new(overlay)).unwrap();
    entity.added_to_platform(None);
    entity
}

fn dimmer(port: u16) -> EntityConfig {
    EntityConfig::new(PortId::from(port), EntityKind::Dimmer(DimmerScale::Standard))
}

fn drain(events: &mut broadcast::Receiver<EntityEvent>) -> Vec<EntityEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn gestures(events: &[EntityEvent]) -> Vec<Gesture> {
    events
        .iter()
        .filter_map(|e| match e {
            EntityEvent::Gesture { gesture, .. } => Some(*gesture),
            EntityEvent::StateChanged { .. } => None,
        })
        .collect()
}

// ============================================================================
// Push handling
// ============================================================================

mod push {
    use super::*;

    #[tokio::test]
    async fn relay_push_updates_state_without_gesture() {
        let dev = device(settled());
        let relay = add(&dev, EntityConfig::new(PortId::from(3), EntityKind::Relay));
        let mut events = dev.events().subscribe();

        let report = dev.handle_push(&PortId::from(3), &json!({"value": "ON"}));

        assert_eq!(report.delivered, 1);
        assert_eq!(relay.is_on(), Some(true));
        let events = drain(&mut events);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_state_change());
        assert!(gestures(&events).is_empty());
    }

    #[tokio::test]
    async fn inverted_relay_reads_off_as_on() {
        let overlay = CustomizeConfig::from_json(r#"{"devices": {"mega1": {"6": {"invert": true}}}}"#).unwrap();
        let dev = device(settled());
        let relay = add_with(&dev, EntityConfig::new(PortId::from(6), EntityKind::Relay), overlay);

        dev.handle_push(&PortId::from(6), &json!({"value": "OFF"}));
        assert_eq!(relay.is_on(), Some(true));

        relay.turn_off(None).await.unwrap();
        assert_eq!(dev.transport().commands(), vec![Command::set("6", 1)]);
        assert_eq!(relay.is_on(), Some(false));
    }

    #[tokio::test]
    async fn long_press_then_release() {
        let dev = device(settled());
        let input = add(&dev, EntityConfig::new(PortId::from(4), EntityKind::DigitalInput));
        let mut events = dev.events().subscribe();

        dev.handle_push(input.port(), &json!({"m": 2}));
        dev.handle_push(input.port(), &json!({"m": 1}));
        dev.handle_push(input.port(), &json!({"m": 0}));
        dev.handle_push(input.port(), &json!({"m": 1}));

        assert_eq!(
            gestures(&drain(&mut events)),
            vec![
                Gesture::LongPress,
                Gesture::LongRelease,
                Gesture::Press,
                Gesture::Release
            ]
        );
        assert!(!dev.last_long(input.port()));
    }

    #[tokio::test(start_paused = true)]
    async fn gestures_wait_for_settle_window() {
        let dev = device(ConnectionConfig::new("mega1"));
        let input = add(&dev, EntityConfig::new(PortId::from(4), EntityKind::DigitalInput));
        let mut events = dev.events().subscribe();

        dev.handle_push(input.port(), &json!({"click": 1}));
        assert!(gestures(&drain(&mut events)).is_empty());

        tokio::time::advance(Duration::from_secs(10)).await;
        dev.handle_push(input.port(), &json!({"click": 1}));
        let events = drain(&mut events);
        assert_eq!(gestures(&events), vec![Gesture::SingleClick]);
        assert!(events.iter().any(|e| e.entity_id() == "binary_sensor.mega1_4"));
    }

    #[tokio::test]
    async fn pushes_before_adding_only_update_cache() {
        let dev = device(settled());
        let input = PortEntity::new(
            &dev,
            EntityConfig::new(PortId::from(8), EntityKind::DigitalInput),
            Arc::new(CustomizeConfig::default()),
        )
        .unwrap();
        let mut events = dev.events().subscribe();

        dev.handle_push(input.port(), &json!({"value": "ON", "click": 1}));

        assert!(drain(&mut events).is_empty());
        assert_eq!(input.is_on(), Some(true));
    }

    #[tokio::test]
    async fn availability_follows_connection() {
        let dev = device(settled());
        let relay = add(&dev, EntityConfig::new(PortId::from(3), EntityKind::Relay));
        let mut events = dev.events().subscribe();

        dev.set_online(false);

        assert!(!relay.available());
        let events = drain(&mut events);
        assert!(matches!(
            &events[..],
            [EntityEvent::StateChanged { state }] if state.as_str() == "unavailable"
        ));
    }
}

// ============================================================================
// Actuation
// ============================================================================

mod actuation {
    use super::*;

    #[tokio::test]
    async fn direct_dimmer_command() {
        let dev = device(settled());
        let lamp = add(&dev, dimmer(5));

        lamp.turn_on(Some(128), None).await.unwrap();

        assert_eq!(dev.transport().commands(), vec![Command::set("5", 128)]);
        assert_eq!(dev.value(&PortId::from(5)), Some(json!({"value": 128})));
        assert_eq!(dev.transport().sent.lock()[0].1, Priority::Urgent);
    }

    #[tokio::test]
    async fn rapid_calls_are_debounced() {
        let dev = device(settled());
        let relay = add(&dev, EntityConfig::new(PortId::from(1), EntityKind::Relay));

        relay.turn_on(None, None).await.unwrap();
        relay.turn_on(None, None).await.unwrap();

        assert_eq!(dev.transport().commands().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_after_window_go_through() {
        let dev = device(settled());
        let relay = add(&dev, EntityConfig::new(PortId::from(1), EntityKind::Relay));

        relay.turn_on(None, None).await.unwrap();
        tokio::time::advance(Duration::from_millis(150)).await;
        relay.turn_off(None).await.unwrap();

        assert_eq!(
            dev.transport().commands(),
            vec![Command::set("1", 1), Command::set("1", 0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn brightness_restored_after_off() {
        let dev = device(settled());
        let lamp = add(&dev, dimmer(5));

        lamp.turn_on(Some(90), None).await.unwrap();
        tokio::time::advance(Duration::from_millis(200)).await;
        lamp.turn_off(None).await.unwrap();
        tokio::time::advance(Duration::from_millis(200)).await;
        lamp.turn_on(None, None).await.unwrap();

        assert_eq!(dev.transport().commands().last(), Some(&Command::set("5", 90)));
        assert_eq!(lamp.brightness(), Some(90));
    }

    #[tokio::test]
    async fn restored_brightness_used_on_first_turn_on() {
        let dev = device(settled());
        let lamp = PortEntity::new(&dev, dimmer(5), Arc::new(CustomizeConfig::default())).unwrap();
        lamp.added_to_platform(Some(RestoredState::off().with_brightness(40)));

        assert_eq!(lamp.is_on(), Some(false));
        lamp.turn_on(None, None).await.unwrap();

        assert_eq!(dev.transport().commands(), vec![Command::set("5", 40)]);
    }

    #[tokio::test]
    async fn full_scale_by_default() {
        let dev = device(settled());
        let lamp = add(
            &dev,
            EntityConfig::new(PortId::from(5), EntityKind::Dimmer(DimmerScale::Extended)),
        );

        lamp.turn_on(None, None).await.unwrap();

        assert_eq!(dev.transport().commands(), vec![Command::set("5", 4095)]);
        assert_eq!(lamp.brightness(), Some(255));
    }

    #[tokio::test]
    async fn extension_relay_caches_token() {
        let dev = device(settled());
        let port: PortId = "3e2".parse().unwrap();
        let relay = add(&dev, EntityConfig::new(port.clone(), EntityKind::Relay));

        relay.turn_on(None, None).await.unwrap();

        assert_eq!(dev.transport().commands(), vec![Command::set("3e2", 1)]);
        assert_eq!(dev.value(&port), Some(json!("ON")));
        assert_eq!(relay.is_on(), Some(true));
    }

    #[tokio::test]
    async fn composite_port_commands_every_member() {
        let dev = device(settled());
        let port: PortId = "[1, 2]".parse().unwrap();
        let pair = add(
            &dev,
            EntityConfig::new(port, EntityKind::Relay)
                .with_id_suffix("pair")
                .with_name("Pair")
                .with_customize(Customize::default()),
        );

        pair.turn_on(None, None).await.unwrap();

        assert_eq!(pair.unique_id(), "mega_mega1_pair");
        assert_eq!(
            dev.transport().commands(),
            vec![Command::set("1", 1), Command::set("2", 1)]
        );
        assert_eq!(pair.device_info().model, "MegaD (ports: 1, 2)");
    }
}

// ============================================================================
// Smooth transitions
// ============================================================================

mod smoothing {
    use super::*;

    fn smooth_dimmer(port: u16) -> EntityConfig {
        dimmer(port).with_smooth(Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn configured_smoothing_ramps_in_software() {
        let dev = device(settled());
        let lamp = add(&dev, smooth_dimmer(5));
        assert!(lamp.smooth_dim());

        lamp.turn_on(Some(255), None).await.unwrap();
        assert!(lamp.is_ramping());

        tokio::time::sleep(Duration::from_secs(3)).await;

        let commands = dev.transport().commands();
        assert_eq!(commands.len(), 40);
        assert_eq!(commands.last(), Some(&Command::set("5", 255)));
        assert_eq!(dev.value(&PortId::from(5)), Some(json!({"value": 255})));
        assert!(!lamp.is_ramping());
    }

    #[tokio::test(start_paused = true)]
    async fn ramped_turn_on_reports_target_immediately() {
        let dev = device(settled());
        dev.set_value(PortId::from(5), json!({"value": 0}));
        let lamp = add(&dev, smooth_dimmer(5));
        let mut events = dev.events().subscribe();

        lamp.turn_on(Some(255), None).await.unwrap();

        assert!(lamp.is_ramping());
        assert_eq!(lamp.is_on(), Some(true));
        assert_eq!(dev.value(&PortId::from(5)), Some(json!({"value": 255})));
        let events = drain(&mut events);
        assert_eq!(events.len(), 1);
        let EntityEvent::StateChanged { state } = &events[0] else {
            panic!("expected a state write, got {:?}", events[0]);
        };
        assert_eq!(state.is_on, Some(true));
        assert_eq!(state.brightness, Some(255));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(dev.value(&PortId::from(5)), Some(json!({"value": 255})));
    }

    #[tokio::test(start_paused = true)]
    async fn ramped_turn_off_reports_off_immediately() {
        let dev = device(settled());
        dev.set_value(PortId::from(5), json!({"value": 200}));
        let lamp = add(&dev, smooth_dimmer(5));

        lamp.turn_off(None).await.unwrap();

        assert!(lamp.is_ramping());
        assert_eq!(lamp.is_on(), Some(false));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(dev.transport().commands().last(), Some(&Command::set("5", 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_stops_ramp_at_last_applied_step() {
        let dev = DeviceConnection::new(settled(), RecordingTransport::failing_after(10));
        let lamp = add(&dev, smooth_dimmer(5));
        let mut events = dev.events().subscribe();

        lamp.turn_on(Some(255), None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        let commands = dev.transport().commands();
        assert_eq!(commands.len(), 10);
        assert_eq!(commands.last(), Some(&Command::set("5", 64)));
        assert_eq!(dev.value(&PortId::from(5)), Some(json!({"value": 64})));
        assert!(!lamp.is_ramping());

        let states: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(EntityEvent::is_state_change)
            .collect();
        // One write from turn_on and one when the ramp stops.
        assert_eq!(states.len(), 2);
        let EntityEvent::StateChanged { state } = &states[1] else {
            unreachable!();
        };
        assert_eq!(state.is_on, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn new_ramp_replaces_running_one() {
        let dev = device(settled());
        let lamp = add(&dev, smooth_dimmer(5));

        lamp.turn_on(Some(255), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(525)).await;

        let reached = match dev.value(&PortId::from(5)) {
            Some(Value::Object(map)) => map["value"].as_u64().unwrap(),
            other => panic!("unexpected cache entry {other:?}"),
        };
        assert!(reached > 0 && reached < 255);

        let before_off = dev.transport().commands().len();
        lamp.turn_off(None).await.unwrap();
        assert_eq!(dev.value(&PortId::from(5)), Some(json!({"value": 0})));

        tokio::time::sleep(Duration::from_millis(1)).await;
        // The off ramp starts from the level the first ramp left behind.
        let first_off = dev.transport().commands()[before_off].clone();
        let Command::Set { value, .. } = first_off else {
            panic!("unexpected command {first_off:?}");
        };
        assert!(value > 0 && u64::from(value) < reached);
        assert_eq!(dev.value(&PortId::from(5)), Some(json!({"value": value})));

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(dev.value(&PortId::from(5)), Some(json!({"value": 0})));
        assert!(!lamp.is_ramping());
        let commands = dev.transport().commands();
        assert!(!commands.contains(&Command::set("5", 255)));
        assert_eq!(commands.last(), Some(&Command::set("5", 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn hardware_capable_port_delegates() {
        let config = settled().with_hardware_smoothing([PortAddr::new(10)]);
        let dev = device(config);
        let lamp = add(&dev, dimmer(10));
        assert!(lamp.hardware_capable());
        assert!(lamp.smooth_dim());

        lamp.turn_on(Some(200), None).await.unwrap();

        assert_eq!(dev.transport().commands(), vec![Command::pwm("10", 200)]);
        assert_eq!(dev.value(&PortId::from(10)), Some(json!({"value": 200})));
        assert!(!lamp.is_ramping());
    }

    #[tokio::test(start_paused = true)]
    async fn delegated_ramp_carries_sweep_time() {
        let config = settled().with_hardware_smoothing([PortAddr::new(10)]);
        let dev = device(config);
        let lamp = add(&dev, dimmer(10).with_smooth(Duration::from_secs(2)));

        lamp.turn_on(Some(255), None).await.unwrap();

        assert_eq!(
            dev.transport().commands(),
            vec![Command::pwm("10", 255).with_count(Some(2))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_transition_runs_in_software_even_on_capable_port() {
        let config = settled().with_hardware_smoothing([PortAddr::new(10)]);
        let dev = device(config);
        let lamp = add(&dev, dimmer(10));

        lamp.turn_on(Some(255), Some(Duration::from_secs(1))).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let commands = dev.transport().commands();
        assert_eq!(commands.len(), 20);
        assert!(commands.iter().all(|c| matches!(c, Command::Set { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn long_transition_publishes_each_step() {
        let dev = device(settled());
        let lamp = add(&dev, dimmer(5));
        let mut events = dev.events().subscribe();

        lamp.turn_on(Some(255), Some(Duration::from_secs(4))).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let states = drain(&mut events)
            .into_iter()
            .filter(EntityEvent::is_state_change)
            .count();
        assert!(states > 80);
    }

    #[tokio::test(start_paused = true)]
    async fn removal_cancels_ramp() {
        let dev = device(settled());
        let lamp = add(&dev, smooth_dimmer(5));

        lamp.turn_on(Some(255), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        lamp.will_remove_from_platform();

        let sent = dev.transport().commands().len();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(dev.transport().commands().len(), sent);
        assert!(!lamp.is_ramping());
    }

    #[tokio::test]
    async fn relays_ignore_transitions() {
        let dev = device(settled());
        let relay = add(&dev, EntityConfig::new(PortId::from(1), EntityKind::Relay));

        relay.turn_on(None, Some(Duration::from_secs(5))).await.unwrap();

        assert_eq!(dev.transport().commands(), vec![Command::set("1", 1)]);
        assert!(!relay.is_ramping());
    }
}
