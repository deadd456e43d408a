//! Integration tests for the SensorNode dispatch loop.
//!
//! Boot, the humidity → temperature → light rotation, BLE hand-off and
//! fault handling, with real bus, link and timer drivers running on
//! simulated peripherals.

use super::mock_hw::{RecordingSink, RecordingSleep, SimBus, SimDelay, SimDevice, SimLink, SimTimer};

use sensenode::app::events::AppEvent;
use sensenode::app::ports::{SensorBus, SerialLink};
use sensenode::app::service::{NodeParts, Sample, SensorNode, METRICS_EVERY_TICKS};
use sensenode::config::NodeConfig;
use sensenode::drivers::i2c::BusId;
use sensenode::drivers::letimer::{Letimer, TimerEvents, TimerIrq};
use sensenode::error::Error;
use sensenode::events::Event;
use sensenode::power::EnergyMode;
use sensenode::safety::FaultPolicy;
use sensenode::selftest::SelfTestStep;
use sensenode::sensors::{veml6030, Reading};
use sensenode::System;

type Node = SensorNode<SimBus, SimBus, SimLink, Letimer<SimTimer>, SimDelay>;

/// 0x663C → 43.9 %RH, 0x6640 → 74.0 °F, 1000 counts → 57.6 lx
const HUMIDITY_RAW: u16 = 0x663C;
const TEMPERATURE_RAW: u16 = 0x6640;
const ALS_RAW: [u8; 2] = [0x03, 0xE8];

fn propagate() -> NodeConfig {
    NodeConfig {
        fault_policy: FaultPolicy::Propagate,
        ..NodeConfig::default()
    }
}

fn make_node_with(sys: &System, config: NodeConfig, humidity_device: SimDevice) -> Node {
    let light_device = SimDevice::new(veml6030::ADDRESS).with_register(veml6030::CMD_READ_ALS, &ALS_RAW);
    let parts = NodeParts {
        light_bus: SimBus::new(BusId::I2c0, light_device),
        humidity_bus: SimBus::new(BusId::I2c1, humidity_device),
        link: SimLink::new(),
        timer: Letimer::open(SimTimer::default(), &config.timer, TimerEvents::default()),
        delay: SimDelay::default(),
    };
    SensorNode::open(sys, config, parts).unwrap()
}

fn make_node(sys: &System) -> Node {
    make_node_with(sys, propagate(), SimDevice::si7021(HUMIDITY_RAW, TEMPERATURE_RAW))
}

/// Open and run the BOOT_UP handler.
fn booted(sys: &System) -> (Node, RecordingSleep, RecordingSink) {
    let mut node = make_node(sys);
    let mut sleep = RecordingSleep::default();
    let mut sink = RecordingSink::default();
    node.run_once(sys, &mut sleep, &mut sink).unwrap();
    (node, sleep, sink)
}

fn tick(sys: &System, node: &mut Node, sleep: &mut RecordingSleep, sink: &mut RecordingSink) -> Option<EnergyMode> {
    node.timer().on_interrupt(sys, TimerIrq::UF);
    node.run_once(sys, sleep, sink).unwrap()
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn open_blocks_system_level_and_raises_boot() {
    let sys = System::new();
    let node = make_node(&sys);

    assert_eq!(sys.energy.blocks(EnergyMode::Em3), 1);
    assert_eq!(sys.events.pending(), Event::BootUp.set());
    assert!(!node.timer().is_running());
}

#[test]
fn boot_runs_self_test_configures_light_sensor_and_starts_timer() {
    let sys = System::new();
    let (node, sleep, sink) = booted(&sys);

    assert!(matches!(sink.events[0], AppEvent::SelfTestPassed(r) if r.user_reg == 0x3B));
    assert_eq!(sink.events[1], AppEvent::Started);
    assert_eq!(node.light_bus().device().writes, vec![(veml6030::REG_ALS_CONF, 0x00)]);
    assert!(node.timer().is_running());
    assert_eq!(sys.energy.blocks(EnergyMode::Em4), 1);

    // system EM3 block is the shallowest → EM2
    assert_eq!(sleep.entered, vec![EnergyMode::Em2]);
    assert!(sys.events.is_idle());
}

#[test]
fn boot_without_self_test_leaves_user_register_alone() {
    let sys = System::new();
    let config = NodeConfig {
        self_test: false,
        ..propagate()
    };
    let mut node = make_node_with(&sys, config, SimDevice::si7021(HUMIDITY_RAW, TEMPERATURE_RAW));
    let mut sink = RecordingSink::default();
    node.run_once(&sys, &mut RecordingSleep::default(), &mut sink).unwrap();

    assert!(node.humidity_bus().device().writes.is_empty());
    assert_eq!(sink.events, vec![AppEvent::Started]);
}

#[test]
fn implausible_humidity_fails_boot() {
    let sys = System::new();
    // 0x1000 → 1.8 %RH
    let mut node = make_node_with(&sys, propagate(), SimDevice::si7021(0x1000, TEMPERATURE_RAW));
    let mut sink = RecordingSink::default();

    let err = node.run_once(&sys, &mut RecordingSleep::default(), &mut sink);

    assert_eq!(err, Err(Error::SelfTest(SelfTestStep::Humidity)));
    assert_eq!(sink.faults(), 1);
    assert!(!node.timer().is_running());
    assert_eq!(node.supervisor().fault_count(), 1);
}

// ── Sampling rotation ─────────────────────────────────────────

#[test]
fn underflows_rotate_through_the_three_readings() {
    let sys = System::new();
    let (mut node, mut sleep, mut sink) = booted(&sys);

    assert_eq!(node.next_sample(), Sample::Humidity);
    tick(&sys, &mut node, &mut sleep, &mut sink);
    assert_eq!(node.next_sample(), Sample::Temperature);
    tick(&sys, &mut node, &mut sleep, &mut sink);
    assert_eq!(node.next_sample(), Sample::Light);
    tick(&sys, &mut node, &mut sleep, &mut sink);
    assert_eq!(node.next_sample(), Sample::Humidity);

    let readings = sink.readings();
    assert_eq!(readings.len(), 3);
    assert!(matches!(readings[0], Reading::Humidity(h) if (h - 43.92).abs() < 0.01));
    assert!(matches!(readings[1], Reading::Temperature(t) if (t - 74.0).abs() < 0.05));
    assert!(matches!(readings[2], Reading::Light(l) if (l - 57.6).abs() < 0.01));

    assert_eq!(node.link().wire_text(), "43.9% humidity\n74.0 F\n 57 lux\n");
    assert_eq!(node.link().stats().sent, 3);
    assert_eq!(sink.faults(), 0);
}

#[test]
fn core_sleeps_shallower_while_a_bus_is_busy() {
    let sys = System::new();
    let (mut node, mut sleep, mut sink) = booted(&sys);
    node.humidity_bus_mut().hold = true;

    assert_eq!(tick(&sys, &mut node, &mut sleep, &mut sink), Some(EnergyMode::Em1));
    assert!(node.humidity_bus().is_busy());
    assert!(sink.readings().is_empty());

    node.humidity_bus_mut().flush(&sys).unwrap();
    assert_eq!(sys.events.pending(), Event::HumidityRead.set());

    assert_eq!(
        node.run_once(&sys, &mut sleep, &mut sink).unwrap(),
        Some(EnergyMode::Em2)
    );
    assert_eq!(sink.readings().len(), 1);
}

#[test]
fn busy_link_queues_the_next_reading() {
    let sys = System::new();
    let (mut node, mut sleep, mut sink) = booted(&sys);
    node.link_mut().hold = true;

    tick(&sys, &mut node, &mut sleep, &mut sink);
    tick(&sys, &mut node, &mut sleep, &mut sink);
    assert_eq!(node.link().stats().queued, 1);
    // transmitter holds EM3 on top of the system block
    assert_eq!(sys.energy.blocks(EnergyMode::Em3), 2);

    node.link_mut().flush(&sys).unwrap();
    assert_eq!(sys.events.pending(), Event::BleTxDone.set());
    node.run_once(&sys, &mut sleep, &mut sink).unwrap();
    node.link_mut().flush(&sys).unwrap();
    node.run_once(&sys, &mut sleep, &mut sink).unwrap();

    assert_eq!(node.link().wire_text(), "43.9% humidity\n74.0 F\n");
    assert_eq!(node.link().stats().queued, 0);
    assert_eq!(sys.energy.blocks(EnergyMode::Em3), 1);
}

#[test]
fn full_link_queue_drops_without_faulting() {
    let sys = System::new();
    let (mut node, mut sleep, mut sink) = booted(&sys);
    node.link_mut().hold = true;

    // one in flight, four queued, one dropped
    for _ in 0..6 {
        tick(&sys, &mut node, &mut sleep, &mut sink);
    }

    let stats = node.link().stats();
    assert_eq!(stats.queued, 4);
    assert_eq!(stats.dropped, 1);
    assert_eq!(sink.faults(), 0);
    assert_eq!(sink.readings().len(), 6);
}

#[test]
fn metrics_are_emitted_once_per_period() {
    let sys = System::new();
    let (mut node, mut sleep, mut sink) = booted(&sys);

    for _ in 0..METRICS_EVERY_TICKS {
        tick(&sys, &mut node, &mut sleep, &mut sink);
    }

    let metrics: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Metrics(m) => Some(*m),
            _ => None,
        })
        .collect();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].ticks, METRICS_EVERY_TICKS);
    // five self-test transfers, then two of every three ticks
    assert_eq!(metrics[0].humidity_bus.completed, 5 + 2 * METRICS_EVERY_TICKS / 3);
    // start-up write, then every third tick
    assert_eq!(metrics[0].light_bus.completed, 1 + METRICS_EVERY_TICKS / 3);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn compare_event_is_fatal() {
    let sys = System::new();
    let (mut node, mut sleep, mut sink) = booted(&sys);

    sys.events.add(Event::LetimerComp0);
    let err = node.run_once(&sys, &mut sleep, &mut sink);

    assert_eq!(err, Err(Error::UnexpectedEvent(Event::LetimerComp0)));
    assert_eq!(sink.faults(), 1);
    assert_eq!(node.supervisor().first_fault(), Some(Error::UnexpectedEvent(Event::LetimerComp0)));
    // the handler removed its own bit before failing
    assert!(sys.events.is_idle());
}

#[test]
#[should_panic(expected = "fatal")]
fn halt_policy_stops_on_first_fault() {
    let sys = System::new();
    let mut node = make_node_with(&sys, NodeConfig::default(), SimDevice::si7021(HUMIDITY_RAW, TEMPERATURE_RAW));
    let mut sleep = RecordingSleep::default();
    let mut sink = RecordingSink::default();
    node.run_once(&sys, &mut sleep, &mut sink).unwrap();

    sys.events.add(Event::LetimerComp1);
    let _ = node.run_once(&sys, &mut sleep, &mut sink);
}

#[test]
fn reserved_event_bits_are_dropped() {
    let sys = System::new();
    let (mut node, mut sleep, mut sink) = booted(&sys);

    sys.events.add(Event::BleRxDone);
    assert_eq!(node.run_once(&sys, &mut sleep, &mut sink), Ok(Some(EnergyMode::Em2)));
    assert_eq!(sink.faults(), 0);
    assert!(sys.events.is_idle());
}
