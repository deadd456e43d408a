//! Two-wire bus state machine against a simulated slave.
//!
//! Exercises complete transactions through the interrupt entry point the
//! way the I2C handlers do on target, together with the energy-mode
//! blocks the bus holds while busy.

use super::mock_hw::{pump_bus, RecordingSleep, SimDevice};

use sensenode::config::BusConfig;
use sensenode::drivers::i2c::{BusCause, BusId, BusState, I2cBus, Transfer};
use sensenode::error::{BusError, Error};
use sensenode::events::{Event, EventSet};
use sensenode::power::EnergyMode;
use sensenode::sensors::{si7021, veml6030};
use sensenode::System;

fn humidity_bus(device: SimDevice) -> I2cBus<SimDevice> {
    I2cBus::open(BusId::I2c1, device, &BusConfig::for_bus(BusId::I2c1))
}

// ── Complete transactions ─────────────────────────────────────

#[test]
fn humidity_read_assembles_big_endian_and_raises_event() {
    let sys = System::new();
    let mut bus = humidity_bus(SimDevice::si7021(0x663C, 0x6640));

    bus.start(&sys, Transfer::read(0x40, 0xF5, 2, Event::HumidityRead)).unwrap();
    assert!(bus.is_busy());
    assert_eq!(sys.energy.blocks(EnergyMode::Em2), 1);

    pump_bus(&sys, &mut bus).unwrap();

    assert!(!bus.is_busy());
    assert_eq!(bus.state(), BusState::StartCommand);
    assert_eq!(bus.data(), 0x663C);
    assert_eq!(sys.events.pending().bits(), 0x08);
    assert_eq!(sys.energy.blocks(EnergyMode::Em2), 0);
    assert_eq!(bus.stats().completed, 1);
}

#[test]
fn four_byte_read_fills_the_whole_word() {
    let sys = System::new();
    let device = SimDevice::new(0x29).with_register(0x10, &[0x12, 0x34, 0x56, 0x78]);
    let mut bus = I2cBus::open(BusId::I2c0, device, &BusConfig::for_bus(BusId::I2c0));

    bus.start(&sys, Transfer::read(0x29, 0x10, 4, Event::LightRead)).unwrap();
    pump_bus(&sys, &mut bus).unwrap();

    assert_eq!(bus.data(), 0x1234_5678);
}

#[test]
fn conversion_in_progress_is_polled_through_nacks() {
    let sys = System::new();
    let mut device = SimDevice::si7021(0x663C, 0x6640);
    device.nack_polls = 3;
    let mut bus = humidity_bus(device);

    bus.start(&sys, si7021::temperature_read(Event::TemperatureRead)).unwrap();
    pump_bus(&sys, &mut bus).unwrap();

    assert_eq!(bus.data(), 0x6640);
    assert_eq!(bus.stats().nack_retries, 3);
    // write-address start, then one read-address start per poll
    assert_eq!(bus.port().starts, 5);
    assert!(sys.events.pending().contains(Event::TemperatureRead.set()));
}

#[test]
fn user_register_write_reaches_the_device() {
    let sys = System::new();
    let mut bus = humidity_bus(SimDevice::si7021(0, 0));

    bus.start(&sys, si7021::user_reg_write(si7021::RESOLUTION_RH8_T12, EventSet::EMPTY))
        .unwrap();
    pump_bus(&sys, &mut bus).unwrap();
    assert_eq!(bus.port().writes, vec![(si7021::CMD_WRITE_USER_REG1, 0x01)]);

    bus.start(&sys, si7021::user_reg_read(EventSet::EMPTY)).unwrap();
    pump_bus(&sys, &mut bus).unwrap();
    assert_eq!(bus.data(), si7021::USER_REG1_RH8_T12);
    assert!(sys.events.is_idle());
}

#[test]
fn multi_byte_write_sends_only_the_low_byte() {
    let sys = System::new();
    let device = SimDevice::new(veml6030::ADDRESS);
    let mut bus = I2cBus::open(BusId::I2c0, device, &BusConfig::for_bus(BusId::I2c0));

    bus.start(
        &sys,
        Transfer::write(veml6030::ADDRESS, veml6030::REG_ALS_CONF, 0xBEEF, 2, EventSet::EMPTY),
    )
    .unwrap();
    pump_bus(&sys, &mut bus).unwrap();

    assert_eq!(bus.port().writes, vec![(veml6030::REG_ALS_CONF, 0xEF)]);
    assert!(!bus.is_busy());
}

// ── Contract violations ───────────────────────────────────────

#[test]
fn second_start_while_busy_is_rejected() {
    let sys = System::new();
    let mut bus = humidity_bus(SimDevice::si7021(0x663C, 0x6640));

    bus.start(&sys, si7021::humidity_read(Event::HumidityRead)).unwrap();
    let err = bus.start(&sys, si7021::temperature_read(Event::TemperatureRead));

    assert_eq!(err, Err(Error::Bus(BusError::Busy(BusId::I2c1))));
    assert_eq!(sys.energy.blocks(EnergyMode::Em2), 1);

    // the first transaction is unaffected
    pump_bus(&sys, &mut bus).unwrap();
    assert_eq!(bus.data(), 0x663C);
    assert_eq!(sys.events.pending(), Event::HumidityRead.set());
}

#[test]
fn absent_device_is_a_protocol_error() {
    let sys = System::new();
    let mut bus = humidity_bus(SimDevice::new(0x41));

    bus.start(&sys, si7021::humidity_read(Event::HumidityRead)).unwrap();
    let err = pump_bus(&sys, &mut bus);

    assert_eq!(
        err,
        Err(Error::Bus(BusError::Protocol {
            bus: BusId::I2c1,
            state: BusState::StartCommand,
            cause: BusCause::Nack,
        }))
    );
}

#[test]
fn interrupt_on_idle_bus_is_a_protocol_error() {
    let sys = System::new();
    let mut bus = humidity_bus(SimDevice::si7021(0, 0));

    let err = bus.on_interrupt(&sys, BusCause::MasterStop.into());
    assert!(matches!(err, Err(Error::Bus(BusError::Protocol { cause: BusCause::MasterStop, .. }))));
    assert!(sys.events.is_idle());
}

// ── Energy modes ──────────────────────────────────────────────

#[test]
fn both_buses_in_flight_hold_two_blocks() {
    let sys = System::new();
    let mut humidity = humidity_bus(SimDevice::si7021(0x663C, 0x6640));
    let light_device = SimDevice::new(veml6030::ADDRESS).with_register(veml6030::CMD_READ_ALS, &[0x03, 0xE8]);
    let mut light = I2cBus::open(BusId::I2c0, light_device, &BusConfig::for_bus(BusId::I2c0));

    humidity.start(&sys, si7021::humidity_read(Event::HumidityRead)).unwrap();
    light.start(&sys, veml6030::als_read(Event::LightRead)).unwrap();
    assert_eq!(sys.energy.blocks(EnergyMode::Em2), 2);

    let mut sleep = RecordingSleep::default();
    assert_eq!(sys.idle(&mut sleep), Some(EnergyMode::Em1));

    pump_bus(&sys, &mut light).unwrap();
    assert_eq!(sys.energy.blocks(EnergyMode::Em2), 1);
    assert_eq!(light.data(), 1000);

    pump_bus(&sys, &mut humidity).unwrap();
    assert_eq!(sys.energy.blocks(EnergyMode::Em2), 0);
    assert_eq!(
        sys.events.pending(),
        Event::HumidityRead.set() | Event::LightRead.set()
    );
}

#[test]
fn nothing_blocked_and_nothing_pending_sleeps_in_em3() {
    let sys = System::new();
    sys.open();
    let mut sleep = RecordingSleep::default();

    assert_eq!(sys.idle(&mut sleep), Some(EnergyMode::Em3));
    assert_eq!(sleep.entered, vec![EnergyMode::Em3]);
}
