//! Simulated peripherals for integration tests.
//!
//! The simulators sit behind the port traits and answer the real driver
//! state machines the way the silicon would: every command they receive
//! queues the interrupt cause the hardware would latch next.  `pump_*`
//! helpers play those causes back through the drivers' interrupt entry
//! points, standing in for the NVIC.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use embedded_hal::delay::DelayNs;

use sensenode::app::events::AppEvent;
use sensenode::app::ports::{EventSink, I2cPort, SensorBus, SerialLink, SleepPort, TimerPort, UartPort};
use sensenode::config::{BusConfig, SerialConfig, TimerCounts};
use sensenode::drivers::ble::{BleLink, LinkStats};
use sensenode::drivers::i2c::{BusCause, BusId, BusStats, I2cBus, Transfer};
use sensenode::drivers::letimer::TimerIrq;
use sensenode::drivers::leuart::{TxCause, TxIrq};
use sensenode::power::EnergyMode;
use sensenode::sensors::si7021;
use sensenode::{Result, System};

// ── I2C slave device ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Register,
    Data,
    Reading,
}

/// A single I2C slave answering the master's commands.
///
/// Registers hold big-endian response bytes; `nack_polls` read-address
/// NACKs are returned before each read to model a conversion in progress.
pub struct SimDevice {
    pub address: u8,
    pub registers: HashMap<u8, Vec<u8>>,
    pub nack_polls: u32,
    /// `(register, byte)` for every data byte written.
    pub writes: Vec<(u8, u8)>,
    /// Number of start conditions seen.
    pub starts: u32,
    pending: VecDeque<BusCause>,
    after_start: bool,
    phase: Phase,
    register: u8,
    cursor: usize,
    nacks_left: u32,
}

impl SimDevice {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: HashMap::new(),
            nack_polls: 0,
            writes: Vec::new(),
            starts: 0,
            pending: VecDeque::new(),
            after_start: false,
            phase: Phase::Idle,
            register: 0,
            cursor: 0,
            nacks_left: 0,
        }
    }

    pub fn with_register(mut self, register: u8, bytes: &[u8]) -> Self {
        self.registers.insert(register, bytes.to_vec());
        self
    }

    /// SI7021 at 0x40 reading the given raw codes.
    pub fn si7021(humidity: u16, temperature: u16) -> Self {
        Self::new(si7021::ADDRESS)
            .with_register(si7021::CMD_READ_USER_REG1, &[si7021::USER_REG1_RESET as u8])
            .with_register(si7021::CMD_MEASURE_HUMIDITY, &humidity.to_be_bytes())
            .with_register(si7021::CMD_MEASURE_TEMPERATURE, &temperature.to_be_bytes())
    }

    pub fn next_cause(&mut self) -> Option<BusCause> {
        self.pending.pop_front()
    }

    fn apply_write(&mut self, register: u8, byte: u8) {
        self.writes.push((register, byte));
        // user register 1: only the resolution bits are writable
        if register == si7021::CMD_WRITE_USER_REG1 {
            let current = self
                .registers
                .get(&si7021::CMD_READ_USER_REG1)
                .and_then(|r| r.first().copied())
                .unwrap_or(si7021::USER_REG1_RESET as u8);
            let value = (current & !0x81) | (byte & 0x81);
            self.registers.insert(si7021::CMD_READ_USER_REG1, vec![value]);
        }
    }
}

impl I2cPort for SimDevice {
    fn open(&mut self, _config: &BusConfig) {
        self.pending.clear();
        self.phase = Phase::Idle;
    }

    fn send_start(&mut self) {
        self.starts += 1;
        self.after_start = true;
    }

    fn write_tx(&mut self, byte: u8) {
        if self.after_start {
            self.after_start = false;
            if byte >> 1 != self.address {
                self.pending.push_back(BusCause::Nack);
                return;
            }
            if byte & 1 == 1 {
                if self.nacks_left > 0 {
                    self.nacks_left -= 1;
                    self.pending.push_back(BusCause::Nack);
                } else {
                    self.phase = Phase::Reading;
                    self.cursor = 0;
                    self.pending.push_back(BusCause::Ack);
                    self.pending.push_back(BusCause::RxDataValid);
                }
            } else {
                self.phase = Phase::Register;
                self.pending.push_back(BusCause::Ack);
            }
            return;
        }

        match self.phase {
            Phase::Register => {
                self.register = byte;
                self.nacks_left = self.nack_polls;
                self.phase = Phase::Data;
            }
            Phase::Data => self.apply_write(self.register, byte),
            Phase::Idle | Phase::Reading => {}
        }
        self.pending.push_back(BusCause::Ack);
    }

    fn read_rx(&mut self) -> u8 {
        let byte = self
            .registers
            .get(&self.register)
            .and_then(|r| r.get(self.cursor).copied())
            .unwrap_or(0);
        self.cursor += 1;
        byte
    }

    fn ack(&mut self) {
        self.pending.push_back(BusCause::RxDataValid);
    }

    fn nack(&mut self) {}

    fn stop(&mut self) {
        self.phase = Phase::Idle;
        self.pending.push_back(BusCause::MasterStop);
    }
}

/// Deliver queued causes one interrupt at a time until the device is
/// quiet.
pub fn pump_bus(system: &System, bus: &mut I2cBus<SimDevice>) -> Result<()> {
    while let Some(cause) = bus.port_mut().next_cause() {
        bus.on_interrupt(system, cause.into())?;
    }
    Ok(())
}

/// An [`I2cBus`] whose interrupts are serviced as soon as a transfer is
/// started, as a fast ISR would.  With `hold` set the causes stay queued
/// until [`SimBus::flush`].
pub struct SimBus {
    pub bus: I2cBus<SimDevice>,
    pub hold: bool,
}

impl SimBus {
    pub fn new(id: BusId, device: SimDevice) -> Self {
        Self {
            bus: I2cBus::open(id, device, &BusConfig::for_bus(id)),
            hold: false,
        }
    }

    pub fn device(&self) -> &SimDevice {
        self.bus.port()
    }

    pub fn device_mut(&mut self) -> &mut SimDevice {
        self.bus.port_mut()
    }

    pub fn flush(&mut self, system: &System) -> Result<()> {
        pump_bus(system, &mut self.bus)
    }
}

impl SensorBus for SimBus {
    fn id(&self) -> BusId {
        self.bus.id()
    }

    fn start(&mut self, system: &System, transfer: Transfer) -> Result<()> {
        self.bus.start(system, transfer)?;
        if self.hold {
            Ok(())
        } else {
            self.flush(system)
        }
    }

    fn is_busy(&self) -> bool {
        self.bus.is_busy()
    }

    fn data(&self) -> u32 {
        self.bus.data()
    }

    fn stats(&self) -> BusStats {
        self.bus.stats()
    }
}

// ── LEUART / BLE module ───────────────────────────────────────

/// LEUART transmitter wired to a BLE module that accepts every byte.
#[derive(Default)]
pub struct SimUart {
    pub wire: Vec<u8>,
    pub txbl: bool,
    pub txc: bool,
    pub opened: Option<SerialConfig>,
}

impl SimUart {
    /// The cause the peripheral would latch next, if its interrupt is on.
    pub fn next_cause(&self) -> Option<TxCause> {
        if self.txbl {
            Some(TxCause::TxBufferLevel)
        } else if self.txc {
            Some(TxCause::TxComplete)
        } else {
            None
        }
    }

    pub fn wire_text(&self) -> String {
        String::from_utf8_lossy(&self.wire).into_owned()
    }
}

impl UartPort for SimUart {
    fn open(&mut self, config: &SerialConfig) {
        self.opened = Some(config.clone());
    }

    fn write_byte(&mut self, byte: u8) {
        self.wire.push(byte);
    }

    fn set_tx_buffer_irq(&mut self, enabled: bool) {
        self.txbl = enabled;
    }

    fn set_tx_complete_irq(&mut self, enabled: bool) {
        self.txc = enabled;
    }
}

pub fn pump_link(system: &System, link: &mut BleLink<SimUart>) -> Result<()> {
    while let Some(cause) = link.tx().port().next_cause() {
        link.on_interrupt(system, TxIrq::from(cause))?;
    }
    Ok(())
}

/// A [`BleLink`] drained as soon as a message starts, unless `hold`.
pub struct SimLink {
    pub link: BleLink<SimUart>,
    pub hold: bool,
}

impl SimLink {
    pub fn new() -> Self {
        Self {
            link: BleLink::open(SimUart::default(), &SerialConfig::default()),
            hold: false,
        }
    }

    pub fn wire_text(&self) -> String {
        self.link.tx().port().wire_text()
    }

    pub fn flush(&mut self, system: &System) -> Result<()> {
        pump_link(system, &mut self.link)
    }
}

impl SerialLink for SimLink {
    fn send(&mut self, system: &System, message: &str) -> Result<()> {
        self.link.send(system, message)?;
        if self.hold { Ok(()) } else { self.flush(system) }
    }

    fn on_tx_done(&mut self, system: &System) -> Result<()> {
        self.link.on_tx_done(system)?;
        if self.hold { Ok(()) } else { self.flush(system) }
    }

    fn stats(&self) -> LinkStats {
        self.link.stats()
    }
}

// ── LETIMER ───────────────────────────────────────────────────

#[derive(Default)]
pub struct SimTimer {
    pub counts: Option<TimerCounts>,
    pub irq: TimerIrq,
    pub running: bool,
}

impl TimerPort for SimTimer {
    fn configure(&mut self, counts: &TimerCounts, irq: TimerIrq) {
        self.counts = Some(*counts);
        self.irq = irq;
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

// ── Delay / sleep / sink ──────────────────────────────────────

/// Records how long the code under test asked to wait.
#[derive(Default)]
pub struct SimDelay {
    pub total_ns: u64,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

#[derive(Default)]
pub struct RecordingSleep {
    pub entered: Vec<EnergyMode>,
}

impl SleepPort for RecordingSleep {
    fn sleep(&mut self, mode: EnergyMode) {
        self.entered.push(mode);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn faults(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Fault(_)))
            .count()
    }

    pub fn readings(&self) -> Vec<sensenode::sensors::Reading> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Reading(r) => Some(*r),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
