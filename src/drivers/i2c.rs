//! Interrupt-paced two-wire bus transaction state machine.
//!
//! One [`I2cBus`] per physical bus.  `start` issues the start condition and
//! address byte and returns; every later phase is driven by one of four
//! interrupt causes until the stop condition completes, at which point the
//! bus releases its energy-mode block and raises the transaction's
//! completion event.
//!
//! ```text
//!            ACK                ACK                 ACK / NACK(retry)
//! StartCommand ──▶ ReadCommand ──▶ WaitRead ──────────────▶ EndSensing
//!      │ ACK                                                  │ RXDATAV × N
//!      ▼                     ACK                              ▼
//! WriteCommand ─────────────────────────▶ EndSensing ──ACK──▶ Stop ──MSTOP──▶ StartCommand
//! ```
//!
//! Every (state, cause) pair outside the table above is a protocol
//! violation and is returned as [`BusError::Protocol`].  The only
//! recoverable condition is a NACK in `WaitRead` (device still measuring),
//! which re-issues the read address without limit.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::SevenBitAddress;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{I2cPort, SensorBus};
use crate::config::BusConfig;
use crate::error::{BusError, Error, Result};
use crate::events::EventSet;
use crate::power::EnergyMode;
use crate::system::System;

/// Sleep depth a bus cannot survive while a transaction is in flight.
pub const BUS_ENERGY_BLOCK: EnergyMode = EnergyMode::Em2;

/// Transfers are assembled into a 32-bit word.
pub const MAX_TRANSFER_LEN: u8 = 4;

/// Direction bit appended to the address byte.
const ADDR_WRITE: u8 = 0;
const ADDR_READ: u8 = 1;

// ═══════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════

/// Physical bus instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusId {
    /// Ambient light sensor bus.
    I2c0,
    /// Humidity/temperature sensor bus.
    I2c1,
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c0 => f.write_str("I2C0"),
            Self::I2c1 => f.write_str("I2C1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Protocol phase of the transaction in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// Start + address (write) sent, waiting for the device to ACK.
    StartCommand,
    /// Register byte sent on a read, waiting for ACK.
    ReadCommand,
    /// Register byte sent on a write, waiting for ACK.
    WriteCommand,
    /// Repeated start + address (read) sent, polling the device.
    WaitRead,
    /// Data phase.
    EndSensing,
    /// Stop condition issued, waiting for it to finish.
    Stop,
}

/// Interrupt cause that drives the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCause {
    Ack,
    Nack,
    RxDataValid,
    MasterStop,
}

impl BusCause {
    /// Order in which latched causes are processed.
    pub const ORDER: [BusCause; 4] = [
        BusCause::Ack,
        BusCause::Nack,
        BusCause::RxDataValid,
        BusCause::MasterStop,
    ];

    const fn bit(self) -> u8 {
        match self {
            Self::Ack => 1 << 0,
            Self::Nack => 1 << 1,
            Self::RxDataValid => 1 << 2,
            Self::MasterStop => 1 << 3,
        }
    }
}

impl fmt::Display for BusCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => f.write_str("ACK"),
            Self::Nack => f.write_str("NACK"),
            Self::RxDataValid => f.write_str("RXDATAV"),
            Self::MasterStop => f.write_str("MSTOP"),
        }
    }
}

/// Set of latched interrupt causes, as read from the peripheral's flag
/// register by the adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusIrq(u8);

impl BusIrq {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0x0F);

    /// Keep only bits that name a [`BusCause`].
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn contains(self, cause: BusCause) -> bool {
        self.0 & cause.bit() != 0
    }

    pub const fn with(self, cause: BusCause) -> Self {
        Self(self.0 | cause.bit())
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Latched causes in processing order.
    pub fn iter(self) -> impl Iterator<Item = BusCause> {
        BusCause::ORDER.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<BusCause> for BusIrq {
    fn from(cause: BusCause) -> Self {
        Self(cause.bit())
    }
}

/// One addressed read or write exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub address: SevenBitAddress,
    pub register: u8,
    pub direction: Direction,
    /// Payload for writes (low byte is sent); ignored for reads.
    pub data: u32,
    /// Bytes in the data phase, 1..=4.
    pub length: u8,
    /// Raised on the scheduler when the stop phase completes.
    pub event: EventSet,
}

impl Transfer {
    pub fn read(address: SevenBitAddress, register: u8, length: u8, event: impl Into<EventSet>) -> Self {
        Self {
            address,
            register,
            direction: Direction::Read,
            data: 0,
            length,
            event: event.into(),
        }
    }

    pub fn write(
        address: SevenBitAddress,
        register: u8,
        data: u32,
        length: u8,
        event: impl Into<EventSet>,
    ) -> Self {
        Self {
            address,
            register,
            direction: Direction::Write,
            data,
            length,
            event: event.into(),
        }
    }
}

/// Per-bus counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub completed: u32,
    pub nack_retries: u32,
}

// ═══════════════════════════════════════════════════════════════
//  Driver
// ═══════════════════════════════════════════════════════════════

/// Transaction record and state machine of one physical bus.
pub struct I2cBus<P> {
    id: BusId,
    port: P,
    state: BusState,
    busy: bool,
    address: SevenBitAddress,
    register: u8,
    direction: Direction,
    data: u32,
    remaining: u8,
    event: EventSet,
    stats: BusStats,
}

impl<P: I2cPort> I2cBus<P> {
    /// Configure the peripheral behind `port` and return an idle bus.
    ///
    /// Pin and clock bring-up must already be done.
    pub fn open(id: BusId, mut port: P, config: &BusConfig) -> Self {
        port.open(config);
        info!(
            "{}: open ({} Hz, {:?})",
            id, config.frequency_hz, config.clock_ratio
        );
        Self {
            id,
            port,
            state: BusState::StartCommand,
            busy: false,
            address: 0,
            register: 0,
            direction: Direction::Read,
            data: 0,
            remaining: 0,
            event: EventSet::EMPTY,
            stats: BusStats::default(),
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn state(&self) -> BusState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Assembled read value, or the payload of the last write.
    pub fn data(&self) -> u32 {
        self.data
    }

    /// Bytes still to arrive in the data phase.
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    pub fn stats(&self) -> BusStats {
        self.stats
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Begin `transfer` and return immediately.
    ///
    /// Blocks [`BUS_ENERGY_BLOCK`], marks the bus busy, issues the start
    /// condition and the address byte (write direction).  Starting a busy
    /// bus is a contract violation.
    pub fn start(&mut self, system: &System, transfer: Transfer) -> Result<()> {
        if self.busy {
            warn!("{}: start while busy (state {:?})", self.id, self.state);
            return Err(BusError::Busy(self.id).into());
        }
        if transfer.length == 0 || transfer.length > MAX_TRANSFER_LEN {
            return Err(BusError::InvalidLength(transfer.length).into());
        }
        system.energy.block(BUS_ENERGY_BLOCK)?;

        self.address = transfer.address;
        self.register = transfer.register;
        self.direction = transfer.direction;
        self.data = match transfer.direction {
            Direction::Read => 0,
            Direction::Write => transfer.data,
        };
        self.remaining = transfer.length;
        self.event = transfer.event;
        self.state = BusState::StartCommand;
        self.busy = true;

        debug!(
            "{}: start {:?} addr={:#04x} reg={:#04x} len={}",
            self.id, self.direction, self.address, self.register, self.remaining
        );
        self.port.send_start();
        self.port.write_tx(self.address_byte(ADDR_WRITE));
        Ok(())
    }

    /// Interrupt entry: process every latched cause in
    /// [`BusCause::ORDER`].  Stops at the first violation.
    pub fn on_interrupt(&mut self, system: &System, irq: BusIrq) -> Result<()> {
        for cause in irq.iter() {
            self.step(system, cause)?;
        }
        Ok(())
    }

    /// Advance the state machine by one interrupt cause.
    pub fn step(&mut self, system: &System, cause: BusCause) -> Result<()> {
        trace!("{}: {} in {:?}", self.id, cause, self.state);
        if !self.busy {
            return Err(self.violation(cause));
        }

        match (self.state, cause) {
            (BusState::StartCommand, BusCause::Ack) => {
                self.port.write_tx(self.register);
                self.state = match self.direction {
                    Direction::Read => BusState::ReadCommand,
                    Direction::Write => BusState::WriteCommand,
                };
            }

            (BusState::ReadCommand, BusCause::Ack) => {
                self.state = BusState::WaitRead;
                self.send_read_address();
            }

            (BusState::WriteCommand, BusCause::Ack) => {
                self.port.write_tx(self.data as u8);
                self.state = BusState::EndSensing;
            }

            (BusState::WaitRead, BusCause::Ack) => {
                self.state = BusState::EndSensing;
            }

            (BusState::WaitRead, BusCause::Nack) => {
                // Device still busy converting; poll again.
                self.stats.nack_retries = self.stats.nack_retries.wrapping_add(1);
                self.send_read_address();
            }

            (BusState::EndSensing, BusCause::Ack) if self.direction == Direction::Write => {
                self.port.stop();
                self.state = BusState::Stop;
            }

            (BusState::EndSensing, BusCause::RxDataValid) if self.direction == Direction::Read => {
                self.receive_byte();
            }

            (BusState::Stop, BusCause::MasterStop) => {
                system.energy.unblock(BUS_ENERGY_BLOCK)?;
                system.events.add(self.event);
                self.state = BusState::StartCommand;
                self.busy = false;
                self.stats.completed = self.stats.completed.wrapping_add(1);
                debug!("{}: complete, data={:#x}", self.id, self.data);
            }

            _ => return Err(self.violation(cause)),
        }
        Ok(())
    }

    // ── Internal ──────────────────────────────────────────────

    fn address_byte(&self, rw: u8) -> u8 {
        (self.address << 1) | rw
    }

    fn send_read_address(&mut self) {
        self.port.send_start();
        self.port.write_tx(self.address_byte(ADDR_READ));
    }

    /// Bytes arrive most-significant first; each lands at
    /// `8 × remaining-after-this-byte`.
    fn receive_byte(&mut self) {
        self.remaining -= 1;
        let byte = self.port.read_rx();
        self.data |= u32::from(byte) << (8 * u32::from(self.remaining));
        if self.remaining > 0 {
            self.port.ack();
        } else {
            self.port.nack();
            self.port.stop();
            self.state = BusState::Stop;
        }
    }

    fn violation(&self, cause: BusCause) -> Error {
        BusError::Protocol {
            bus: self.id,
            state: self.state,
            cause,
        }
        .into()
    }
}

impl<P: I2cPort> SensorBus for I2cBus<P> {
    fn id(&self) -> BusId {
        self.id
    }

    fn start(&mut self, system: &System, transfer: Transfer) -> Result<()> {
        I2cBus::start(self, system, transfer)
    }

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn data(&self) -> u32 {
        self.data
    }

    fn stats(&self) -> BusStats {
        self.stats
    }
}

/// Poll `bus` until its transaction completes, for callers that need a
/// result synchronously (boot-time self-test, sensor start-up).
///
/// Checks every `step_us` microseconds and gives up with
/// [`Error::Timeout`] after `timeout_us`.
pub fn wait_idle<B: SensorBus + ?Sized>(
    bus: &B,
    delay: &mut impl DelayNs,
    timeout_us: u32,
    step_us: u32,
) -> Result<()> {
    let step_us = step_us.max(1);
    let mut waited = 0u32;
    while bus.is_busy() {
        if waited >= timeout_us {
            warn!("{}: still busy after {} us", bus.id(), waited);
            return Err(Error::Timeout);
        }
        delay.delay_us(step_us);
        waited = waited.saturating_add(step_us);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
