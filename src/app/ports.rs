//! Port traits — the boundary between driver logic and the silicon.
//!
//! ```text
//!   MMIO adapter ──▶ Port trait ──▶ state machine / arbiter / node
//! ```
//!
//! The interrupt-paced state machines never touch registers directly.  The
//! target adapters under `adapters/` implement these traits with volatile
//! register access; host tests implement them with recording mocks.

use crate::config::{BusConfig, SerialConfig, TimerCounts};
use crate::drivers::ble::LinkStats;
use crate::drivers::i2c::{BusId, BusStats, Transfer};
use crate::drivers::letimer::TimerIrq;
use crate::error::Result;
use crate::power::EnergyMode;
use crate::system::System;

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Two-wire bus peripheral
// ───────────────────────────────────────────────────────────────

/// Command/data interface of one two-wire bus peripheral in master mode.
pub trait I2cPort {
    /// Configure clock and routing, reset the bus, enable the ACK, NACK,
    /// RXDATAV and MSTOP interrupt causes.
    fn open(&mut self, config: &BusConfig);

    /// Issue a (repeated) start condition.
    fn send_start(&mut self);

    /// Load the transmit data register.
    fn write_tx(&mut self, byte: u8);

    /// Read the receive data register.
    fn read_rx(&mut self) -> u8;

    /// Acknowledge the received byte, asking for more.
    fn ack(&mut self);

    /// Not-acknowledge the received byte, signalling no more data.
    fn nack(&mut self);

    /// Issue a stop condition.
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Serial link transmitter
// ───────────────────────────────────────────────────────────────

/// Transmit side of a low-energy UART.
pub trait UartPort {
    /// Configure baud rate, framing and routing; enable TX and RX.
    fn open(&mut self, config: &SerialConfig);

    /// Write one byte into the transmit buffer.
    fn write_byte(&mut self, byte: u8);

    /// Enable or disable the "transmit buffer level" interrupt.
    fn set_tx_buffer_irq(&mut self, enabled: bool);

    /// Enable or disable the "transmit complete" interrupt.
    fn set_tx_complete_irq(&mut self, enabled: bool);
}

// ───────────────────────────────────────────────────────────────
// Low-energy periodic timer
// ───────────────────────────────────────────────────────────────

/// Low-energy timer in free-running PWM mode.
pub trait TimerPort {
    /// Load compare values and enable the requested interrupt causes.
    fn configure(&mut self, counts: &TimerCounts, irq: TimerIrq);

    /// Start or stop counting.
    fn set_running(&mut self, running: bool);

    /// Whether the counter is running.
    fn is_running(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Sleep instruction
// ───────────────────────────────────────────────────────────────

/// Executes the sleep instruction for a given energy mode.
///
/// Called inside a critical section; the implementation returns once an
/// interrupt (masked or not) wakes the core.
pub trait SleepPort {
    fn sleep(&mut self, mode: EnergyMode);
}

// ───────────────────────────────────────────────────────────────
// Sensor bus access (node → bus driver)
// ───────────────────────────────────────────────────────────────

/// What sensor modules and the dispatch loop need from a bus driver.
///
/// Implemented by [`I2cBus`](crate::drivers::i2c::I2cBus) itself and, on
/// target, by the interrupt-shared wrapper around it.
pub trait SensorBus {
    /// Which physical bus this is.
    fn id(&self) -> BusId;

    /// Begin `transfer`.  Returns immediately; completion is raised as
    /// `transfer.event` on the scheduler.
    fn start(&mut self, system: &System, transfer: Transfer) -> Result<()>;

    /// Whether a transaction is in flight.
    fn is_busy(&self) -> bool;

    /// The data word of the last transaction (the assembled value after a
    /// read).
    fn data(&self) -> u32;

    fn stats(&self) -> BusStats;
}

// ───────────────────────────────────────────────────────────────
// Serial link (node → BLE link)
// ───────────────────────────────────────────────────────────────

/// Outgoing text channel to the BLE module.
pub trait SerialLink {
    /// Send `message`, or queue it if the transmitter is busy.
    fn send(&mut self, system: &System, message: &str) -> Result<()>;

    /// Called from the BLE_TX_DONE handler: start the next queued message.
    fn on_tx_done(&mut self, system: &System) -> Result<()>;

    fn stats(&self) -> LinkStats;
}

// ───────────────────────────────────────────────────────────────
// Periodic timer (node → LETIMER)
// ───────────────────────────────────────────────────────────────

pub trait PeriodicTimer {
    /// Start (`true`) or stop (`false`) the sampling period.
    fn start(&mut self, system: &System, enable: bool) -> Result<()>;

    fn is_running(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink (node → outside world)
// ───────────────────────────────────────────────────────────────

/// Receives structured events from the node (logging, test recording).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
