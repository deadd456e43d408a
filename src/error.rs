//! Unified error types for the sensing node firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! dispatch loop's fault handling uniform.  All variants are `Copy` so they
//! travel through interrupt entry points and the fault supervisor without
//! allocation.
//!
//! Nothing here is recoverable at the call site: the
//! [`FaultSupervisor`](crate::safety::FaultSupervisor) decides whether an
//! error halts the processor or is handed back to the caller.

use core::fmt;

use crate::drivers::i2c::{BusCause, BusId, BusState};
use crate::drivers::leuart::{TxCause, TxState};
use crate::events::Event;
use crate::power::EnergyMode;
use crate::selftest::SelfTestStep;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A two-wire bus transaction was misused or broke protocol.
    Bus(BusError),
    /// Energy-mode block accounting went wrong.
    Energy(EnergyError),
    /// The serial link transmitter was misused or broke protocol.
    Serial(SerialError),
    /// The dispatch loop saw an event that is never enabled.
    UnexpectedEvent(Event),
    /// A boot-time self-test step read an implausible value.
    SelfTest(SelfTestStep),
    /// A bounded poll expired before its condition held.
    Timeout,
    /// A driver was used before it was opened.
    NotOpen,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Energy(e) => write!(f, "energy: {e}"),
            Self::Serial(e) => write!(f, "serial: {e}"),
            Self::UnexpectedEvent(e) => write!(f, "unexpected event: {e}"),
            Self::SelfTest(step) => write!(f, "self-test failed: {step}"),
            Self::Timeout => write!(f, "timed out"),
            Self::NotOpen => write!(f, "driver not open"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// An interrupt cause arrived in a state where it cannot happen.
    Protocol {
        bus: BusId,
        state: BusState,
        cause: BusCause,
    },
    /// `start` was called while a transaction was still in flight.
    Busy(BusId),
    /// Transfer length outside 1..=4 bytes.
    InvalidLength(u8),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol { bus, state, cause } => {
                write!(f, "{bus}: {cause} in state {state:?}")
            }
            Self::Busy(bus) => write!(f, "{bus} busy"),
            Self::InvalidLength(n) => write!(f, "invalid transfer length {n}"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Energy-mode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyError {
    /// More unblocks than blocks on a level.
    Underflow(EnergyMode),
    /// Too many outstanding blocks on a level.
    Overflow(EnergyMode),
}

impl fmt::Display for EnergyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Underflow(m) => write!(f, "{m} unblocked more often than blocked"),
            Self::Overflow(m) => write!(f, "{m} block limit exceeded"),
        }
    }
}

impl From<EnergyError> for Error {
    fn from(e: EnergyError) -> Self {
        Self::Energy(e)
    }
}

// ---------------------------------------------------------------------------
// Serial link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// A transmit interrupt arrived in a state where it cannot happen.
    Protocol { state: TxState, cause: TxCause },
    /// `start` was called while a message was still being sent.
    Busy,
    /// Message longer than the transmit buffer.
    TooLong(usize),
    /// Outgoing queue is full; the message was dropped.
    QueueFull,
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol { state, cause } => write!(f, "{cause:?} in state {state:?}"),
            Self::Busy => write!(f, "transmitter busy"),
            Self::TooLong(n) => write!(f, "message of {n} bytes too long"),
            Self::QueueFull => write!(f, "outgoing queue full"),
        }
    }
}

impl From<SerialError> for Error {
    fn from(e: SerialError) -> Self {
        Self::Serial(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
