//! Low-energy UART transmit state machine.
//!
//! Same pattern as the bus driver, smaller: `start` copies the message,
//! blocks EM3 and enables the "transmit buffer level" interrupt.  The first
//! TXBL only arms the transfer; each following one moves a character out.
//! After the last one the machine waits for "transmit complete" and raises
//! [`Event::BleTxDone`].
//!
//! ```text
//!                 TXBL                 TXBL × len              TXC
//! EnableTransfer ──────▶ TransferCharacters ─────────▶ EndTransfer ──────▶ EnableTransfer
//!                                     (last char: TXBL off, TXC on)   (unblock, BLE_TX_DONE)
//! ```

use core::fmt;

use heapless::Vec;
use log::{debug, info, trace, warn};

use crate::app::ports::UartPort;
use crate::config::SerialConfig;
use crate::error::{Error, Result, SerialError};
use crate::events::Event;
use crate::power::EnergyMode;
use crate::system::System;

/// Longest message the transmitter buffers.
pub const MAX_MESSAGE_LEN: usize = 80;

/// Sleep depth the LEUART cannot transmit through.
pub const TX_ENERGY_BLOCK: EnergyMode = EnergyMode::Em3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Idle, or started and waiting for the first TXBL.
    EnableTransfer,
    /// Moving characters into the transmit buffer.
    TransferCharacters,
    /// Last character queued; waiting for the shifter to drain.
    EndTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxCause {
    /// Transmit buffer has room.
    TxBufferLevel,
    /// Shift register and buffer are empty.
    TxComplete,
}

impl TxCause {
    const fn bit(self) -> u8 {
        match self {
            Self::TxBufferLevel => 1 << 0,
            Self::TxComplete => 1 << 1,
        }
    }
}

/// Latched transmit interrupt causes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxIrq(u8);

impl TxIrq {
    pub const NONE: Self = Self(0);

    pub const fn contains(self, cause: TxCause) -> bool {
        self.0 & cause.bit() != 0
    }

    pub const fn with(self, cause: TxCause) -> Self {
        Self(self.0 | cause.bit())
    }

    /// TXBL before TXC.
    pub fn iter(self) -> impl Iterator<Item = TxCause> {
        [TxCause::TxBufferLevel, TxCause::TxComplete]
            .into_iter()
            .filter(move |c| self.contains(*c))
    }
}

impl From<TxCause> for TxIrq {
    fn from(cause: TxCause) -> Self {
        Self(cause.bit())
    }
}

/// Transmitter record for one LEUART instance.
pub struct LeuartTx<P> {
    port: P,
    state: TxState,
    busy: bool,
    message: Vec<u8, MAX_MESSAGE_LEN>,
    sent: usize,
    completed: u32,
}

impl<P: UartPort> LeuartTx<P> {
    pub fn open(mut port: P, config: &SerialConfig) -> Self {
        port.open(config);
        info!(
            "leuart: open {} baud {}{}{} ({})",
            config.baud_rate,
            config.data_bits,
            config.parity,
            config.stop_bits,
            config.device_name
        );
        Self {
            port,
            state: TxState::EnableTransfer,
            busy: false,
            message: Vec::new(),
            sent: 0,
            completed: 0,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Messages fully transmitted since `open`.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Begin sending `message`.  Returns immediately.
    pub fn start(&mut self, system: &System, message: &str) -> Result<()> {
        if self.busy {
            warn!("leuart: start while busy");
            return Err(SerialError::Busy.into());
        }
        let bytes = message.as_bytes();
        if bytes.is_empty() {
            return Ok(());
        }
        self.message.clear();
        self.message
            .extend_from_slice(bytes)
            .map_err(|()| Error::Serial(SerialError::TooLong(bytes.len())))?;
        system.energy.block(TX_ENERGY_BLOCK)?;

        self.sent = 0;
        self.state = TxState::EnableTransfer;
        self.busy = true;
        debug!("leuart: start {} bytes", self.message.len());
        self.port.set_tx_buffer_irq(true);
        Ok(())
    }

    pub fn on_interrupt(&mut self, system: &System, irq: TxIrq) -> Result<()> {
        for cause in irq.iter() {
            self.step(system, cause)?;
        }
        Ok(())
    }

    pub fn step(&mut self, system: &System, cause: TxCause) -> Result<()> {
        trace!("leuart: {:?} in {:?}", cause, self.state);
        if !self.busy {
            return Err(self.violation(cause));
        }

        match (self.state, cause) {
            (TxState::EnableTransfer, TxCause::TxBufferLevel) => {
                self.state = TxState::TransferCharacters;
            }
            (TxState::TransferCharacters, TxCause::TxBufferLevel) => {
                self.send_next();
            }
            (TxState::EndTransfer, TxCause::TxComplete) => {
                self.port.set_tx_complete_irq(false);
                system.energy.unblock(TX_ENERGY_BLOCK)?;
                system.events.add(Event::BleTxDone);
                self.state = TxState::EnableTransfer;
                self.busy = false;
                self.completed = self.completed.wrapping_add(1);
            }
            _ => return Err(self.violation(cause)),
        }
        Ok(())
    }

    fn send_next(&mut self) {
        if let Some(&byte) = self.message.get(self.sent) {
            self.port.write_byte(byte);
            self.sent += 1;
        }
        if self.sent >= self.message.len() {
            self.port.set_tx_buffer_irq(false);
            self.port.set_tx_complete_irq(true);
            self.state = TxState::EndTransfer;
        }
    }

    fn violation(&self, cause: TxCause) -> Error {
        SerialError::Protocol {
            state: self.state,
            cause,
        }
        .into()
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
