//! LEUART0 register adapter.

use crate::app::ports::UartPort;
use crate::config::{Parity, SerialConfig};
use crate::drivers::leuart::{TxCause, TxIrq};
use crate::pins;

use super::board::LFBCLK_HZ;
use super::mmio::Block;

const LEUART0_BASE: usize = 0x4004_A000;

const CTRL: usize = 0x000;
const CMD: usize = 0x004;
const CLKDIV: usize = 0x00C;
const TXDATA: usize = 0x028;
const IF: usize = 0x02C;
const IFC: usize = 0x034;
const IEN: usize = 0x038;
const SYNCBUSY: usize = 0x044;
const ROUTEPEN: usize = 0x054;
const ROUTELOC0: usize = 0x058;

const CMD_RXEN: u32 = 1 << 0;
const CMD_TXEN: u32 = 1 << 2;
const CMD_CLEARTX: u32 = 1 << 6;
const CMD_CLEARRX: u32 = 1 << 7;

const CTRL_DATABITS_9: u32 = 1 << 1;
const CTRL_PARITY_SHIFT: u32 = 2;
const CTRL_STOPBITS_2: u32 = 1 << 4;

const IF_TXC: u32 = 1 << 0;
const IF_TXBL: u32 = 1 << 1;
const IF_MASK: u32 = 0x7FF;

const ROUTEPEN_RX: u32 = 1 << 0;
const ROUTEPEN_TX: u32 = 1 << 1;

#[derive(Debug, Clone, Copy)]
pub struct LeuartMmio {
    regs: Block,
}

impl LeuartMmio {
    pub const LEUART0: Self = Self {
        regs: Block::at(LEUART0_BASE),
    };

    /// Read and clear the enabled, latched interrupt causes.
    pub fn take_flags(&self) -> TxIrq {
        let flags = self.regs.read(IF) & self.regs.read(IEN);
        self.regs.write(IFC, flags);

        let mut irq = TxIrq::NONE;
        if flags & IF_TXBL != 0 {
            irq = irq.with(TxCause::TxBufferLevel);
        }
        if flags & IF_TXC != 0 {
            irq = irq.with(TxCause::TxComplete);
        }
        irq
    }

    fn sync(&self) {
        self.regs.wait_clear(SYNCBUSY, u32::MAX);
    }
}

impl UartPort for LeuartMmio {
    fn open(&mut self, config: &SerialConfig) {
        let parity = match config.parity {
            Parity::None => 0,
            Parity::Even => 2,
            Parity::Odd => 3,
        };
        let mut ctrl = parity << CTRL_PARITY_SHIFT;
        if config.data_bits == 9 {
            ctrl |= CTRL_DATABITS_9;
        }
        if config.stop_bits == 2 {
            ctrl |= CTRL_STOPBITS_2;
        }
        self.sync();
        self.regs.write(CTRL, ctrl);
        self.regs
            .write(CLKDIV, 256 * (LFBCLK_HZ / config.baud_rate.max(1)).saturating_sub(1));

        self.regs.write(
            ROUTELOC0,
            u32::from(pins::LEUART0_RX_ROUTE) | (u32::from(pins::LEUART0_TX_ROUTE) << 8),
        );
        self.regs.write(ROUTEPEN, ROUTEPEN_RX | ROUTEPEN_TX);

        self.sync();
        self.regs.write(CMD, CMD_CLEARTX | CMD_CLEARRX);
        self.sync();
        self.regs.write(CMD, CMD_RXEN | CMD_TXEN);
        self.sync();

        self.regs.write(IFC, IF_MASK);
        self.regs.write(IEN, 0);
    }

    fn write_byte(&mut self, byte: u8) {
        self.regs.write(TXDATA, u32::from(byte));
    }

    fn set_tx_buffer_irq(&mut self, enabled: bool) {
        if enabled {
            self.regs.set_bits(IEN, IF_TXBL);
        } else {
            self.regs.clear_bits(IEN, IF_TXBL);
        }
    }

    fn set_tx_complete_irq(&mut self, enabled: bool) {
        if enabled {
            self.regs.write(IFC, IF_TXC);
            self.regs.set_bits(IEN, IF_TXC);
        } else {
            self.regs.clear_bits(IEN, IF_TXC);
        }
    }
}
