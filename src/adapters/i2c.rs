//! I2C0 / I2C1 register adapter.

use crate::app::ports::I2cPort;
use crate::config::{BusConfig, ClockRatio};
use crate::drivers::i2c::{BusCause, BusId, BusIrq};

use super::board::HFPERCLK_HZ;
use super::mmio::Block;

const I2C0_BASE: usize = 0x4000_C000;
const I2C1_BASE: usize = 0x4000_C400;

// Register offsets
const CTRL: usize = 0x000;
const CMD: usize = 0x004;
const STATE: usize = 0x008;
const CLKDIV: usize = 0x010;
const RXDATA: usize = 0x01C;
const TXDATA: usize = 0x02C;
const IF: usize = 0x034;
const IFC: usize = 0x03C;
const IEN: usize = 0x040;
const ROUTEPEN: usize = 0x044;
const ROUTELOC0: usize = 0x048;

const CTRL_EN: u32 = 1 << 0;
const CTRL_CLHR_SHIFT: u32 = 8;

const CMD_START: u32 = 1 << 0;
const CMD_STOP: u32 = 1 << 1;
const CMD_ACK: u32 = 1 << 2;
const CMD_NACK: u32 = 1 << 3;
const CMD_ABORT: u32 = 1 << 5;
const CMD_CLEARTX: u32 = 1 << 6;

const STATE_BUSY: u32 = 1 << 0;

const IF_RXDATAV: u32 = 1 << 5;
const IF_ACK: u32 = 1 << 6;
const IF_NACK: u32 = 1 << 7;
const IF_MSTOP: u32 = 1 << 8;
const IF_MASK: u32 = 0x0007_FFFF;

const ROUTEPEN_SDA: u32 = 1 << 0;
const ROUTEPEN_SCL: u32 = 1 << 1;

#[derive(Debug, Clone, Copy)]
pub struct I2cMmio {
    regs: Block,
}

impl I2cMmio {
    pub const fn new(bus: BusId) -> Self {
        let base = match bus {
            BusId::I2c0 => I2C0_BASE,
            BusId::I2c1 => I2C1_BASE,
        };
        Self {
            regs: Block::at(base),
        }
    }

    /// Read and clear the enabled, latched interrupt causes.
    pub fn take_flags(&self) -> BusIrq {
        let flags = self.regs.read(IF) & self.regs.read(IEN);
        self.regs.write(IFC, flags);

        let mut irq = BusIrq::NONE;
        for (bit, cause) in [
            (IF_ACK, BusCause::Ack),
            (IF_NACK, BusCause::Nack),
            (IF_RXDATAV, BusCause::RxDataValid),
            (IF_MSTOP, BusCause::MasterStop),
        ] {
            if flags & bit != 0 {
                irq = irq.with(cause);
            }
        }
        irq
    }

    /// Abort anything in flight and clock out a START/STOP pair so every
    /// slave releases SDA.
    fn reset_bus(&self) {
        if self.regs.read(STATE) & STATE_BUSY != 0 {
            self.regs.write(CMD, CMD_ABORT);
        }
        let saved_ien = self.regs.read(IEN);
        self.regs.write(IEN, 0);
        self.regs.write(IFC, IF_MASK);
        self.regs.write(CMD, CMD_CLEARTX);
        self.regs.write(CMD, CMD_START | CMD_STOP);
        while self.regs.read(IF) & IF_MSTOP == 0 {}
        self.regs.write(IFC, IF_MASK);
        self.regs.write(CMD, CMD_CLEARTX);
        self.regs.write(IEN, saved_ien);
    }
}

/// (clock ratio field, low + high periods)
fn clhr(ratio: ClockRatio) -> (u32, u32) {
    match ratio {
        ClockRatio::Standard => (0, 8),
        ClockRatio::Asymmetric => (1, 9),
        ClockRatio::Fast => (2, 17),
    }
}

impl I2cPort for I2cMmio {
    fn open(&mut self, config: &BusConfig) {
        let (field, periods) = clhr(config.clock_ratio);
        let div = (HFPERCLK_HZ / (periods * config.frequency_hz.max(1))).saturating_sub(1);
        self.regs.write(CLKDIV, div);
        self.regs.write(CTRL, CTRL_EN | (field << CTRL_CLHR_SHIFT));

        self.regs.write(
            ROUTELOC0,
            u32::from(config.sda_route) | (u32::from(config.scl_route) << 8),
        );
        self.regs.write(ROUTEPEN, ROUTEPEN_SDA | ROUTEPEN_SCL);

        self.reset_bus();
        self.regs.write(IFC, IF_MASK);
        self.regs.write(IEN, IF_ACK | IF_NACK | IF_RXDATAV | IF_MSTOP);
    }

    fn send_start(&mut self) {
        self.regs.write(CMD, CMD_START);
    }

    fn write_tx(&mut self, byte: u8) {
        self.regs.write(TXDATA, u32::from(byte));
    }

    fn read_rx(&mut self) -> u8 {
        self.regs.read(RXDATA) as u8
    }

    fn ack(&mut self) {
        self.regs.write(CMD, CMD_ACK);
    }

    fn nack(&mut self) {
        self.regs.write(CMD, CMD_NACK);
    }

    fn stop(&mut self) {
        self.regs.write(CMD, CMD_STOP);
    }
}
