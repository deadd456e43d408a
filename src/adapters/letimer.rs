//! LETIMER0 register adapter (PWM mode, COMP0 as top).

use crate::app::ports::TimerPort;
use crate::config::TimerCounts;
use crate::drivers::letimer::TimerIrq;
use crate::pins;

use super::mmio::Block;

const LETIMER0_BASE: usize = 0x4004_6000;

const CTRL: usize = 0x000;
const CMD: usize = 0x004;
const STATUS: usize = 0x008;
const COMP0: usize = 0x010;
const COMP1: usize = 0x014;
const REP0: usize = 0x018;
const REP1: usize = 0x01C;
const IF: usize = 0x020;
const IFC: usize = 0x028;
const IEN: usize = 0x02C;
const SYNCBUSY: usize = 0x034;
const ROUTELOC0: usize = 0x044;

const CTRL_UFOA0_PWM: u32 = 2 << 2;
const CTRL_UFOA1_PWM: u32 = 2 << 4;
const CTRL_COMP0TOP: u32 = 1 << 9;

const CMD_START: u32 = 1 << 0;
const CMD_STOP: u32 = 1 << 1;
const CMD_CLEAR: u32 = 1 << 2;

const STATUS_RUNNING: u32 = 1 << 0;

const IF_MASK: u32 = 0x1F;

#[derive(Debug, Clone, Copy)]
pub struct LetimerMmio {
    regs: Block,
}

impl LetimerMmio {
    pub const LETIMER0: Self = Self {
        regs: Block::at(LETIMER0_BASE),
    };

    /// Read and clear the enabled, latched interrupt causes.
    pub fn take_flags(&self) -> TimerIrq {
        let flags = self.regs.read(IF) & self.regs.read(IEN);
        self.regs.write(IFC, flags);
        TimerIrq::from_bits_truncate(flags)
    }

    fn sync(&self) {
        self.regs.wait_clear(SYNCBUSY, u32::MAX);
    }
}

impl TimerPort for LetimerMmio {
    fn configure(&mut self, counts: &TimerCounts, irq: TimerIrq) {
        self.sync();
        self.regs.write(CMD, CMD_STOP | CMD_CLEAR);
        self.sync();
        self.regs
            .write(CTRL, CTRL_UFOA0_PWM | CTRL_UFOA1_PWM | CTRL_COMP0TOP);
        self.regs.write(COMP0, counts.comp0);
        self.regs.write(COMP1, counts.comp1);
        // PWM mode needs non-zero repeat counters to drive the outputs
        self.regs.write(REP0, 1);
        self.regs.write(REP1, 1);
        self.regs.write(
            ROUTELOC0,
            u32::from(pins::LETIMER0_OUT0_ROUTE) | (u32::from(pins::LETIMER0_OUT1_ROUTE) << 8),
        );
        self.sync();

        self.regs.write(IFC, IF_MASK);
        self.regs.write(IEN, irq.bits());
    }

    fn set_running(&mut self, running: bool) {
        self.sync();
        self.regs.write(CMD, if running { CMD_START } else { CMD_STOP });
        self.sync();
    }

    fn is_running(&self) -> bool {
        self.regs.read(STATUS) & STATUS_RUNNING != 0
    }
}
