//! Sleep instruction adapter.
//!
//! | Mode | Sequence                                   |
//! |------|--------------------------------------------|
//! | EM1  | `WFI`                                      |
//! | EM2  | `SLEEPDEEP`, `WFI`                         |
//! | EM3  | LF oscillators off, `SLEEPDEEP`, `WFI`     |
//!
//! Called inside the arbiter's critical section: a pending interrupt still
//! ends `WFI` and is serviced once the section exits.

use cortex_m::asm;
use cortex_m::peripheral::SCB;

use crate::app::ports::SleepPort;
use crate::power::EnergyMode;

use super::board;

pub struct CortexSleep {
    scb: SCB,
}

impl CortexSleep {
    pub fn new(scb: SCB) -> Self {
        Self { scb }
    }
}

impl SleepPort for CortexSleep {
    fn sleep(&mut self, mode: EnergyMode) {
        match mode {
            EnergyMode::Em0 => {}
            EnergyMode::Em1 => {
                self.scb.clear_sleepdeep();
                asm::wfi();
            }
            EnergyMode::Em2 | EnergyMode::Em3 | EnergyMode::Em4 => {
                let stop = mode >= EnergyMode::Em3;
                if stop {
                    board::lf_oscillators(false);
                }
                self.scb.set_sleepdeep();
                asm::dsb();
                asm::wfi();
                self.scb.clear_sleepdeep();
                if stop {
                    board::lf_oscillators(true);
                }
            }
        }
    }
}
