//! Busy-wait delay on the core clock, for start-up waits and bounded
//! polling.

use cortex_m::asm;
use embedded_hal::delay::DelayNs;

pub struct CycleDelay {
    cpu_hz: u32,
}

impl CycleDelay {
    pub const fn new(cpu_hz: u32) -> Self {
        Self { cpu_hz }
    }
}

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = u64::from(ns) * u64::from(self.cpu_hz) / 1_000_000_000;
        asm::delay(cycles.clamp(1, u64::from(u32::MAX)) as u32);
    }

    fn delay_us(&mut self, us: u32) {
        let cycles = u64::from(us) * u64::from(self.cpu_hz) / 1_000_000;
        asm::delay(cycles.clamp(1, u64::from(u32::MAX)) as u32);
    }
}
