//! Low-energy periodic timer.
//!
//! Runs in free-running PWM mode off the 1 kHz ULFRCO: COMP0 is the period,
//! COMP1 the active time.  Only the underflow interrupt is normally
//! enabled; it paces the sensor readings.  A running timer holds a block on
//! EM4 (the ULFRCO domain does not survive shutoff).

use log::{debug, info, trace};

use crate::app::ports::{PeriodicTimer, TimerPort};
use crate::config::{TimerConfig, TimerCounts};
use crate::error::Result;
use crate::events::Event;
use crate::power::EnergyMode;
use crate::system::System;

pub const TIMER_ENERGY_BLOCK: EnergyMode = EnergyMode::Em4;

/// Timer interrupt causes, bit-compatible with the LETIMER IF register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerIrq(u32);

impl TimerIrq {
    pub const NONE: Self = Self(0);
    pub const COMP0: Self = Self(1 << 0);
    pub const COMP1: Self = Self(1 << 1);
    pub const UF: Self = Self(1 << 2);

    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0x7)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Scheduler event raised per interrupt cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvents {
    pub comp0: Event,
    pub comp1: Event,
    pub underflow: Event,
}

impl Default for TimerEvents {
    fn default() -> Self {
        Self {
            comp0: Event::LetimerComp0,
            comp1: Event::LetimerComp1,
            underflow: Event::LetimerUnderflow,
        }
    }
}

pub struct Letimer<P> {
    port: P,
    counts: TimerCounts,
    events: TimerEvents,
    running: bool,
}

impl<P: TimerPort> Letimer<P> {
    /// Load the compare values and interrupt enables.  The timer is left
    /// stopped.
    pub fn open(mut port: P, config: &TimerConfig, events: TimerEvents) -> Self {
        let counts = config.counts();
        port.set_running(false);
        port.configure(&counts, config.irq_enable());
        info!(
            "letimer: period {} ticks, active {} ticks",
            counts.comp0, counts.comp1
        );
        Self {
            port,
            counts,
            events,
            running: false,
        }
    }

    pub fn counts(&self) -> TimerCounts {
        self.counts
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Start or stop the counter.  Repeating the current state is a no-op
    /// and leaves the EM4 block count untouched.
    pub fn start(&mut self, system: &System, enable: bool) -> Result<()> {
        match (enable, self.running) {
            (true, false) => {
                system.energy.block(TIMER_ENERGY_BLOCK)?;
                self.port.set_running(true);
                self.running = true;
                debug!("letimer: started");
            }
            (false, true) => {
                self.port.set_running(false);
                system.energy.unblock(TIMER_ENERGY_BLOCK)?;
                self.running = false;
                debug!("letimer: stopped");
            }
            _ => {}
        }
        Ok(())
    }

    /// Interrupt entry: raise the event of every latched cause.
    pub fn on_interrupt(&self, system: &System, irq: TimerIrq) {
        trace!("letimer: irq {:#x}", irq.bits());
        for (flag, event) in [
            (TimerIrq::COMP0, self.events.comp0),
            (TimerIrq::COMP1, self.events.comp1),
            (TimerIrq::UF, self.events.underflow),
        ] {
            if irq.contains(flag) {
                system.events.add(event);
            }
        }
    }
}

impl<P: TimerPort> PeriodicTimer for Letimer<P> {
    fn start(&mut self, system: &System, enable: bool) -> Result<()> {
        Letimer::start(self, system, enable)
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
