//! Root context shared by interrupt handlers and the run loop.
//!
//! Holds the two process-wide pieces of state, the pending event set and
//! the energy-mode registry.  Both use interior mutability behind critical
//! sections, so a single `&System` (typically a `static`) is handed to every
//! driver and handler.

use log::info;

use crate::app::ports::SleepPort;
use crate::power::{EnergyMode, EnergyModes};
use crate::scheduler::EventScheduler;

pub struct System {
    pub events: EventScheduler,
    pub energy: EnergyModes,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    pub const fn new() -> Self {
        Self {
            events: EventScheduler::new(),
            energy: EnergyModes::new(),
        }
    }

    /// Reset both the pending set and the block counters.
    pub fn open(&self) {
        self.events.open();
        self.energy.open();
        info!("system: scheduler and energy modes open");
    }

    /// Sleep if nothing is pending.  See
    /// [`EnergyModes::enter_idle`].
    pub fn idle(&self, port: &mut impl SleepPort) -> Option<EnergyMode> {
        self.energy.enter_idle(&self.events, port)
    }
}
