//! Energy-mode arbiter.
//!
//! Peripherals hold reference-counted blocks on the sleep depth they cannot
//! survive.  When the run loop goes idle the arbiter picks the deepest mode
//! that is still safe for every outstanding block.
//!
//! ```text
//!  block count:   EM0  EM1  EM2  EM3  EM4
//!                  0    0    1    1    1      ← I2C (EM2) + system (EM3) + LETIMER (EM4)
//!                            ▲
//!                 shallowest blocked = EM2  ──▶  sleep in EM1
//! ```
//!
//! | Shallowest blocked | Sleep entered |
//! |--------------------|---------------|
//! | EM0 or EM1         | none (stay running) |
//! | EM2                | EM1 |
//! | EM3                | EM2 |
//! | EM4 / nothing      | EM3 |
//!
//! EM4 is never entered by the arbiter; leaving it takes a reset.

use core::cell::Cell;
use core::fmt;

use critical_section::{CriticalSection, Mutex};
use log::{error, trace};
use serde::{Deserialize, Serialize};

use crate::app::ports::SleepPort;
use crate::error::{EnergyError, Result};
use crate::scheduler::EventScheduler;

/// Maximum outstanding blocks on a single level.
pub const MAX_BLOCKS_PER_MODE: u8 = 4;

/// Processor energy mode.  Lower index = shallower sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EnergyMode {
    /// Fully running.
    Em0 = 0,
    /// Sleep: core clock gated, peripherals running.
    Em1 = 1,
    /// Deep sleep: high-frequency clocks off, LF peripherals running.
    Em2 = 2,
    /// Stop: only ULFRCO-clocked peripherals running.
    Em3 = 3,
    /// Shutoff.
    Em4 = 4,
}

impl EnergyMode {
    pub const COUNT: usize = 5;

    pub const ALL: [EnergyMode; Self::COUNT] = [
        EnergyMode::Em0,
        EnergyMode::Em1,
        EnergyMode::Em2,
        EnergyMode::Em3,
        EnergyMode::Em4,
    ];

    /// Deepest defined level.
    pub const DEEPEST: EnergyMode = EnergyMode::Em4;

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Em0),
            1 => Some(Self::Em1),
            2 => Some(Self::Em2),
            3 => Some(Self::Em3),
            4 => Some(Self::Em4),
            _ => None,
        }
    }

    /// One level shallower, or `None` for EM0.
    pub const fn shallower(self) -> Option<Self> {
        match self {
            Self::Em0 => None,
            Self::Em1 => Some(Self::Em0),
            Self::Em2 => Some(Self::Em1),
            Self::Em3 => Some(Self::Em2),
            Self::Em4 => Some(Self::Em3),
        }
    }
}

impl fmt::Display for EnergyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EM{}", self.index())
    }
}

/// Per-level block counters plus sleep-entry statistics.
pub struct EnergyModes {
    blocks: Mutex<Cell<[u8; EnergyMode::COUNT]>>,
    entries: Mutex<Cell<[u32; EnergyMode::COUNT]>>,
}

impl Default for EnergyModes {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyModes {
    pub const fn new() -> Self {
        Self {
            blocks: Mutex::new(Cell::new([0; EnergyMode::COUNT])),
            entries: Mutex::new(Cell::new([0; EnergyMode::COUNT])),
        }
    }

    /// Zero every counter.
    pub fn open(&self) {
        critical_section::with(|cs| {
            self.blocks.borrow(cs).set([0; EnergyMode::COUNT]);
            self.entries.borrow(cs).set([0; EnergyMode::COUNT]);
        });
    }

    /// Forbid `mode` and anything deeper until the matching
    /// [`unblock`](Self::unblock).
    pub fn block(&self, mode: EnergyMode) -> Result<()> {
        critical_section::with(|cs| self.block_in(cs, mode))
    }

    pub fn block_in(&self, cs: CriticalSection<'_>, mode: EnergyMode) -> Result<()> {
        let cell = self.blocks.borrow(cs);
        let mut blocks = cell.get();
        let slot = &mut blocks[mode.index()];
        if *slot >= MAX_BLOCKS_PER_MODE {
            error!("energy: {} block overflow ({} outstanding)", mode, *slot);
            return Err(EnergyError::Overflow(mode).into());
        }
        *slot += 1;
        cell.set(blocks);
        trace!("energy: block {} -> {}", mode, blocks[mode.index()]);
        Ok(())
    }

    /// Release one block on `mode`.  Releasing a level that holds no block
    /// is a resource-misuse error.
    pub fn unblock(&self, mode: EnergyMode) -> Result<()> {
        critical_section::with(|cs| self.unblock_in(cs, mode))
    }

    pub fn unblock_in(&self, cs: CriticalSection<'_>, mode: EnergyMode) -> Result<()> {
        let cell = self.blocks.borrow(cs);
        let mut blocks = cell.get();
        let slot = &mut blocks[mode.index()];
        if *slot == 0 {
            error!("energy: {} unblocked without a matching block", mode);
            return Err(EnergyError::Underflow(mode).into());
        }
        *slot -= 1;
        cell.set(blocks);
        trace!("energy: unblock {} -> {}", mode, blocks[mode.index()]);
        Ok(())
    }

    /// Outstanding blocks on `mode`.
    pub fn blocks(&self, mode: EnergyMode) -> u8 {
        critical_section::with(|cs| self.blocks.borrow(cs).get()[mode.index()])
    }

    /// The shallowest level holding a block, or [`EnergyMode::DEEPEST`]
    /// when nothing is blocked.
    pub fn deepest_available(&self) -> EnergyMode {
        critical_section::with(|cs| self.deepest_available_in(cs))
    }

    fn deepest_available_in(&self, cs: CriticalSection<'_>) -> EnergyMode {
        let blocks = self.blocks.borrow(cs).get();
        EnergyMode::ALL
            .into_iter()
            .find(|m| blocks[m.index()] != 0)
            .unwrap_or(EnergyMode::DEEPEST)
    }

    /// The mode [`enter_idle`](Self::enter_idle) would sleep in right now,
    /// or `None` if the core must keep running.
    pub fn sleep_target(&self) -> Option<EnergyMode> {
        critical_section::with(|cs| Self::target_for(self.deepest_available_in(cs)))
    }

    fn target_for(deepest: EnergyMode) -> Option<EnergyMode> {
        match deepest {
            EnergyMode::Em0 | EnergyMode::Em1 => None,
            other => other.shallower(),
        }
    }

    /// Sleep as deep as the outstanding blocks allow.
    ///
    /// The pending set is re-checked inside the same critical section as the
    /// sleep instruction: an interrupt that fired after the caller's check
    /// leaves the core awake, and one that fires during the sleep wakes it
    /// (masked interrupts still end `WFI`) and runs once the section exits.
    ///
    /// Returns the mode entered, or `None` if no sleep instruction was
    /// issued.
    pub fn enter_idle(&self, events: &EventScheduler, port: &mut impl SleepPort) -> Option<EnergyMode> {
        critical_section::with(|cs| {
            if !events.pending_in(cs).is_empty() {
                return None;
            }
            let target = Self::target_for(self.deepest_available_in(cs))?;
            let cell = self.entries.borrow(cs);
            let mut entries = cell.get();
            entries[target.index()] = entries[target.index()].wrapping_add(1);
            cell.set(entries);
            port.sleep(target);
            Some(target)
        })
    }

    /// How many times the arbiter has entered `mode` since `open`.
    pub fn sleep_entries(&self, mode: EnergyMode) -> u32 {
        critical_section::with(|cs| self.entries.borrow(cs).get()[mode.index()])
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
