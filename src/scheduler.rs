//! Event scheduler.
//!
//! A process-wide set of pending [`EventSet`] bits.  Interrupt handlers
//! add bits, the dispatch loop drains them.  Every mutation happens inside
//! a short critical section so a handler and the run loop never observe a
//! half-updated mask.
//!
//! ```text
//!   ISR ──add()──▶ ┌──────────────┐ ──pending()──▶ dispatch loop
//!                  │ Mutex<Cell>  │
//!   handler ◀──────│   u32 mask   │ ◀──remove()─── handler
//!                  └──────────────┘
//! ```
//!
//! The set holds occurrence, not count.  Two occurrences of the same event
//! between one `add` and the next `remove` are observed once, so event
//! identifiers must stand for level-significant conditions.

use core::cell::Cell;

use critical_section::{CriticalSection, Mutex};
use log::trace;

use crate::events::EventSet;

/// Pending-event set shared between interrupt context and the run loop.
pub struct EventScheduler {
    pending: Mutex<Cell<u32>>,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventScheduler {
    /// `const` so the root context can live in a `static`.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(0)),
        }
    }

    /// Reset the pending set to empty.  Called once at boot.
    pub fn open(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(0));
    }

    /// OR `events` into the pending set.  Safe from interrupt context.
    pub fn add(&self, events: impl Into<EventSet>) {
        let events = events.into();
        critical_section::with(|cs| self.add_in(cs, events));
        trace!("scheduler: +{:#b}", events);
    }

    /// Variant of [`add`](Self::add) for callers already inside a
    /// critical section (interrupt entry points).
    pub fn add_in(&self, cs: CriticalSection<'_>, events: EventSet) {
        let cell = self.pending.borrow(cs);
        cell.set(cell.get() | events.bits());
    }

    /// Clear `events` from the pending set.  Clearing an unset bit is a
    /// no-op.
    pub fn remove(&self, events: impl Into<EventSet>) {
        let events = events.into();
        critical_section::with(|cs| {
            let cell = self.pending.borrow(cs);
            cell.set(cell.get() & !events.bits());
        });
        trace!("scheduler: -{:#b}", events);
    }

    /// Snapshot of the pending set.  Non-destructive.
    pub fn pending(&self) -> EventSet {
        critical_section::with(|cs| self.pending_in(cs))
    }

    pub fn pending_in(&self, cs: CriticalSection<'_>) -> EventSet {
        EventSet::from_bits(self.pending.borrow(cs).get())
    }

    /// True if no event is pending.
    pub fn is_idle(&self) -> bool {
        self.pending().is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
