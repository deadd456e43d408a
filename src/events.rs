//! Scheduler event identifiers.
//!
//! Every occurrence that needs run-loop attention owns one bit of the
//! pending set.  Events are produced by:
//! - Timer interrupts (LETIMER0 COMP0 / COMP1 / underflow)
//! - Bus completion (I2C transaction reached the stop phase)
//! - Serial link completion (LEUART transmit drained)
//! - Software (boot-up)
//!
//! and consumed by the dispatch loop, which services every pending bit in
//! the fixed ladder [`Event::DISPATCH_ORDER`] before the core may sleep.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ LETIMER ISR │────▶│                  │     │              │
//! │ I2C0/1 ISR  │────▶│  Pending set     │────▶│  Dispatch    │
//! │ LEUART ISR  │────▶│  (u32 bitmask)   │     │  loop        │
//! │ Boot        │────▶│                  │     │              │
//! └─────────────┘     └──────────────────┘     └──────────────┘
//! ```

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

/// A bitmask of event identifiers.
///
/// The set records occurrence, not count: raising an event that is
/// already pending is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSet(u32);

impl EventSet {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Iterate the pending events in dispatch order.  Bits that do not
    /// name a known [`Event`] are skipped.
    pub fn iter(self) -> impl Iterator<Item = Event> {
        Event::DISPATCH_ORDER
            .into_iter()
            .filter(move |e| self.contains(e.set()))
    }
}

impl BitOr for EventSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for EventSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EventSet {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for EventSet {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl From<Event> for EventSet {
    fn from(e: Event) -> Self {
        e.set()
    }
}

impl fmt::Binary for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

/// Named events of the sensing node.  The discriminant is the event's bit
/// in the pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Event {
    // ── Timer ─────────────────────────────────────────────
    /// LETIMER0 compare 0 matched.  Never enabled.
    LetimerComp0 = 0x0000_0001,
    /// LETIMER0 compare 1 matched.  Never enabled.
    LetimerComp1 = 0x0000_0002,
    /// LETIMER0 underflow: start the next sensor reading.
    LetimerUnderflow = 0x0000_0004,

    // ── Sensor bus completions ────────────────────────────
    /// SI7021 humidity read finished.
    HumidityRead = 0x0000_0008,
    /// SI7021 temperature read finished.
    TemperatureRead = 0x0000_0200,
    /// VEML6030 ambient light read finished.
    LightRead = 0x0000_0100,

    // ── Lifecycle ─────────────────────────────────────────
    /// Peripherals are open; run self-test and start the timer.
    BootUp = 0x0000_0010,

    // ── Serial link ───────────────────────────────────────
    /// BLE module transmit drained.
    BleTxDone = 0x0000_0040,
    /// BLE module receive complete.  Reserved, never raised.
    BleRxDone = 0x0000_0080,
}

impl Event {
    /// Order in which a single drain pass services pending events.
    ///
    /// Timer first (it starts new work), then completions in the order the
    /// readings are produced, then lifecycle and serial housekeeping.
    pub const DISPATCH_ORDER: [Event; 8] = [
        Event::LetimerUnderflow,
        Event::LetimerComp0,
        Event::LetimerComp1,
        Event::HumidityRead,
        Event::TemperatureRead,
        Event::LightRead,
        Event::BootUp,
        Event::BleTxDone,
    ];

    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn set(self) -> EventSet {
        EventSet(self as u32)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LetimerComp0 => "LETIMER0 COMP0",
            Self::LetimerComp1 => "LETIMER0 COMP1",
            Self::LetimerUnderflow => "LETIMER0 UF",
            Self::HumidityRead => "SI7021 humidity read",
            Self::TemperatureRead => "SI7021 temperature read",
            Self::LightRead => "VEML6030 read",
            Self::BootUp => "boot up",
            Self::BleTxDone => "BLE TX done",
            Self::BleRxDone => "BLE RX done",
        };
        f.write_str(name)
    }
}
