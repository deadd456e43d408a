//! Handles onto drivers that live in `static` slots shared with their
//! interrupt handlers.
//!
//! ```text
//!   static LIGHT_BUS: Slot<I2cBus<I2cMmio>>
//!        ▲                       ▲
//!        │ Shared::with          │ critical_section::with
//!   SensorNode (run loop)    I2C0 handler
//! ```
//!
//! Every access runs inside a critical section, so the handler and the run
//! loop never observe a half-updated state machine.  An empty slot means the
//! driver was never opened and surfaces as [`Error::NotOpen`].

use core::cell::RefCell;

use critical_section::Mutex;

use crate::app::ports::{PeriodicTimer, SensorBus, SerialLink};
use crate::drivers::ble::LinkStats;
use crate::drivers::i2c::{BusId, BusStats, Transfer};
use crate::error::{Error, Result};
use crate::system::System;

pub type Slot<T> = Mutex<RefCell<Option<T>>>;

/// Store `driver` in `slot`, replacing whatever was there.
pub fn install<T>(slot: &Slot<T>, driver: T) {
    critical_section::with(|cs| {
        slot.borrow_ref_mut(cs).replace(driver);
    });
}

pub struct Shared<T: 'static> {
    slot: &'static Slot<T>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Shared<T> {}

impl<T> Shared<T> {
    pub const fn new(slot: &'static Slot<T>) -> Self {
        Self { slot }
    }

    /// Run `f` on the driver inside a critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        critical_section::with(|cs| {
            let mut guard = self.slot.borrow_ref_mut(cs);
            guard.as_mut().map(f).ok_or(Error::NotOpen)
        })
    }
}

/// A sensor bus shared with its interrupt handler.
pub struct SharedBus<T: 'static> {
    id: BusId,
    inner: Shared<T>,
}

impl<T> SharedBus<T> {
    pub const fn new(id: BusId, slot: &'static Slot<T>) -> Self {
        Self {
            id,
            inner: Shared::new(slot),
        }
    }
}

impl<T: SensorBus> SensorBus for SharedBus<T> {
    fn id(&self) -> BusId {
        self.id
    }

    fn start(&mut self, system: &System, transfer: Transfer) -> Result<()> {
        self.inner.with(|bus| bus.start(system, transfer))?
    }

    /// An unopened bus never becomes idle, so polling it times out.
    fn is_busy(&self) -> bool {
        self.inner.with(|bus| bus.is_busy()).unwrap_or(true)
    }

    fn data(&self) -> u32 {
        self.inner.with(|bus| bus.data()).unwrap_or(0)
    }

    fn stats(&self) -> BusStats {
        self.inner.with(|bus| bus.stats()).unwrap_or_default()
    }
}

impl<T: SerialLink> SerialLink for Shared<T> {
    fn send(&mut self, system: &System, message: &str) -> Result<()> {
        self.with(|link| link.send(system, message))?
    }

    fn on_tx_done(&mut self, system: &System) -> Result<()> {
        self.with(|link| link.on_tx_done(system))?
    }

    fn stats(&self) -> LinkStats {
        self.with(|link| link.stats()).unwrap_or_default()
    }
}

impl<T: PeriodicTimer> PeriodicTimer for Shared<T> {
    fn start(&mut self, system: &System, enable: bool) -> Result<()> {
        self.with(|timer| timer.start(system, enable))?
    }

    fn is_running(&self) -> bool {
        self.with(|timer| timer.is_running()).unwrap_or(false)
    }
}
