//! Volatile register access for the EFM32PG12 peripherals.
//!
//! No PAC: each adapter knows its base address and the handful of
//! register offsets and bits it touches.

use core::ptr;

/// A peripheral register block at a fixed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    base: usize,
}

impl Block {
    pub const fn at(base: usize) -> Self {
        Self { base }
    }

    pub fn read(self, offset: usize) -> u32 {
        // SAFETY: `base` is a peripheral block from the device memory map
        // and `offset` a register inside it; the access is aligned.
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    pub fn write(self, offset: usize, value: u32) {
        // SAFETY: see `read`.
        unsafe { ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    pub fn modify(self, offset: usize, f: impl FnOnce(u32) -> u32) {
        self.write(offset, f(self.read(offset)));
    }

    pub fn set_bits(self, offset: usize, bits: u32) {
        self.modify(offset, |v| v | bits);
    }

    pub fn clear_bits(self, offset: usize, bits: u32) {
        self.modify(offset, |v| v & !bits);
    }

    /// Spin while any of `mask` is set in `offset` (SYNCBUSY style).
    pub fn wait_clear(self, offset: usize, mask: u32) {
        while self.read(offset) & mask != 0 {}
    }
}
