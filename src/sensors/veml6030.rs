//! VEML6030 ambient light sensor (I2C0, 0x48).
//!
//! Configured once at start-up (gain ×1, 100 ms integration) by writing
//! 0x00 to the ALS configuration register; afterwards every reading is a
//! 16-bit ALS word.

use embedded_hal::i2c::SevenBitAddress;

use crate::drivers::i2c::{BusId, Transfer};
use crate::events::EventSet;

pub const BUS: BusId = BusId::I2c0;
pub const ADDRESS: SevenBitAddress = 0x48;

pub const REG_ALS_CONF: u8 = 0x00;
pub const CMD_READ_ALS: u8 = 0x04;

/// ALS_CONF value: gain ×1, IT 100 ms, power on.
pub const START_UP_CONFIG: u32 = 0x0000;

/// lx per count at gain ×1, IT 100 ms.
const RESOLUTION_LUX: f32 = 0.0576;

pub fn als_read(event: impl Into<EventSet>) -> Transfer {
    Transfer::read(ADDRESS, CMD_READ_ALS, 2, event)
}

pub fn start_up(event: impl Into<EventSet>) -> Transfer {
    Transfer::write(ADDRESS, REG_ALS_CONF, START_UP_CONFIG, 2, event)
}

pub fn lux(raw: u32) -> f32 {
    RESOLUTION_LUX * raw as f32
}
