//! SI7021 relative humidity and temperature sensor (I2C1, 0x40).
//!
//! Measurements use the "no hold master" commands: the device NACKs its
//! read address until the conversion finishes, which the bus driver
//! absorbs in `WaitRead`.

use embedded_hal::i2c::SevenBitAddress;

use crate::drivers::i2c::{BusId, Transfer};
use crate::events::EventSet;

pub const BUS: BusId = BusId::I2c1;
pub const ADDRESS: SevenBitAddress = 0x40;

pub const CMD_MEASURE_HUMIDITY: u8 = 0xF5;
pub const CMD_MEASURE_TEMPERATURE: u8 = 0xF3;
pub const CMD_READ_USER_REG1: u8 = 0xE7;
pub const CMD_WRITE_USER_REG1: u8 = 0xE6;

/// User register 1 after power-on reset (RH 12 bit, T 14 bit).
pub const USER_REG1_RESET: u32 = 0x3A;
/// User register 1 once [`RESOLUTION_RH8_T12`] has been written.
pub const USER_REG1_RH8_T12: u32 = 0x3B;
/// Resolution bits for RH 8 bit, T 12 bit.
pub const RESOLUTION_RH8_T12: u32 = 0x01;

/// Power-up time before the first command.
pub const POWER_UP_MS: u32 = 80;

/// Measurement results are 16 bits, MSB first.
const MEASUREMENT_LEN: u8 = 2;

pub fn humidity_read(event: impl Into<EventSet>) -> Transfer {
    Transfer::read(ADDRESS, CMD_MEASURE_HUMIDITY, MEASUREMENT_LEN, event)
}

pub fn temperature_read(event: impl Into<EventSet>) -> Transfer {
    Transfer::read(ADDRESS, CMD_MEASURE_TEMPERATURE, MEASUREMENT_LEN, event)
}

pub fn user_reg_read(event: impl Into<EventSet>) -> Transfer {
    Transfer::read(ADDRESS, CMD_READ_USER_REG1, 1, event)
}

pub fn user_reg_write(value: u32, event: impl Into<EventSet>) -> Transfer {
    Transfer::write(ADDRESS, CMD_WRITE_USER_REG1, value, 1, event)
}

/// %RH = 125 × raw / 65536 − 6
pub fn humidity_percent(raw: u32) -> f32 {
    (125.0 * raw as f32) / 65536.0 - 6.0
}

/// °F from the temperature code.
pub fn temperature_f(raw: u32) -> f32 {
    let celsius = (175.72 * raw as f32) / 65536.0 - 46.85;
    celsius * 1.8 + 32.0
}
