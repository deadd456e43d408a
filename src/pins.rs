//! Pin routing and interrupt numbers for the SLSTK3402A (EFM32PG12) board.
//!
//! Single source of truth: every adapter and the default configuration
//! reference this module rather than hard-coding route locations.
//!
//! Route values are the `ROUTELOC0` location indices; the adapters shift
//! them into the SCL/SDA (or TX/RX, OUT0/OUT1) fields.

// ---------------------------------------------------------------------------
// I2C0: VEML6030 ambient light sensor (expansion header)
// ---------------------------------------------------------------------------

/// SCL on PB12.
pub const I2C0_SCL_ROUTE: u8 = 6;
/// SDA on PB13.
pub const I2C0_SDA_ROUTE: u8 = 8;

// ---------------------------------------------------------------------------
// I2C1: SI7021 relative humidity / temperature sensor (on board)
// ---------------------------------------------------------------------------

/// SCL on PC11.
pub const I2C1_SCL_ROUTE: u8 = 19;
/// SDA on PC10.
pub const I2C1_SDA_ROUTE: u8 = 19;

/// Sensor power enable (PB10), driven high during board bring-up.
pub const SI7021_ENABLE_PORT: u8 = 1;
pub const SI7021_ENABLE_PIN: u8 = 10;

// ---------------------------------------------------------------------------
// LEUART0: HM-10 BLE module
// ---------------------------------------------------------------------------

/// TX on PD10, RX on PD11.
pub const LEUART0_TX_ROUTE: u8 = 18;
pub const LEUART0_RX_ROUTE: u8 = 18;

// ---------------------------------------------------------------------------
// LETIMER0 PWM outputs (LED0 / LED1)
// ---------------------------------------------------------------------------

pub const LETIMER0_OUT0_ROUTE: u8 = 28;
pub const LETIMER0_OUT1_ROUTE: u8 = 28;

// ---------------------------------------------------------------------------
// NVIC interrupt numbers (EFM32PG12)
// ---------------------------------------------------------------------------

pub const IRQ_I2C0: u16 = 16;
pub const IRQ_LEUART0: u16 = 21;
pub const IRQ_LETIMER0: u16 = 26;
pub const IRQ_I2C1: u16 = 41;
