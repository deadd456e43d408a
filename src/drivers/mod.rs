//! Peripheral drivers: interrupt-paced state machines over the port traits.

pub mod ble;
pub mod i2c;
pub mod letimer;
pub mod leuart;
