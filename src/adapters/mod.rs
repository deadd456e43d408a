//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                    | Connects to                 |
//! |------------|-------------------------------|-----------------------------|
//! | `board`    |                               | CMU clocks, sensor power, NVIC |
//! | `delay`    | DelayNs                       | Core cycle counter          |
//! | `i2c`      | I2cPort                       | I2C0 / I2C1 registers       |
//! | `letimer`  | TimerPort                     | LETIMER0 registers          |
//! | `leuart`   | UartPort                      | LEUART0 registers           |
//! | `log_sink` | EventSink                     | `log` output                |
//! | `shared`   | SensorBus, SerialLink, PeriodicTimer | Interrupt-shared driver slots |
//! | `sleep`    | SleepPort                     | SCB `SLEEPDEEP` + `WFI`     |
//!
//! Register adapters only build for the target (`efm32` feature).

pub mod log_sink;
pub mod shared;

#[cfg(feature = "efm32")]
pub mod board;
#[cfg(feature = "efm32")]
pub mod delay;
#[cfg(feature = "efm32")]
pub mod i2c;
#[cfg(feature = "efm32")]
pub mod letimer;
#[cfg(feature = "efm32")]
pub mod leuart;
#[cfg(feature = "efm32")]
mod mmio;
#[cfg(feature = "efm32")]
pub mod sleep;
