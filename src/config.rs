//! Node configuration parameters
//!
//! All tunable parameters of the sensing node.  Compiled-in defaults match
//! the reference board (SLSTK3402A + SI7021 + VEML6030 + HM-10 module);
//! the struct is serde-enabled so a host tool can build or inspect one.

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::drivers::i2c::BusId;
use crate::drivers::letimer::TimerIrq;
use crate::pins;
use crate::power::EnergyMode;
use crate::safety::FaultPolicy;

/// Name the BLE module advertises under.
pub const DEVICE_NAME_LEN: usize = 16;
const DEFAULT_DEVICE_NAME: &str = "SENSENODE";

/// Ultra-low-frequency oscillator feeding the LETIMER.
pub const ULFRCO_HZ: u32 = 1000;

/// Top-level node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// VEML6030 bus.
    pub light_bus: BusConfig,
    /// SI7021 bus.
    pub humidity_bus: BusConfig,
    pub timer: TimerConfig,
    pub serial: SerialConfig,

    /// Level held for the whole run so the arbiter never sleeps deeper
    /// than the serial link can wake from.
    pub system_block: EnergyMode,

    /// Run the SI7021 self-test on BOOT_UP.
    pub self_test: bool,
    pub fault_policy: FaultPolicy,

    /// Budget for one synchronous bus wait (self-test, sensor start-up).
    pub poll_timeout_us: u32,
    /// Interval between busy-flag polls.
    pub poll_step_us: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            light_bus: BusConfig::for_bus(BusId::I2c0),
            humidity_bus: BusConfig::for_bus(BusId::I2c1),
            timer: TimerConfig::default(),
            serial: SerialConfig::default(),
            system_block: EnergyMode::Em3,
            self_test: true,
            fault_policy: FaultPolicy::Halt,
            // SI7021 worst-case humidity conversion is ~23 ms
            poll_timeout_us: 50_000,
            poll_step_us: 100,
        }
    }
}

// ── Bus ───────────────────────────────────────────────────────

/// SCL low:high ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockRatio {
    /// 4:4, standard mode.
    Standard,
    /// 6:3, fast mode with asymmetric duty.
    Asymmetric,
    /// 11:6, fast mode.
    Fast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    pub frequency_hz: u32,
    pub clock_ratio: ClockRatio,
    /// SCL route location.
    pub scl_route: u8,
    /// SDA route location.
    pub sda_route: u8,
}

/// Fast-mode maximum for a 6:3 ratio.
pub const I2C_FREQ_FAST_MAX: u32 = 392_157;

impl BusConfig {
    pub fn for_bus(bus: BusId) -> Self {
        let (scl_route, sda_route) = match bus {
            BusId::I2c0 => (pins::I2C0_SCL_ROUTE, pins::I2C0_SDA_ROUTE),
            BusId::I2c1 => (pins::I2C1_SCL_ROUTE, pins::I2C1_SDA_ROUTE),
        };
        Self {
            frequency_hz: I2C_FREQ_FAST_MAX,
            clock_ratio: ClockRatio::Asymmetric,
            scl_route,
            sda_route,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::for_bus(BusId::I2c1)
    }
}

// ── Timer ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Seconds between underflows.
    pub period_s: f32,
    /// Seconds of the active (COMP1) phase.
    pub active_s: f32,
    pub clock_hz: u32,
    pub comp0_irq: bool,
    pub comp1_irq: bool,
    pub underflow_irq: bool,
}

/// Compare register values derived from a [`TimerConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerCounts {
    /// Top value (period).
    pub comp0: u32,
    /// Active-phase length.
    pub comp1: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            period_s: 1.0,
            active_s: 0.25,
            clock_hz: ULFRCO_HZ,
            comp0_irq: false,
            comp1_irq: false,
            underflow_irq: true,
        }
    }
}

impl TimerConfig {
    pub fn counts(&self) -> TimerCounts {
        let hz = self.clock_hz as f32;
        TimerCounts {
            comp0: (self.period_s * hz) as u32,
            comp1: (self.active_s * hz) as u32,
        }
    }

    pub fn irq_enable(&self) -> TimerIrq {
        let mut irq = TimerIrq::NONE;
        if self.comp0_irq {
            irq = irq.union(TimerIrq::COMP0);
        }
        if self.comp1_irq {
            irq = irq.union(TimerIrq::COMP1);
        }
        if self.underflow_irq {
            irq = irq.union(TimerIrq::UF);
        }
        irq
    }
}

// ── Serial ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("N"),
            Self::Even => f.write_str("E"),
            Self::Odd => f.write_str("O"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub device_name: String<DEVICE_NAME_LEN>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        let mut device_name = String::new();
        // fits by construction
        let _ = device_name.push_str(DEFAULT_DEVICE_NAME);
        Self {
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            device_name,
        }
    }
}
