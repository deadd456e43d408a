//! Sensor modules: command encodings, transfer builders and unit
//! conversions.  They own no bus; the node starts their transfers on the
//! bus each sensor is wired to.

pub mod si7021;
pub mod veml6030;

use core::fmt;

use serde::{Deserialize, Serialize};

/// One converted sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    /// %RH
    Humidity(f32),
    /// °F
    Temperature(f32),
    /// lx
    Light(f32),
}

impl Reading {
    pub fn humidity(raw: u32) -> Self {
        Self::Humidity(si7021::humidity_percent(raw))
    }

    pub fn temperature(raw: u32) -> Self {
        Self::Temperature(si7021::temperature_f(raw))
    }

    pub fn light(raw: u32) -> Self {
        Self::Light(veml6030::lux(raw))
    }
}

/// The line sent over the serial link.
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Humidity(rh) => writeln!(f, "{rh:4.1}% humidity"),
            Self::Temperature(t) => writeln!(f, "{t:4.1} F"),
            Self::Light(lx) => writeln!(f, "{:3} lux", lx as u32),
        }
    }
}
