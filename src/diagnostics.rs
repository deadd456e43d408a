//! Runtime diagnostics.
//!
//! A point-in-time snapshot of the counters the drivers and the arbiter
//! keep anyway: how often each sleep level was entered, how many bus
//! transactions completed or had to re-poll a busy device, how many
//! readings went out over the BLE link.  The node logs one periodically
//! and emits it as an [`AppEvent`](crate::app::events::AppEvent).

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::ble::LinkStats;
use crate::drivers::i2c::BusStats;
use crate::power::EnergyMode;
use crate::system::System;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMetrics {
    pub completed: u32,
    pub nack_retries: u32,
}

impl From<BusStats> for BusMetrics {
    fn from(s: BusStats) -> Self {
        Self {
            completed: s.completed,
            nack_retries: s.nack_retries,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMetrics {
    /// LETIMER underflows handled since boot.
    pub ticks: u32,
    /// Sleep entries per level, EM0..EM4.
    pub sleep_entries: [u32; EnergyMode::COUNT],
    pub light_bus: BusMetrics,
    pub humidity_bus: BusMetrics,
    pub messages_sent: u32,
    pub messages_dropped: u32,
    pub fault_count: u32,
}

impl RuntimeMetrics {
    pub fn collect(
        system: &System,
        ticks: u32,
        light: BusStats,
        humidity: BusStats,
        link: LinkStats,
        fault_count: u32,
    ) -> Self {
        let mut sleep_entries = [0; EnergyMode::COUNT];
        for mode in EnergyMode::ALL {
            sleep_entries[mode.index()] = system.energy.sleep_entries(mode);
        }
        Self {
            ticks,
            sleep_entries,
            light_bus: light.into(),
            humidity_bus: humidity.into(),
            messages_sent: link.sent,
            messages_dropped: link.dropped,
            fault_count,
        }
    }

    pub fn total_sleeps(&self) -> u32 {
        self.sleep_entries.iter().fold(0u32, |acc, n| acc.wrapping_add(*n))
    }
}

impl fmt::Display for RuntimeMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [_, em1, em2, em3, _] = self.sleep_entries;
        write!(
            f,
            "ticks={} sleep[EM1={} EM2={} EM3={}] i2c0={}/{} i2c1={}/{} ble={}/{} faults={}",
            self.ticks,
            em1,
            em2,
            em3,
            self.light_bus.completed,
            self.light_bus.nack_retries,
            self.humidity_bus.completed,
            self.humidity_bus.nack_retries,
            self.messages_sent,
            self.messages_dropped,
            self.fault_count,
        )
    }
}
