//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured node events to the `log`
//! facade.  The readings themselves already go out over BLE; this is the
//! debug-side view of the same stream.

use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | sampling"),
            AppEvent::SelfTestPassed(r) => info!(
                "TEST  | user_reg={:#04x} RH={:.1}% T={:.1}F",
                r.user_reg, r.humidity, r.temperature
            ),
            AppEvent::Reading(r) => info!("READ  | {:?}", r),
            AppEvent::Metrics(m) => info!("DIAG  | {}", m),
            AppEvent::Fault(e) => error!("FAULT | {}", e),
        }
    }
}
