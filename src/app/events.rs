//! Outbound application events.
//!
//! The [`SensorNode`](super::service::SensorNode) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  On target the sink writes
//! them to the log; host tests record them.

use crate::diagnostics::RuntimeMetrics;
use crate::error::Error;
use crate::selftest::SelfTestReport;
use crate::sensors::Reading;

/// Structured events emitted by the node.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// BOOT_UP handled; the sampling timer is running.
    Started,

    /// The SI7021 self-test passed.
    SelfTestPassed(SelfTestReport),

    /// A reading was converted and handed to the BLE link.
    Reading(Reading),

    /// Periodic diagnostics snapshot.
    Metrics(RuntimeMetrics),

    /// A handler failed; the fault policy decides what happens next.
    Fault(Error),
}
