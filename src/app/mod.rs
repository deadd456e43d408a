//! Application core: the sensing node's dispatch loop and its ports.
//!
//! [`service::SensorNode`] maps scheduler events to handlers.  All
//! interaction with the drivers happens through the **port traits** in
//! [`ports`], so the node runs unchanged against MMIO adapters on target
//! and against recording mocks in host tests.

pub mod events;
pub mod ports;
pub mod service;
