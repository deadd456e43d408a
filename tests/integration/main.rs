//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against simulated peripherals.  All tests run on the host with no real
//! hardware required.

mod bus_tests;
mod mock_hw;
mod node_tests;
