//! Sensing node firmware library.
//!
//! Exposes the event scheduler, the energy-mode arbiter, the interrupt-paced
//! drivers and the dispatch loop for host testing.  Register adapters are
//! compiled only with the `efm32` feature.

#![cfg_attr(not(test), no_std)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod events;
pub mod pins;
pub mod power;
pub mod safety;
pub mod scheduler;
pub mod selftest;
pub mod sensors;
pub mod system;

pub use error::{Error, Result};
pub use system::System;
