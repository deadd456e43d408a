//! Boot-time SI7021 self-test.
//!
//! Runs from the BOOT_UP handler before the timer starts.  Each step starts
//! one transfer and waits for it with the bounded poll, so a missing or
//! stuck sensor surfaces as [`Error::Timeout`] instead of a hang.
//!
//! ```text
//! ReadUserReg ──▶ WriteUserReg ──▶ VerifyUserReg ──▶ Humidity ──▶ Temperature
//!  0x3A|0x3B        0x01             0x3B             10..50 %RH    40..80 °F
//! ```
//!
//! Transfers complete with an empty event set: the results are consumed
//! here and never reach the dispatch loop.

use core::fmt;
use core::ops::Range;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::SensorBus;
use crate::drivers::i2c::{wait_idle, Transfer};
use crate::error::{Error, Result};
use crate::events::EventSet;
use crate::sensors::si7021;
use crate::system::System;

/// Plausible indoor humidity, %RH (exclusive).
pub const HUMIDITY_RANGE: Range<f32> = 10.0..50.0;
/// Plausible indoor temperature, °F (exclusive).
pub const TEMPERATURE_RANGE: Range<f32> = 40.0..80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestStep {
    ReadUserReg,
    WriteUserReg,
    VerifyUserReg,
    Humidity,
    Temperature,
}

impl fmt::Display for SelfTestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadUserReg => "read user register 1",
            Self::WriteUserReg => "write user register 1",
            Self::VerifyUserReg => "verify user register 1",
            Self::Humidity => "humidity plausibility",
            Self::Temperature => "temperature plausibility",
        };
        f.write_str(name)
    }
}

/// Values read during a passing self-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfTestReport {
    pub user_reg: u32,
    pub humidity: f32,
    pub temperature: f32,
}

/// Poll budget for each step.
#[derive(Debug, Clone, Copy)]
pub struct PollBudget {
    pub timeout_us: u32,
    pub step_us: u32,
}

/// Run the SI7021 sequence on `bus`.
pub fn run<B, D>(system: &System, bus: &mut B, delay: &mut D, budget: PollBudget) -> Result<SelfTestReport>
where
    B: SensorBus + ?Sized,
    D: DelayNs,
{
    let initial = transact(system, bus, delay, budget, si7021::user_reg_read(EventSet::EMPTY))?;
    if initial != si7021::USER_REG1_RESET && initial != si7021::USER_REG1_RH8_T12 {
        return fail(SelfTestStep::ReadUserReg, initial);
    }

    transact(
        system,
        bus,
        delay,
        budget,
        si7021::user_reg_write(si7021::RESOLUTION_RH8_T12, EventSet::EMPTY),
    )
    .map_err(|e| step_error(e, SelfTestStep::WriteUserReg))?;

    let user_reg = transact(system, bus, delay, budget, si7021::user_reg_read(EventSet::EMPTY))?;
    if user_reg != si7021::USER_REG1_RH8_T12 {
        return fail(SelfTestStep::VerifyUserReg, user_reg);
    }

    let raw = transact(system, bus, delay, budget, si7021::humidity_read(EventSet::EMPTY))?;
    let humidity = si7021::humidity_percent(raw);
    if !in_range(&HUMIDITY_RANGE, humidity) {
        warn!("self-test: humidity {humidity:.1} %RH out of range");
        return Err(Error::SelfTest(SelfTestStep::Humidity));
    }

    let raw = transact(system, bus, delay, budget, si7021::temperature_read(EventSet::EMPTY))?;
    let temperature = si7021::temperature_f(raw);
    if !in_range(&TEMPERATURE_RANGE, temperature) {
        warn!("self-test: temperature {temperature:.1} F out of range");
        return Err(Error::SelfTest(SelfTestStep::Temperature));
    }

    info!("self-test: passed ({humidity:.1} %RH, {temperature:.1} F)");
    Ok(SelfTestReport {
        user_reg,
        humidity,
        temperature,
    })
}

fn transact<B, D>(system: &System, bus: &mut B, delay: &mut D, budget: PollBudget, transfer: Transfer) -> Result<u32>
where
    B: SensorBus + ?Sized,
    D: DelayNs,
{
    bus.start(system, transfer)?;
    wait_idle(bus, delay, budget.timeout_us, budget.step_us)?;
    Ok(bus.data())
}

fn in_range(range: &Range<f32>, value: f32) -> bool {
    value > range.start && value < range.end
}

fn fail<T>(step: SelfTestStep, value: u32) -> Result<T> {
    warn!("self-test: {step} read {value:#04x}");
    Err(Error::SelfTest(step))
}

fn step_error(err: Error, step: SelfTestStep) -> Error {
    if err != Error::Timeout {
        warn!("self-test: {step}: {err}");
    }
    err
}
