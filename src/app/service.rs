//! Sensor node: the dispatch loop.
//!
//! [`SensorNode`] owns handles to both sensor buses, the BLE link, the
//! sampling timer and a delay source.  Interrupts only raise scheduler
//! bits; the node drains them in [`Event::DISPATCH_ORDER`], runs one
//! handler per bit and, once nothing is pending, lets the energy-mode
//! arbiter put the core to sleep.
//!
//! ```text
//!  LETIMER UF ──▶ start next reading ──▶ I2C ISR … MSTOP ──▶ *_READ
//!                 (H → T → light)                               │
//!  BLE_TX_DONE ◀── LEUART ISR ◀── BLE link ◀── format + send ◀──┘
//! ```
//!
//! Every handler removes its own bit before doing any work.  Handler
//! errors go through the [`FaultSupervisor`]; production builds halt.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::diagnostics::RuntimeMetrics;
use crate::drivers::ble::format_message;
use crate::drivers::i2c::wait_idle;
use crate::error::{Error, Result, SerialError};
use crate::events::{Event, EventSet};
use crate::power::EnergyMode;
use crate::safety::FaultSupervisor;
use crate::selftest::{self, PollBudget};
use crate::sensors::{si7021, veml6030, Reading};
use crate::system::System;

use super::events::AppEvent;
use super::ports::{EventSink, PeriodicTimer, SensorBus, SerialLink, SleepPort};

/// Underflows between two diagnostics snapshots.
pub const METRICS_EVERY_TICKS: u32 = 60;

/// Which reading the next underflow starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Humidity,
    Temperature,
    Light,
}

impl Sample {
    pub fn next(self) -> Self {
        match self {
            Self::Humidity => Self::Temperature,
            Self::Temperature => Self::Light,
            Self::Light => Self::Humidity,
        }
    }
}

/// Already-opened drivers handed to [`SensorNode::open`].
pub struct NodeParts<L, H, S, T, D> {
    /// VEML6030 bus (I2C0).
    pub light_bus: L,
    /// SI7021 bus (I2C1).
    pub humidity_bus: H,
    pub link: S,
    pub timer: T,
    pub delay: D,
}

// ───────────────────────────────────────────────────────────────
// SensorNode
// ───────────────────────────────────────────────────────────────

pub struct SensorNode<L, H, S, T, D> {
    config: NodeConfig,
    light_bus: L,
    humidity_bus: H,
    link: S,
    timer: T,
    delay: D,
    supervisor: FaultSupervisor,
    next: Sample,
    ticks: u32,
}

impl<L, H, S, T, D> SensorNode<L, H, S, T, D>
where
    L: SensorBus,
    H: SensorBus,
    S: SerialLink,
    T: PeriodicTimer,
    D: DelayNs,
{
    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: reset the scheduler and the arbiter, take the
    /// drivers (already opened by the caller), block the system level and
    /// raise BOOT_UP.
    pub fn open(system: &System, config: NodeConfig, parts: NodeParts<L, H, S, T, D>) -> Result<Self> {
        system.open();
        let mut supervisor = FaultSupervisor::new(config.fault_policy);
        supervisor.check(system.energy.block(config.system_block))?;
        system.events.add(Event::BootUp);
        info!(
            "node: open, system block {}, self-test {}",
            config.system_block,
            if config.self_test { "on" } else { "off" }
        );

        Ok(Self {
            config,
            light_bus: parts.light_bus,
            humidity_bus: parts.humidity_bus,
            link: parts.link,
            timer: parts.timer,
            delay: parts.delay,
            supervisor,
            next: Sample::Humidity,
            ticks: 0,
        })
    }

    /// Drain the scheduler, then sleep as deep as the arbiter allows.
    ///
    /// Returns the sleep level entered, `None` if the core stayed awake.
    pub fn run_once(
        &mut self,
        system: &System,
        sleep: &mut impl SleepPort,
        sink: &mut impl EventSink,
    ) -> Result<Option<EnergyMode>> {
        while !system.events.is_idle() {
            self.dispatch(system, sink)?;
        }
        Ok(system.idle(sleep))
    }

    /// Run forever.  Only returns under
    /// [`FaultPolicy::Propagate`](crate::safety::FaultPolicy::Propagate).
    pub fn run(&mut self, system: &System, sleep: &mut impl SleepPort, sink: &mut impl EventSink) -> Error {
        loop {
            if let Err(e) = self.run_once(system, sleep, sink) {
                return e;
            }
        }
    }

    /// One pass over the pending set in dispatch order.
    pub fn dispatch(&mut self, system: &System, sink: &mut impl EventSink) -> Result<()> {
        let pending = system.events.pending();

        let unknown = pending.difference(Self::handled());
        if !unknown.is_empty() {
            warn!("node: dropping unhandled events {:#b}", unknown);
            system.events.remove(unknown);
        }

        for event in pending.iter() {
            let result = self.handle(system, event, sink);
            self.check(result, sink)?;
        }
        Ok(())
    }

    fn handled() -> EventSet {
        Event::DISPATCH_ORDER
            .iter()
            .fold(EventSet::EMPTY, |acc, e| acc | e.set())
    }

    // ── Handlers ──────────────────────────────────────────────

    fn handle(&mut self, system: &System, event: Event, sink: &mut impl EventSink) -> Result<()> {
        system.events.remove(event);
        debug!("node: {event}");
        match event {
            Event::LetimerUnderflow => self.on_underflow(system, sink),
            Event::LetimerComp0 | Event::LetimerComp1 | Event::BleRxDone => {
                Err(Error::UnexpectedEvent(event))
            }
            Event::HumidityRead => {
                let reading = Reading::humidity(self.humidity_bus.data());
                self.publish(system, reading, sink)
            }
            Event::TemperatureRead => {
                let reading = Reading::temperature(self.humidity_bus.data());
                self.publish(system, reading, sink)
            }
            Event::LightRead => {
                let reading = Reading::light(self.light_bus.data());
                self.publish(system, reading, sink)
            }
            Event::BootUp => self.on_boot(system, sink),
            Event::BleTxDone => self.link.on_tx_done(system),
        }
    }

    /// Start the next reading in the humidity → temperature → light
    /// rotation.
    fn on_underflow(&mut self, system: &System, sink: &mut impl EventSink) -> Result<()> {
        self.ticks = self.ticks.wrapping_add(1);
        let sample = self.next;
        self.next = sample.next();

        let started = match sample {
            Sample::Humidity => self
                .humidity_bus
                .start(system, si7021::humidity_read(Event::HumidityRead)),
            Sample::Temperature => self
                .humidity_bus
                .start(system, si7021::temperature_read(Event::TemperatureRead)),
            Sample::Light => self
                .light_bus
                .start(system, veml6030::als_read(Event::LightRead)),
        };

        if self.ticks % METRICS_EVERY_TICKS == 0 {
            let metrics = self.metrics(system);
            info!("node: {metrics}");
            sink.emit(&AppEvent::Metrics(metrics));
        }
        started
    }

    fn publish(&mut self, system: &System, reading: Reading, sink: &mut impl EventSink) -> Result<()> {
        let message = format_message(format_args!("{reading}"))?;
        sink.emit(&AppEvent::Reading(reading));
        match self.link.send(system, &message) {
            // Losing a reading is not a fault; the link counts it.
            Err(Error::Serial(SerialError::QueueFull)) => Ok(()),
            other => other,
        }
    }

    /// Self-test, VEML6030 start-up, then start the sampling timer.
    fn on_boot(&mut self, system: &System, sink: &mut impl EventSink) -> Result<()> {
        let budget = PollBudget {
            timeout_us: self.config.poll_timeout_us,
            step_us: self.config.poll_step_us,
        };
        self.delay.delay_ms(si7021::POWER_UP_MS);

        if self.config.self_test {
            let report = selftest::run(system, &mut self.humidity_bus, &mut self.delay, budget)?;
            sink.emit(&AppEvent::SelfTestPassed(report));
        }

        self.light_bus
            .start(system, veml6030::start_up(EventSet::EMPTY))?;
        wait_idle(&self.light_bus, &mut self.delay, budget.timeout_us, budget.step_us)?;

        self.timer.start(system, true)?;
        info!("node: sampling started");
        sink.emit(&AppEvent::Started);
        Ok(())
    }

    fn check<R>(&mut self, result: Result<R>, sink: &mut impl EventSink) -> Result<R> {
        if let Err(e) = &result {
            sink.emit(&AppEvent::Fault(*e));
        }
        self.supervisor.check(result)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn metrics(&self, system: &System) -> RuntimeMetrics {
        RuntimeMetrics::collect(
            system,
            self.ticks,
            self.light_bus.stats(),
            self.humidity_bus.stats(),
            self.link.stats(),
            self.supervisor.fault_count(),
        )
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn next_sample(&self) -> Sample {
        self.next
    }

    pub fn supervisor(&self) -> &FaultSupervisor {
        &self.supervisor
    }

    pub fn light_bus(&self) -> &L {
        &self.light_bus
    }

    pub fn light_bus_mut(&mut self) -> &mut L {
        &mut self.light_bus
    }

    pub fn humidity_bus(&self) -> &H {
        &self.humidity_bus
    }

    pub fn humidity_bus_mut(&mut self) -> &mut H {
        &mut self.humidity_bus
    }

    pub fn link(&self) -> &S {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut S {
        &mut self.link
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}
