//! Sensenode firmware entry point (EFM32PG12, SLSTK3402A).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  I2cMmio ×2   LeuartMmio   LetimerMmio   CortexSleep         │
//! │  CycleDelay   LogEventSink                                   │
//! │                                                              │
//! │  ───────────────── Port Trait Boundary ─────────────────     │
//! │                                                              │
//! │  I2cBus ×2 ── BleLink ── Letimer      (static slots, shared  │
//! │       ▲          ▲          ▲          with their IRQs)      │
//! │       └──────────┴──────────┴── SensorNode dispatch loop     │
//! │                                                              │
//! │  System: EventScheduler · EnergyModes                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Interrupt handlers only advance the driver state machines and raise
//! scheduler bits; everything else runs in the dispatch loop.
#![no_std]
#![no_main]
#![deny(unused_must_use)]

use cortex_m::peripheral::Peripherals;
use cortex_m_rt::{entry, exception};
use log::{error, info};
use panic_halt as _;

use sensenode::adapters::board::{self, CPU_HZ, NODE_IRQS};
use sensenode::adapters::delay::CycleDelay;
use sensenode::adapters::i2c::I2cMmio;
use sensenode::adapters::letimer::LetimerMmio;
use sensenode::adapters::leuart::LeuartMmio;
use sensenode::adapters::log_sink::LogEventSink;
use sensenode::adapters::shared::{install, Shared, SharedBus, Slot};
use sensenode::adapters::sleep::CortexSleep;
use sensenode::app::service::{NodeParts, SensorNode};
use sensenode::config::NodeConfig;
use sensenode::drivers::ble::BleLink;
use sensenode::drivers::i2c::{BusId, I2cBus};
use sensenode::drivers::letimer::{Letimer, TimerEvents};
use sensenode::{pins, System};

// ── Shared state ──────────────────────────────────────────────

static SYSTEM: System = System::new();

static LIGHT_BUS: Slot<I2cBus<I2cMmio>> = Slot::new(core::cell::RefCell::new(None));
static HUMIDITY_BUS: Slot<I2cBus<I2cMmio>> = Slot::new(core::cell::RefCell::new(None));
static LINK: Slot<BleLink<LeuartMmio>> = Slot::new(core::cell::RefCell::new(None));
static TIMER: Slot<Letimer<LetimerMmio>> = Slot::new(core::cell::RefCell::new(None));

// ── Main ──────────────────────────────────────────────────────

#[entry]
fn main() -> ! {
    info!("sensenode v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Clocks, sensor power ───────────────────────────────
    let Some(cp) = Peripherals::take() else {
        error!("core peripherals already taken");
        #[allow(clippy::empty_loop)]
        loop {}
    };
    board::init();

    // ── 2. Open drivers into their interrupt slots ────────────
    let config = NodeConfig::default();
    install(
        &LIGHT_BUS,
        I2cBus::open(BusId::I2c0, I2cMmio::new(BusId::I2c0), &config.light_bus),
    );
    install(
        &HUMIDITY_BUS,
        I2cBus::open(BusId::I2c1, I2cMmio::new(BusId::I2c1), &config.humidity_bus),
    );
    install(&LINK, BleLink::open(LeuartMmio::LEUART0, &config.serial));
    install(
        &TIMER,
        Letimer::open(LetimerMmio::LETIMER0, &config.timer, TimerEvents::default()),
    );

    // ── 3. Node (resets scheduler + energy modes, raises BOOT_UP)
    let parts = NodeParts {
        light_bus: SharedBus::new(BusId::I2c0, &LIGHT_BUS),
        humidity_bus: SharedBus::new(BusId::I2c1, &HUMIDITY_BUS),
        link: Shared::new(&LINK),
        timer: Shared::new(&TIMER),
        delay: CycleDelay::new(CPU_HZ),
    };
    let mut node = match SensorNode::open(&SYSTEM, config, parts) {
        Ok(node) => node,
        Err(e) => panic!("node open failed: {e}"),
    };

    // ── 4. Interrupts on, run forever ─────────────────────────
    board::unmask(&NODE_IRQS);
    info!("node ready, entering dispatch loop");

    let mut sleep = CortexSleep::new(cp.SCB);
    let mut sink = LogEventSink::new();
    let err = node.run(&SYSTEM, &mut sleep, &mut sink);
    panic!("dispatch loop stopped: {err}");
}

// ── Interrupt routing ─────────────────────────────────────────
//
// No device crate: cortex-m-rt points every vector at `DefaultHandler`,
// which dispatches on the IRQ number.

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    let Ok(irq) = u16::try_from(irqn) else {
        panic!("unhandled exception {irqn}");
    };
    match irq {
        pins::IRQ_I2C0 => on_bus(&LIGHT_BUS, I2cMmio::new(BusId::I2c0)),
        pins::IRQ_I2C1 => on_bus(&HUMIDITY_BUS, I2cMmio::new(BusId::I2c1)),
        pins::IRQ_LEUART0 => on_leuart(),
        pins::IRQ_LETIMER0 => on_letimer(),
        other => panic!("unhandled irq {other}"),
    }
}

fn on_bus(slot: &Slot<I2cBus<I2cMmio>>, regs: I2cMmio) {
    let irq = regs.take_flags();
    critical_section::with(|cs| {
        if let Some(bus) = slot.borrow_ref_mut(cs).as_mut() {
            if let Err(e) = bus.on_interrupt(&SYSTEM, irq) {
                panic!("{}: {e}", bus.id());
            }
        }
    });
}

fn on_leuart() {
    let irq = LeuartMmio::LEUART0.take_flags();
    critical_section::with(|cs| {
        if let Some(link) = LINK.borrow_ref_mut(cs).as_mut() {
            if let Err(e) = link.on_interrupt(&SYSTEM, irq) {
                panic!("LEUART0: {e}");
            }
        }
    });
}

fn on_letimer() {
    let irq = LetimerMmio::LETIMER0.take_flags();
    critical_section::with(|cs| {
        if let Some(timer) = TIMER.borrow_ref(cs).as_ref() {
            timer.on_interrupt(&SYSTEM, irq);
        }
    });
}
