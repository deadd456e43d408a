//! Fuzz target: `I2cBus::on_interrupt`
//!
//! Plays arbitrary interrupt-flag sequences into a bus that has just
//! started a read.  Whatever arrives, the driver must either advance or
//! report a protocol error; it must never panic, and the EM2 block it
//! holds must be released exactly when the bus goes idle.
//!
//! cargo fuzz run fuzz_bus_irq

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensenode::app::ports::I2cPort;
use sensenode::config::BusConfig;
use sensenode::drivers::i2c::{BusId, BusIrq, I2cBus, Transfer};
use sensenode::events::Event;
use sensenode::power::EnergyMode;
use sensenode::System;

struct Echo(u8);

impl I2cPort for Echo {
    fn open(&mut self, _config: &BusConfig) {}
    fn send_start(&mut self) {}
    fn write_tx(&mut self, byte: u8) {
        self.0 = byte;
    }
    fn read_rx(&mut self) -> u8 {
        self.0
    }
    fn ack(&mut self) {}
    fn nack(&mut self) {}
    fn stop(&mut self) {}
}

fuzz_target!(|data: &[u8]| {
    let Some((&len, flags)) = data.split_first() else {
        return;
    };
    let sys = System::new();
    let mut bus = I2cBus::open(BusId::I2c1, Echo(0), &BusConfig::for_bus(BusId::I2c1));
    let length = len % 4 + 1;
    if bus
        .start(&sys, Transfer::read(0x40, 0xF5, length, Event::HumidityRead))
        .is_err()
    {
        return;
    }

    for &bits in flags {
        let irq = BusIrq::from_bits_truncate(bits);
        if bus.on_interrupt(&sys, irq).is_err() {
            break;
        }
    }

    let blocks = sys.energy.blocks(EnergyMode::Em2);
    assert_eq!(blocks, u8::from(bus.is_busy()), "EM2 block out of step with busy flag");
    if !bus.is_busy() {
        assert!(sys.events.pending().contains(Event::HumidityRead.set()));
    }
});
