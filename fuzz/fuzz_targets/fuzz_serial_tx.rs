//! Fuzz target: `LeuartTx::start` + `LeuartTx::step`
//!
//! Starts an arbitrary message and feeds an arbitrary cause sequence.
//! The transmitter must never write past the message, never panic, and
//! hold its EM3 block exactly while busy.
//!
//! cargo fuzz run fuzz_serial_tx

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensenode::app::ports::UartPort;
use sensenode::config::SerialConfig;
use sensenode::drivers::leuart::{LeuartTx, TxCause};
use sensenode::power::EnergyMode;
use sensenode::System;

#[derive(Default)]
struct Wire(Vec<u8>);

impl UartPort for Wire {
    fn open(&mut self, _config: &SerialConfig) {}
    fn write_byte(&mut self, byte: u8) {
        self.0.push(byte);
    }
    fn set_tx_buffer_irq(&mut self, _enabled: bool) {}
    fn set_tx_complete_irq(&mut self, _enabled: bool) {}
}

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (message, causes) = rest.split_at(split);
    let Ok(message) = core::str::from_utf8(message) else {
        return;
    };

    let sys = System::new();
    let mut tx = LeuartTx::open(Wire::default(), &SerialConfig::default());
    if tx.start(&sys, message).is_err() {
        assert!(!tx.is_busy());
        return;
    }

    for &c in causes {
        let cause = if c & 1 == 0 {
            TxCause::TxBufferLevel
        } else {
            TxCause::TxComplete
        };
        if tx.step(&sys, cause).is_err() {
            break;
        }
    }

    let wire = &tx.port().0;
    assert!(wire.len() <= message.len());
    assert_eq!(wire.as_slice(), &message.as_bytes()[..wire.len()]);
    assert_eq!(sys.energy.blocks(EnergyMode::Em3), u8::from(tx.is_busy()));
});
