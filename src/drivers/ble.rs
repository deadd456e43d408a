//! BLE link: the HM-10 module behind LEUART0.
//!
//! Wraps the transmit state machine with a small outgoing queue so the
//! dispatch loop can hand over a reading while the previous one is still
//! on the wire.  The BLE_TX_DONE handler starts the next queued message.

use core::fmt::{self, Write as _};

use heapless::{Deque, String};
use log::warn;

use crate::app::ports::{SerialLink, UartPort};
use crate::config::SerialConfig;
use crate::error::{Result, SerialError};
use crate::system::System;

use super::leuart::{LeuartTx, MAX_MESSAGE_LEN, TxIrq};

/// Messages held while the transmitter is busy.
pub const QUEUE_DEPTH: usize = 4;

pub type Message = String<MAX_MESSAGE_LEN>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u32,
    pub queued: usize,
    pub dropped: u32,
}

/// Format into a fixed-capacity message.
pub fn format_message(args: fmt::Arguments<'_>) -> Result<Message> {
    let mut msg = Message::new();
    msg.write_fmt(args)
        .map_err(|_| SerialError::TooLong(MAX_MESSAGE_LEN + 1))?;
    Ok(msg)
}

pub struct BleLink<P> {
    tx: LeuartTx<P>,
    queue: Deque<Message, QUEUE_DEPTH>,
    dropped: u32,
}

impl<P: UartPort> BleLink<P> {
    pub fn open(port: P, config: &SerialConfig) -> Self {
        Self {
            tx: LeuartTx::open(port, config),
            queue: Deque::new(),
            dropped: 0,
        }
    }

    pub fn tx(&self) -> &LeuartTx<P> {
        &self.tx
    }

    /// LEUART interrupt entry.
    pub fn on_interrupt(&mut self, system: &System, irq: TxIrq) -> Result<()> {
        self.tx.on_interrupt(system, irq)
    }

    pub fn send(&mut self, system: &System, message: &str) -> Result<()> {
        if message.len() > MAX_MESSAGE_LEN {
            return Err(SerialError::TooLong(message.len()).into());
        }
        if !self.tx.is_busy() {
            // Older messages go first; BLE_TX_DONE may still be pending.
            match self.queue.pop_front() {
                Some(older) => self.tx.start(system, &older)?,
                None => return self.tx.start(system, message),
            }
        }

        let mut queued = Message::new();
        // length checked above
        let _ = queued.push_str(message);
        if self.queue.push_back(queued).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("ble: queue full, dropped {:?}", message);
            return Err(SerialError::QueueFull.into());
        }
        Ok(())
    }

    pub fn on_tx_done(&mut self, system: &System) -> Result<()> {
        if self.tx.is_busy() {
            return Ok(());
        }
        match self.queue.pop_front() {
            Some(next) => self.tx.start(system, &next),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> LinkStats {
        LinkStats {
            sent: self.tx.completed(),
            queued: self.queue.len(),
            dropped: self.dropped,
        }
    }
}

impl<P: UartPort> SerialLink for BleLink<P> {
    fn send(&mut self, system: &System, message: &str) -> Result<()> {
        BleLink::send(self, system, message)
    }

    fn on_tx_done(&mut self, system: &System) -> Result<()> {
        BleLink::on_tx_done(self, system)
    }

    fn stats(&self) -> LinkStats {
        BleLink::stats(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::leuart::TxCause;
    use crate::error::Error;

    #[derive(Default)]
    struct Wire {
        out: std::vec::Vec<u8>,
    }

    impl UartPort for Wire {
        fn open(&mut self, _config: &SerialConfig) {}
        fn write_byte(&mut self, byte: u8) {
            self.out.push(byte);
        }
        fn set_tx_buffer_irq(&mut self, _enabled: bool) {}
        fn set_tx_complete_irq(&mut self, _enabled: bool) {}
    }

    /// Clock one message fully out of the transmitter.
    fn drain(link: &mut BleLink<Wire>, sys: &System) {
        while link.tx().is_busy() {
            let cause = if link.tx().state() == crate::drivers::leuart::TxState::EndTransfer {
                TxCause::TxComplete
            } else {
                TxCause::TxBufferLevel
            };
            link.on_interrupt(sys, cause.into()).unwrap();
        }
    }

    #[test]
    fn queued_message_follows_on_tx_done() {
        let sys = System::new();
        let mut link = BleLink::open(Wire::default(), &SerialConfig::default());
        link.send(&sys, "one\n").unwrap();
        link.send(&sys, "two\n").unwrap();
        assert_eq!(link.stats().queued, 1);

        drain(&mut link, &sys);
        link.on_tx_done(&sys).unwrap();
        drain(&mut link, &sys);

        assert_eq!(link.tx().port().out, b"one\ntwo\n");
        assert_eq!(link.stats(), LinkStats { sent: 2, queued: 0, dropped: 0 });
    }

    #[test]
    fn send_before_tx_done_keeps_queue_order() {
        let sys = System::new();
        let mut link = BleLink::open(Wire::default(), &SerialConfig::default());
        link.send(&sys, "A").unwrap();
        link.send(&sys, "B").unwrap();
        drain(&mut link, &sys);

        // a reading handler runs before BLE_TX_DONE in the same pass
        link.send(&sys, "C").unwrap();
        assert!(link.tx().is_busy());
        assert_eq!(link.tx().port().out, b"A");
        assert_eq!(link.stats().queued, 1);

        link.on_tx_done(&sys).unwrap();
        drain(&mut link, &sys);
        link.on_tx_done(&sys).unwrap();
        drain(&mut link, &sys);

        assert_eq!(link.tx().port().out, b"ABC");
        assert_eq!(link.stats(), LinkStats { sent: 3, queued: 0, dropped: 0 });
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let sys = System::new();
        let mut link = BleLink::open(Wire::default(), &SerialConfig::default());
        link.send(&sys, "busy").unwrap();
        for _ in 0..QUEUE_DEPTH {
            link.send(&sys, "q").unwrap();
        }
        assert_eq!(link.send(&sys, "x"), Err(Error::Serial(SerialError::QueueFull)));
        assert_eq!(link.stats().dropped, 1);
    }

    #[test]
    fn format_message_rejects_overflow() {
        assert_eq!(format_message(format_args!("{} lux", 12)).unwrap().as_str(), "12 lux");
        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(format_message(format_args!("{long}")).is_err());
    }
}
