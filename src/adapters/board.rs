//! Board bring-up: clock tree, sensor power pin, NVIC.
//!
//! Runs once from `main` before any driver is opened.  Clock sources:
//!
//! | Branch   | Source  | Feeds            |
//! |----------|---------|------------------|
//! | HFPERCLK | HFRCO   | I2C0, I2C1       |
//! | LFA      | ULFRCO  | LETIMER0         |
//! | LFB      | LFXO    | LEUART0          |

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use log::info;

use crate::pins;

use super::mmio::Block;

/// HFRCO default band.
pub const HFPERCLK_HZ: u32 = 19_000_000;
pub const CPU_HZ: u32 = HFPERCLK_HZ;
/// LFXO crystal.
pub const LFBCLK_HZ: u32 = 32_768;

const CMU: Block = Block::at(0x400E_4000);
const GPIO: Block = Block::at(0x4000_A000);

const CMU_OSCENCMD: usize = 0x060;
const CMU_LFACLKSEL: usize = 0x080;
const CMU_LFBCLKSEL: usize = 0x084;
const CMU_STATUS: usize = 0x090;
const CMU_HFBUSCLKEN0: usize = 0x0B0;
const CMU_HFPERCLKEN0: usize = 0x0C0;
const CMU_LFACLKEN0: usize = 0x0E0;
const CMU_LFBCLKEN0: usize = 0x0E8;

const OSCENCMD_LFRCODIS: u32 = 1 << 7;
const OSCENCMD_LFXOEN: u32 = 1 << 8;
const OSCENCMD_LFXODIS: u32 = 1 << 9;
const STATUS_LFXORDY: u32 = 1 << 9;

const LFACLKSEL_ULFRCO: u32 = 4;
const LFBCLKSEL_LFXO: u32 = 2;

const HFBUSCLKEN0_LE: u32 = 1 << 0;
const HFBUSCLKEN0_GPIO: u32 = 1 << 3;
const HFPERCLKEN0_I2C0: u32 = 1 << 8;
const HFPERCLKEN0_I2C1: u32 = 1 << 9;
const LFACLKEN0_LETIMER0: u32 = 1 << 0;
const LFBCLKEN0_LEUART0: u32 = 1 << 0;

const GPIO_PORT_STRIDE: usize = 0x30;
const GPIO_MODEL: usize = 0x04;
const GPIO_MODEH: usize = 0x08;
const GPIO_DOUT: usize = 0x0C;
const GPIO_MODE_PUSHPULL: u32 = 4;

/// One NVIC line, numbered as in [`pins`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Irq(pub u16);

// SAFETY: every `Irq` handed to the NVIC is one of the device interrupt
// numbers listed in `pins`.
unsafe impl InterruptNumber for Irq {
    fn number(self) -> u16 {
        self.0
    }
}

pub const NODE_IRQS: [Irq; 4] = [
    Irq(pins::IRQ_I2C0),
    Irq(pins::IRQ_I2C1),
    Irq(pins::IRQ_LEUART0),
    Irq(pins::IRQ_LETIMER0),
];

/// Enable the clock branches every driver needs and power the SI7021.
pub fn init() {
    CMU.set_bits(CMU_HFBUSCLKEN0, HFBUSCLKEN0_LE | HFBUSCLKEN0_GPIO);
    CMU.set_bits(CMU_HFPERCLKEN0, HFPERCLKEN0_I2C0 | HFPERCLKEN0_I2C1);

    lf_oscillators(true);
    CMU.write(CMU_LFACLKSEL, LFACLKSEL_ULFRCO);
    CMU.write(CMU_LFBCLKSEL, LFBCLKSEL_LFXO);
    CMU.set_bits(CMU_LFACLKEN0, LFACLKEN0_LETIMER0);
    CMU.set_bits(CMU_LFBCLKEN0, LFBCLKEN0_LEUART0);

    gpio_push_pull_high(pins::SI7021_ENABLE_PORT, pins::SI7021_ENABLE_PIN);
    info!("board: clocks up, sensor power on");
}

/// Start or stop the LFXO (and make sure the LFRCO stays off).
///
/// EM3 is EM2 with only the ULFRCO running; the sleep adapter turns the
/// crystal off around a stop-mode `WFI`.
pub fn lf_oscillators(enable: bool) {
    if enable {
        CMU.write(CMU_OSCENCMD, OSCENCMD_LFXOEN);
        while CMU.read(CMU_STATUS) & STATUS_LFXORDY == 0 {}
    } else {
        CMU.write(CMU_OSCENCMD, OSCENCMD_LFXODIS | OSCENCMD_LFRCODIS);
    }
}

/// Unmask the peripheral interrupts once every driver slot is filled.
pub fn unmask(irqs: &[Irq]) {
    for &irq in irqs {
        NVIC::unpend(irq);
        // SAFETY: handlers for these lines only touch state behind
        // critical sections, and the slots they use are already populated.
        unsafe { NVIC::unmask(irq) };
    }
}

fn gpio_push_pull_high(port: u8, pin: u8) {
    let base = GPIO_PORT_STRIDE * usize::from(port);
    let (mode_reg, shift) = if pin < 8 {
        (GPIO_MODEL, u32::from(pin) * 4)
    } else {
        (GPIO_MODEH, u32::from(pin - 8) * 4)
    };
    GPIO.modify(base + mode_reg, |v| (v & !(0xF << shift)) | (GPIO_MODE_PUSHPULL << shift));
    GPIO.set_bits(base + GPIO_DOUT, 1 << pin);
}
