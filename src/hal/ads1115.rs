//! ADS1115 single-shot driver (gain ±4.096 V, 128 SPS).

use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;

use super::registers::I2cRegisters;
use super::Adc;
use crate::{Error, Result};

pub const DEFAULT_ADDR: u8 = 0x48;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

const OS_SINGLE: u16 = 0x8000;
const PGA_4_096V: u16 = 0x0200;
const MODE_SINGLE_SHOT: u16 = 0x0100;
const DR_128SPS: u16 = 0x0080;
const COMP_DISABLE: u16 = 0x0003;

const FULL_SCALE_VOLTS: f64 = 4.096;
const CONVERSION_POLLS: u32 = 10;
const CONVERSION_WAIT: Duration = Duration::from_millis(9);

pub struct Ads1115<I2C> {
    regs: I2cRegisters<I2C>,
    conversion_wait: Duration,
}

impl<I2C: I2c> Ads1115<I2C> {
    pub fn new(bus: I2C, addr: u8) -> Self {
        Self {
            regs: I2cRegisters::new(bus, addr, "ads1115"),
            conversion_wait: CONVERSION_WAIT,
        }
    }

    #[cfg(test)]
    fn without_wait(mut self) -> Self {
        self.conversion_wait = Duration::ZERO;
        self
    }

    fn config_word(pin: u8) -> u16 {
        let mux = (4 + u16::from(pin)) << 12;
        OS_SINGLE | mux | PGA_4_096V | MODE_SINGLE_SHOT | DR_128SPS | COMP_DISABLE
    }
}

impl<I2C: I2c> Adc for Ads1115<I2C> {
    fn begin(&mut self) -> Result<()> {
        self.regs.read_u16(REG_CONFIG).map(|_| ())
    }

    fn read_volts(&mut self, pin: u8) -> Result<f64> {
        if pin > 3 {
            return Err(Error::Hardware(format!("ads1115 has no input A{pin}")));
        }
        self.regs.write_u16(REG_CONFIG, Self::config_word(pin))?;
        for _ in 0..CONVERSION_POLLS {
            thread::sleep(self.conversion_wait);
            // OS bit reads back as 1 once the device is idle again.
            if self.regs.read_u16(REG_CONFIG)? & OS_SINGLE != 0 {
                let raw = self.regs.read_i16(REG_CONVERSION)?;
                return Ok(f64::from(raw) * FULL_SCALE_VOLTS / 32768.0);
            }
        }
        Err(Error::Hardware(format!(
            "ads1115@0x{:02x}: conversion did not complete",
            self.regs.addr()
        )))
    }
}
