//! PCF8574 I/O expander used as the LCD backpack.

use embedded_hal::i2c::I2c;

use crate::{Error, Result};

pub const DEFAULT_ADDR: u8 = 0x27;
/// Usual backpack jumper range, most common first.
pub const CANDIDATE_ADDRS: [u8; 8] = [0x27, 0x26, 0x25, 0x24, 0x23, 0x22, 0x21, 0x20];

pub struct Pcf8574<I2C> {
    bus: I2C,
    addr: u8,
}

impl<I2C: I2c> Pcf8574<I2C> {
    pub fn new(bus: I2C, addr: u8) -> Self {
        Self { bus, addr }
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// Drives all eight expander pins at once.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.bus
            .write(self.addr, &[byte])
            .map_err(|e| Error::Hardware(format!("pcf8574@0x{:02x}: {e:?}", self.addr)))
    }

    #[cfg(test)]
    pub fn bus(&self) -> &I2C {
        &self.bus
    }
}

/// First candidate that acknowledges a write, if any.
pub fn detect_address<I2C: I2c>(bus: &mut I2C, candidates: &[u8]) -> Option<u8> {
    candidates
        .iter()
        .copied()
        .find(|&addr| bus.write(addr, &[0]).is_ok())
}
