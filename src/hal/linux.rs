//! Raspberry Pi wiring: rppal I2C for the register drivers, sysfs for the rest.

use std::path::PathBuf;

use rppal::i2c::I2c;

use super::ads1115::{self, Ads1115};
use super::ina219::Ina219;
use super::sysfs::{IioAnalogPin, IioBarometer, W1Bus};
use super::{Adc, AnalogPin, Barometer, Hardware, OneWireBus, PowerMonitor, Unavailable};

pub struct PiHardware {
    i2c_bus: u8,
    iio_root: PathBuf,
    w1_root: PathBuf,
}

impl PiHardware {
    pub fn new(i2c_bus: u8, iio_root: impl Into<PathBuf>, w1_root: impl Into<PathBuf>) -> Self {
        Self {
            i2c_bus,
            iio_root: iio_root.into(),
            w1_root: w1_root.into(),
        }
    }

    fn open_bus(&self) -> Result<I2c, Unavailable> {
        I2c::with_bus(self.i2c_bus)
            .map_err(|e| Unavailable::new(format!("/dev/i2c-{}: {e}", self.i2c_bus)))
    }
}

impl Hardware for PiHardware {
    fn analog_pin(&mut self, pin: u8) -> Box<dyn AnalogPin> {
        Box::new(IioAnalogPin::new(&self.iio_root, pin))
    }

    fn adc(&mut self) -> Box<dyn Adc> {
        match self.open_bus() {
            Ok(bus) => Box::new(Ads1115::new(bus, ads1115::DEFAULT_ADDR)),
            Err(dead) => Box::new(dead),
        }
    }

    fn barometer(&mut self) -> Box<dyn Barometer> {
        Box::new(IioBarometer::new(&self.iio_root))
    }

    // The data GPIO is fixed by the w1-gpio overlay, not selectable at runtime.
    fn one_wire(&mut self, _pin: u8) -> Box<dyn OneWireBus> {
        Box::new(W1Bus::new(&self.w1_root))
    }

    fn power_monitor(&mut self, addr: u8) -> Box<dyn PowerMonitor> {
        match self.open_bus() {
            Ok(bus) => Box::new(Ina219::new(bus, addr)),
            Err(dead) => Box::new(dead),
        }
    }
}
