//! INA219 driver using the 32 V / 2 A calibration.

use embedded_hal::i2c::I2c;

use super::registers::I2cRegisters;
use super::PowerMonitor;
use crate::Result;

const REG_CONFIG: u8 = 0x00;
const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;
const REG_CALIBRATION: u8 = 0x05;

const CALIBRATION_32V_2A: u16 = 4096;
/// 32 V range, /8 gain, 12-bit bus and shunt, continuous shunt+bus.
const CONFIG_32V_2A: u16 = 0x399F;
const POWER_LSB_MW: f64 = 2.0;

pub struct Ina219<I2C> {
    regs: I2cRegisters<I2C>,
}

impl<I2C: I2c> Ina219<I2C> {
    pub fn new(bus: I2C, addr: u8) -> Self {
        Self {
            regs: I2cRegisters::new(bus, addr, "ina219"),
        }
    }

    fn calibrate(&mut self) -> Result<()> {
        self.regs.write_u16(REG_CALIBRATION, CALIBRATION_32V_2A)
    }
}

impl<I2C: I2c> PowerMonitor for Ina219<I2C> {
    fn begin(&mut self) -> Result<()> {
        self.calibrate()?;
        self.regs.write_u16(REG_CONFIG, CONFIG_32V_2A)
    }

    fn power_mw(&mut self) -> Result<f64> {
        // The chip can drop its calibration on a brown-out; rewrite before reading.
        self.calibrate()?;
        let raw = self.regs.read_u16(REG_POWER)?;
        Ok(f64::from(raw) * POWER_LSB_MW)
    }

    fn bus_voltage_v(&mut self) -> Result<f64> {
        let raw = self.regs.read_u16(REG_BUS_VOLTAGE)?;
        Ok(f64::from(raw >> 3) * 4.0 / 1000.0)
    }

    fn shunt_voltage_mv(&mut self) -> Result<f64> {
        let raw = self.regs.read_i16(REG_SHUNT_VOLTAGE)?;
        Ok(f64::from(raw) * 0.01)
    }
}
