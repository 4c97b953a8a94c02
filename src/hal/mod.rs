//! Hardware boundary for the sensor layer.
//!
//! Each chip family the logger knows about is reached through one small trait.
//! Concrete backends live in the submodules: register drivers over
//! `embedded_hal::i2c::I2c`, Linux sysfs readers, and a simulated bench.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

pub mod ads1115;
pub mod ina219;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod registers;
pub mod sim;
pub mod sysfs;

/// Raw analog input on the board itself (10-bit style counts).
pub trait AnalogPin {
    fn read_raw(&mut self) -> Result<u16>;

    /// Count reported at the reference voltage.
    fn full_scale(&self) -> u16 {
        1023
    }

    fn reference_volts(&self) -> f64 {
        3.3
    }
}

/// Single-ended delta-sigma ADC (ADS1115 class).
pub trait Adc {
    fn begin(&mut self) -> Result<()>;
    fn read_volts(&mut self, pin: u8) -> Result<f64>;
}

/// One forced BME280 measurement, already in SI-ish units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericSample {
    pub pressure_pa: f64,
    pub humidity_pct: f64,
    pub temperature_c: f64,
}

/// Combined pressure/humidity/temperature chip.
pub trait Barometer {
    fn begin(&mut self) -> Result<()>;
    fn measure(&mut self) -> Result<AtmosphericSample>;
}

/// Multi-drop temperature bus. `request_temperatures` starts one conversion
/// covering every probe on the bus.
pub trait OneWireBus {
    fn begin(&mut self) -> Result<()>;
    fn request_temperatures(&mut self) -> Result<()>;
    fn temperature_c(&mut self, rom: &RomCode) -> Result<f64>;
}

/// High-side current/voltage/power monitor (INA219 class).
pub trait PowerMonitor {
    fn begin(&mut self) -> Result<()>;
    fn power_mw(&mut self) -> Result<f64>;
    fn bus_voltage_v(&mut self) -> Result<f64>;
    fn shunt_voltage_mv(&mut self) -> Result<f64>;
}

/// Factory for the chip backends the registry wires into sensor handles.
pub trait Hardware {
    fn analog_pin(&mut self, pin: u8) -> Box<dyn AnalogPin>;
    fn adc(&mut self) -> Box<dyn Adc>;
    fn barometer(&mut self) -> Box<dyn Barometer>;
    fn one_wire(&mut self, pin: u8) -> Box<dyn OneWireBus>;
    fn power_monitor(&mut self, addr: u8) -> Box<dyn PowerMonitor>;
}

/// 64-bit one-wire ROM code: family byte, 48-bit serial (LSB first), CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RomCode(pub [u8; 8]);

impl RomCode {
    pub fn family(&self) -> u8 {
        self.0[0]
    }

    /// Directory name used by the Linux `w1` subsystem, e.g. `28-3cebf649a0dc`.
    pub fn w1_name(&self) -> String {
        let serial: String = self.0[1..7]
            .iter()
            .rev()
            .map(|b| format!("{b:02x}"))
            .collect();
        format!("{:02x}-{serial}", self.family())
    }
}

impl FromStr for RomCode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | ' ' | ','))
            .collect::<String>()
            .replace("0x", "")
            .replace("0X", "");
        if cleaned.len() != 16 || !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("expected 16 hex digits for a ROM code, got '{s}'"));
        }
        let mut bytes = [0u8; 8];
        for (idx, byte) in bytes.iter_mut().enumerate() {
            let pair = &cleaned[idx * 2..idx * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|e| e.to_string())?;
        }
        Ok(RomCode(bytes))
    }
}

impl fmt::Display for RomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// Backend that never comes up; used when a bus cannot be opened at all so the
/// sensor still exists in the schema and simply reports disabled.
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn err<T>(&self) -> Result<T> {
        Err(Error::Hardware(self.reason.clone()))
    }
}

impl AnalogPin for Unavailable {
    fn read_raw(&mut self) -> Result<u16> {
        self.err()
    }
}

impl Adc for Unavailable {
    fn begin(&mut self) -> Result<()> {
        self.err()
    }

    fn read_volts(&mut self, _pin: u8) -> Result<f64> {
        self.err()
    }
}

impl Barometer for Unavailable {
    fn begin(&mut self) -> Result<()> {
        self.err()
    }

    fn measure(&mut self) -> Result<AtmosphericSample> {
        self.err()
    }
}

impl OneWireBus for Unavailable {
    fn begin(&mut self) -> Result<()> {
        self.err()
    }

    fn request_temperatures(&mut self) -> Result<()> {
        self.err()
    }

    fn temperature_c(&mut self, _rom: &RomCode) -> Result<f64> {
        self.err()
    }
}

impl PowerMonitor for Unavailable {
    fn begin(&mut self) -> Result<()> {
        self.err()
    }

    fn power_mw(&mut self) -> Result<f64> {
        self.err()
    }

    fn bus_voltage_v(&mut self) -> Result<f64> {
        self.err()
    }

    fn shunt_voltage_mv(&mut self) -> Result<f64> {
        self.err()
    }
}
