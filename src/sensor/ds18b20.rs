//! DS18B20 probes sharing one one-wire bus.

use std::str::FromStr;

use super::{celsius_to_fahrenheit, Sensor};
use crate::hal::{OneWireBus, RomCode};
use crate::{Error, Result};

pub const MAX_PROBES: usize = 5;

/// One row of the probe table: ROM code plus the name used in labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEntry {
    pub rom: RomCode,
    pub label: String,
}

impl ProbeEntry {
    pub fn new(rom: RomCode, label: impl Into<String>) -> Self {
        Self {
            rom,
            label: label.into(),
        }
    }

    pub fn channel_label(&self) -> String {
        format!("DS18 Temp(F)[{}]", self.label)
    }
}

/// Parses `<romhex>=<label>`.
impl FromStr for ProbeEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (rom, label) = s
            .split_once('=')
            .ok_or_else(|| Error::InvalidArgs(format!("probe '{s}' must look like <rom>=<label>")))?;
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidArgs(format!("probe '{s}' has an empty label")));
        }
        let rom = rom.parse::<RomCode>().map_err(Error::InvalidArgs)?;
        Ok(Self::new(rom, label))
    }
}

pub struct Ds18b20 {
    bus: Box<dyn OneWireBus>,
    probes: Vec<ProbeEntry>,
    labels: Vec<String>,
}

impl Ds18b20 {
    pub fn new(bus: Box<dyn OneWireBus>, probes: &[ProbeEntry]) -> Result<Self> {
        if probes.is_empty() {
            return Err(Error::InvalidArgs(
                "ds18b20 needs at least one entry in `probes`".into(),
            ));
        }
        if probes.len() > MAX_PROBES {
            return Err(Error::InvalidArgs(format!(
                "at most {MAX_PROBES} ds18b20 probes are supported, got {}",
                probes.len()
            )));
        }
        let labels = probes.iter().map(ProbeEntry::channel_label).collect();
        Ok(Self {
            bus,
            probes: probes.to_vec(),
            labels,
        })
    }
}

impl Sensor for Ds18b20 {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn init(&mut self) -> Result<()> {
        self.bus.begin()
    }

    fn read(&mut self, channel: u8) -> f64 {
        // One bus-wide conversion per cycle; later channels reuse it.
        if channel == 0 && self.bus.request_temperatures().is_err() {
            return f64::NAN;
        }
        let Some(probe) = self.probes.get(usize::from(channel)) else {
            return f64::NAN;
        };
        self.bus
            .temperature_c(&probe.rom)
            .map(celsius_to_fahrenheit)
            .unwrap_or(f64::NAN)
    }
}
