//! BME280 pressure/humidity/temperature.
//!
//! Enabled channels always appear in pressure, humidity, temperature order;
//! an enabled set that skips an earlier channel is rejected up front instead
//! of silently shifting columns.

use std::fmt;
use std::str::FromStr;

use super::{celsius_to_fahrenheit, Sensor};
use crate::hal::{AtmosphericSample, Barometer};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bme280Channel {
    Pressure,
    Humidity,
    Temperature,
}

impl Bme280Channel {
    const ORDER: [Bme280Channel; 3] = [
        Bme280Channel::Pressure,
        Bme280Channel::Humidity,
        Bme280Channel::Temperature,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Bme280Channel::Pressure => "BME280 P(hPa)",
            Bme280Channel::Humidity => "BME280 RH(%)",
            Bme280Channel::Temperature => "BME280 Temp(F)",
        }
    }

    fn pick(self, sample: &AtmosphericSample) -> f64 {
        match self {
            Bme280Channel::Pressure => sample.pressure_pa / 100.0,
            Bme280Channel::Humidity => sample.humidity_pct,
            Bme280Channel::Temperature => celsius_to_fahrenheit(sample.temperature_c),
        }
    }
}

impl FromStr for Bme280Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pressure" | "p" => Ok(Bme280Channel::Pressure),
            "humidity" | "rh" => Ok(Bme280Channel::Humidity),
            "temperature" | "temp" | "t" => Ok(Bme280Channel::Temperature),
            other => Err(Error::InvalidArgs(format!(
                "unknown bme280 channel '{other}' (expected pressure, humidity or temperature)"
            ))),
        }
    }
}

impl fmt::Display for Bme280Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bme280Channel::Pressure => "pressure",
            Bme280Channel::Humidity => "humidity",
            Bme280Channel::Temperature => "temperature",
        };
        f.write_str(name)
    }
}

/// Validated non-empty prefix of pressure, humidity, temperature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bme280Channels(Vec<Bme280Channel>);

impl Bme280Channels {
    pub fn all() -> Self {
        Self(Bme280Channel::ORDER.to_vec())
    }

    pub fn new(channels: Vec<Bme280Channel>) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::InvalidArgs(
                "bme280_channels must enable at least one channel".into(),
            ));
        }
        let is_prefix = channels.len() <= Bme280Channel::ORDER.len()
            && channels
                .iter()
                .zip(Bme280Channel::ORDER.iter())
                .all(|(got, want)| got == want);
        if !is_prefix {
            let names: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
            return Err(Error::InvalidArgs(format!(
                "bme280_channels [{}] must be a prefix of [pressure, humidity, temperature]",
                names.join(", ")
            )));
        }
        Ok(Self(channels))
    }

    pub fn as_slice(&self) -> &[Bme280Channel] {
        &self.0
    }
}

impl Default for Bme280Channels {
    fn default() -> Self {
        Self::all()
    }
}

pub struct Bme280 {
    chip: Box<dyn Barometer>,
    channels: Bme280Channels,
    labels: Vec<String>,
    sample: Option<AtmosphericSample>,
}

impl Bme280 {
    pub fn new(chip: Box<dyn Barometer>, channels: Bme280Channels) -> Self {
        let labels = channels
            .as_slice()
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        Self {
            chip,
            channels,
            labels,
            sample: None,
        }
    }
}

impl Sensor for Bme280 {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn init(&mut self) -> Result<()> {
        self.chip.begin()
    }

    fn read(&mut self, channel: u8) -> f64 {
        if channel == 0 {
            self.sample = self.chip.measure().ok();
        }
        match (self.sample, self.channels.as_slice().get(usize::from(channel))) {
            (Some(sample), Some(which)) => which.pick(&sample),
            _ => f64::NAN,
        }
    }
}
