//! Turns the configured descriptor table into live sensor handles.

use std::fmt;
use std::str::FromStr;

use crate::hal::Hardware;
use crate::sensor::adc::{AdcInput, AdcVoltmeter, CalibratedInput};
use crate::sensor::bme280::{Bme280, Bme280Channels};
use crate::sensor::ds18b20::Ds18b20;
use crate::sensor::ina219::Ina219Sensor;
use crate::sensor::voltmeter::Voltmeter;
use crate::sensor::{Divider, Sensor, SensorHandle};
use crate::{Error, Result};

pub use crate::sensor::ds18b20::ProbeEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorKind {
    Voltmeter,
    Ads1115,
    Light,
    Anemometer,
    Bme280,
    Ds18b20,
    Ina219,
    /// Anything else in the table. Kept so the entry can be reported, then skipped.
    Other(String),
}

impl SensorKind {
    fn name(&self) -> &str {
        match self {
            SensorKind::Voltmeter => "voltmeter",
            SensorKind::Ads1115 => "ads1115",
            SensorKind::Light => "light",
            SensorKind::Anemometer => "anemometer",
            SensorKind::Bme280 => "bme280",
            SensorKind::Ds18b20 => "ds18b20",
            SensorKind::Ina219 => "ina219",
            SensorKind::Other(name) => name,
        }
    }

    fn address_is_hex(&self) -> bool {
        matches!(self, SensorKind::Ina219 | SensorKind::Bme280)
    }
}

impl From<&str> for SensorKind {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "voltmeter" => SensorKind::Voltmeter,
            "ads1115" => SensorKind::Ads1115,
            "light" | "ads1115phototransistor" => SensorKind::Light,
            "anemometer" | "ads1115anemometer" => SensorKind::Anemometer,
            "bme280" => SensorKind::Bme280,
            "ds18b20" => SensorKind::Ds18b20,
            "ina219" => SensorKind::Ina219,
            other => SensorKind::Other(other.to_string()),
        }
    }
}

/// One physical sensor from the config table: `kind[:address_or_pin]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub kind: SensorKind,
    pub address_or_pin: u8,
}

impl SensorDescriptor {
    pub fn new(kind: SensorKind, address_or_pin: u8) -> Self {
        Self {
            kind,
            address_or_pin,
        }
    }
}

impl FromStr for SensorDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg.trim())),
            None => (s, None),
        };
        let kind = SensorKind::from(kind);
        let address_or_pin = match arg {
            None | Some("") => 0,
            Some(arg) => parse_u8(arg)
                .ok_or_else(|| Error::InvalidArgs(format!("sensor '{s}': bad pin/address '{arg}'")))?,
        };
        Ok(Self::new(kind, address_or_pin))
    }
}

impl fmt::Display for SensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, self.address_or_pin) {
            (SensorKind::Bme280, 0) => write!(f, "bme280"),
            (kind, addr) if kind.address_is_hex() => write!(f, "{}:0x{addr:02x}", kind.name()),
            (kind, pin) => write!(f, "{}:{pin}", kind.name()),
        }
    }
}

fn parse_u8(text: &str) -> Option<u8> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Everything the builder needs besides the hardware itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSettings {
    pub descriptors: Vec<SensorDescriptor>,
    pub probes: Vec<ProbeEntry>,
    pub bme280_channels: Bme280Channels,
    pub voltmeter_scale: f64,
    pub adc_divider: Divider,
}

/// Handles in configuration order; this order is the column order.
#[derive(Default)]
pub struct Registry {
    handles: Vec<SensorHandle>,
    skipped: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: SensorHandle) {
        self.handles.push(handle);
    }

    pub fn handles(&self) -> &[SensorHandle] {
        &self.handles
    }

    pub fn handles_mut(&mut self) -> &mut [SensorHandle] {
        &mut self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Descriptor kinds the builder did not recognise.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

pub fn build_registry(settings: &SensorSettings, hardware: &mut dyn Hardware) -> Result<Registry> {
    let mut registry = Registry::new();
    for descriptor in &settings.descriptors {
        let pin = descriptor.address_or_pin;
        let sensor: Box<dyn Sensor> = match &descriptor.kind {
            SensorKind::Voltmeter => Box::new(Voltmeter::new(
                hardware.analog_pin(pin),
                settings.voltmeter_scale,
                Divider::NONE,
            )),
            SensorKind::Ads1115 => Box::new(AdcVoltmeter::new(
                AdcInput::new(hardware.adc(), pin),
                settings.adc_divider,
            )),
            SensorKind::Light => Box::new(CalibratedInput::light(AdcInput::new(hardware.adc(), pin))),
            SensorKind::Anemometer => Box::new(CalibratedInput::anemometer(AdcInput::new(
                hardware.adc(),
                pin,
            ))),
            SensorKind::Bme280 => Box::new(Bme280::new(
                hardware.barometer(),
                settings.bme280_channels.clone(),
            )),
            SensorKind::Ds18b20 => Box::new(Ds18b20::new(hardware.one_wire(pin), &settings.probes)?),
            SensorKind::Ina219 => Box::new(Ina219Sensor::new(hardware.power_monitor(pin), pin)),
            SensorKind::Other(name) => {
                registry.skipped.push(name.clone());
                continue;
            }
        };
        registry.push(SensorHandle::new(sensor)?);
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimulatedHardware;

    fn settings(descriptors: &[&str]) -> SensorSettings {
        SensorSettings {
            descriptors: descriptors.iter().map(|d| d.parse().unwrap()).collect(),
            probes: vec![
                "28DCA049F6EB3CF0=Batt".parse().unwrap(),
                "286A6449F6BE3CF0=MCU".parse().unwrap(),
            ],
            bme280_channels: Bme280Channels::all(),
            voltmeter_scale: 2.0,
            adc_divider: Divider::NONE,
        }
    }

    #[test]
    fn parses_descriptors() {
        let ina: SensorDescriptor = "ina219:0x41".parse().unwrap();
        assert_eq!(ina, SensorDescriptor::new(SensorKind::Ina219, 0x41));
        let ds: SensorDescriptor = "ds18b20:10".parse().unwrap();
        assert_eq!(ds, SensorDescriptor::new(SensorKind::Ds18b20, 10));
        let bme: SensorDescriptor = "bme280".parse().unwrap();
        assert_eq!(bme.address_or_pin, 0);
        assert!("ina219:0xZZ".parse::<SensorDescriptor>().is_err());
        assert_eq!(ina.to_string(), "ina219:0x41");
        assert_eq!(ds.to_string(), "ds18b20:10");
        assert_eq!(bme.to_string(), "bme280");
    }

    #[test]
    fn builds_handles_in_descriptor_order() {
        let mut hw = SimulatedHardware::new();
        let registry = build_registry(
            &settings(&["ina219:0x40", "bme280", "ds18b20:10", "light:0", "anemometer:1"]),
            &mut hw,
        )
        .unwrap();
        let labels: Vec<String> = registry.handles().iter().map(|h| h.combined_label()).collect();
        assert_eq!(
            labels,
            [
                "Power(mW)[0x40], Voltage[0x40]",
                "BME280 P(hPa), BME280 RH(%), BME280 Temp(F)",
                "DS18 Temp(F)[Batt], DS18 Temp(F)[MCU]",
                "Light (%)",
                "Wind Speed",
            ]
        );
    }

    #[test]
    fn unknown_kinds_are_skipped() {
        let mut hw = SimulatedHardware::new();
        let registry =
            build_registry(&settings(&["dht22:4", "voltmeter:0", "sht31"]), &mut hw).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.skipped(), ["dht22", "sht31"]);
    }

    #[test]
    fn duplicate_descriptors_are_kept() {
        let mut hw = SimulatedHardware::new();
        let registry =
            build_registry(&settings(&["ina219:0x40", "ina219:0x40"]), &mut hw).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn one_wire_without_probes_is_rejected() {
        let mut hw = SimulatedHardware::new();
        let mut cfg = settings(&["ds18b20:10"]);
        cfg.probes.clear();
        assert!(build_registry(&cfg, &mut hw).is_err());
    }
}
