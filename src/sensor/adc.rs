//! Sensors hanging off the external ADS1115: a plain voltmeter and two
//! calibrated sensors built on the same input.

use super::{Divider, LinearMap, Sensor};
use crate::hal::Adc;
use crate::Result;

pub const VOLTMETER_LABEL: &str = "Voltage[ADS]";
pub const LIGHT_LABEL: &str = "Light (%)";
pub const ANEMOMETER_LABEL: &str = "Wind Speed";

/// Phototransistor output, 0.01..3.3 V onto 0..100 % of its range.
pub const LIGHT_MAP: LinearMap = LinearMap {
    in_min: 0.01,
    in_max: 3.3,
    out_min: 0.0,
    out_max: 100.0,
    clamp: true,
};

/// Cup anemometer on a 9 V supply, 0.4..2.0 V onto 0..32.4 m/s.
pub const ANEMOMETER_MAP: LinearMap = LinearMap {
    in_min: 0.4,
    in_max: 2.0,
    out_min: 0.0,
    out_max: 32.4,
    clamp: false,
};

/// One single-ended input of the ADC.
pub struct AdcInput {
    adc: Box<dyn Adc>,
    pin: u8,
}

impl AdcInput {
    pub fn new(adc: Box<dyn Adc>, pin: u8) -> Self {
        Self { adc, pin }
    }

    pub fn begin(&mut self) -> Result<()> {
        self.adc.begin()
    }

    pub fn vout(&mut self) -> Result<f64> {
        self.adc.read_volts(self.pin)
    }
}

pub struct AdcVoltmeter {
    input: AdcInput,
    divider: Divider,
    labels: Vec<String>,
}

impl AdcVoltmeter {
    pub fn new(input: AdcInput, divider: Divider) -> Self {
        Self {
            input,
            divider,
            labels: vec![VOLTMETER_LABEL.to_string()],
        }
    }
}

impl Sensor for AdcVoltmeter {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn init(&mut self) -> Result<()> {
        self.input.begin()
    }

    fn read(&mut self, _channel: u8) -> f64 {
        self.input
            .vout()
            .map(|v| self.divider.vin(v))
            .unwrap_or(f64::NAN)
    }
}

/// ADC input passed through a fixed calibration line.
pub struct CalibratedInput {
    input: AdcInput,
    map: LinearMap,
    labels: Vec<String>,
}

impl CalibratedInput {
    pub fn light(input: AdcInput) -> Self {
        Self::new(input, LIGHT_MAP, LIGHT_LABEL)
    }

    pub fn anemometer(input: AdcInput) -> Self {
        Self::new(input, ANEMOMETER_MAP, ANEMOMETER_LABEL)
    }

    fn new(input: AdcInput, map: LinearMap, label: &str) -> Self {
        Self {
            input,
            map,
            labels: vec![label.to_string()],
        }
    }
}

impl Sensor for CalibratedInput {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn init(&mut self) -> Result<()> {
        self.input.begin()
    }

    fn read(&mut self, _channel: u8) -> f64 {
        self.input
            .vout()
            .map(|v| self.map.apply(v))
            .unwrap_or(f64::NAN)
    }
}
