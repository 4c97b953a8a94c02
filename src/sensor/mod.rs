//! Uniform sensor capability and the handle that gates it.
//!
//! A [`Sensor`] knows how to talk to one physical device and exposes one or
//! more channels. The registry never calls it directly: every sensor is
//! wrapped in a [`SensorHandle`], which owns the `disabled` flag, the channel
//! labels and the last value seen on each channel.

use crate::{Error, Result};

pub mod adc;
pub mod bme280;
pub mod ds18b20;
pub mod ina219;
pub mod voltmeter;

pub const MAX_CHANNELS: usize = 10;

pub trait Sensor {
    /// One label per channel, fixed once the sensor is constructed.
    fn labels(&self) -> &[String];

    /// One-time hardware bring-up. An error disables the handle for good.
    fn init(&mut self) -> Result<()>;

    /// Value for `channel`, or NaN when the hardware cannot answer.
    ///
    /// Sensors that share one physical conversion across channels start it
    /// on channel 0 and serve the remaining channels from that result.
    fn read(&mut self, channel: u8) -> f64;
}

pub struct SensorHandle {
    sensor: Box<dyn Sensor>,
    disabled: bool,
    labels: Vec<String>,
    last_reading: Vec<f64>,
}

impl SensorHandle {
    pub fn new(sensor: Box<dyn Sensor>) -> Result<Self> {
        let labels = sensor.labels().to_vec();
        if labels.is_empty() || labels.len() > MAX_CHANNELS {
            return Err(Error::InvalidArgs(format!(
                "a sensor must expose 1..={MAX_CHANNELS} channels, got {}",
                labels.len()
            )));
        }
        let last_reading = vec![f64::NAN; labels.len()];
        Ok(Self {
            sensor,
            disabled: false,
            labels,
            last_reading,
        })
    }

    /// Runs the sensor's bring-up. On failure the handle is disabled and the
    /// error is handed back for logging only.
    pub fn init(&mut self) -> Result<()> {
        let outcome = self.sensor.init();
        if outcome.is_err() {
            self.disabled = true;
        }
        outcome
    }

    /// Gated read: a disabled handle never touches the hardware.
    pub fn get_reading(&mut self, channel: u8) -> f64 {
        if self.disabled || usize::from(channel) >= self.labels.len() {
            return f64::NAN;
        }
        self.sensor.read(channel)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn channel_count(&self) -> u8 {
        self.labels.len() as u8
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// All channel labels joined the way the log header joins them.
    pub fn combined_label(&self) -> String {
        self.labels.join(", ")
    }

    pub fn last_reading(&self, channel: u8) -> f64 {
        self.last_reading
            .get(usize::from(channel))
            .copied()
            .unwrap_or(f64::NAN)
    }

    pub(crate) fn set_last_reading(&mut self, channel: u8, value: f64) {
        if let Some(slot) = self.last_reading.get_mut(usize::from(channel)) {
            *slot = value;
        }
    }
}

/// Straight-line calibration from an input span onto an output span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMap {
    pub in_min: f64,
    pub in_max: f64,
    pub out_min: f64,
    pub out_max: f64,
    pub clamp: bool,
}

impl LinearMap {
    pub fn apply(&self, input: f64) -> f64 {
        let mapped = (self.out_max - self.out_min) * (input - self.in_min)
            / (self.in_max - self.in_min)
            + self.out_min;
        if self.clamp {
            mapped.clamp(self.out_min.min(self.out_max), self.out_min.max(self.out_max))
        } else {
            mapped
        }
    }
}

/// Resistor divider in front of an analog input. `r1 = 0` means no divider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divider {
    pub r1: f64,
    pub r2: f64,
}

impl Divider {
    pub const NONE: Divider = Divider { r1: 0.0, r2: 1.0 };

    /// Input voltage of the divider given the voltage at its tap.
    pub fn vin(&self, vout: f64) -> f64 {
        vout * (self.r1 + self.r2) / self.r2
    }
}

impl Default for Divider {
    fn default() -> Self {
        Self::NONE
    }
}

pub(crate) fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
