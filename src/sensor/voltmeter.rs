use super::{Divider, Sensor};
use crate::hal::AnalogPin;
use crate::Result;

pub const LABEL: &str = "Voltage[ADC]";

/// Board analog input read as a voltage: `scale * raw * vref / full_scale`.
pub struct Voltmeter {
    pin: Box<dyn AnalogPin>,
    scale: f64,
    divider: Divider,
    labels: Vec<String>,
}

impl Voltmeter {
    pub fn new(pin: Box<dyn AnalogPin>, scale: f64, divider: Divider) -> Self {
        Self {
            pin,
            scale,
            divider,
            labels: vec![LABEL.to_string()],
        }
    }

    fn volts(&mut self) -> Result<f64> {
        let raw = self.pin.read_raw()?;
        let vout = self.scale * f64::from(raw) * self.pin.reference_volts()
            / f64::from(self.pin.full_scale());
        Ok(self.divider.vin(vout))
    }
}

impl Sensor for Voltmeter {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn init(&mut self) -> Result<()> {
        self.pin.read_raw().map(|_| ())
    }

    fn read(&mut self, _channel: u8) -> f64 {
        self.volts().unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Unavailable;

    struct FixedPin(u16);

    impl AnalogPin for FixedPin {
        fn read_raw(&mut self) -> Result<u16> {
            Ok(self.0)
        }
    }

    #[test]
    fn scales_counts_to_volts() {
        let mut meter = Voltmeter::new(Box::new(FixedPin(1023)), 2.0, Divider::NONE);
        meter.init().unwrap();
        assert!((meter.read(0) - 6.6).abs() < 1e-9);
        assert_eq!(meter.labels(), ["Voltage[ADC]"]);
    }

    #[test]
    fn applies_divider_after_scale() {
        let divider = Divider { r1: 30.0, r2: 10.0 };
        let mut meter = Voltmeter::new(Box::new(FixedPin(310)), 1.0, divider);
        let expected = 310.0 * 3.3 / 1023.0 * 4.0;
        assert!((meter.read(0) - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_pin_fails_init_and_reads_nan() {
        let mut meter = Voltmeter::new(Box::new(Unavailable::new("no adc")), 2.0, Divider::NONE);
        assert!(meter.init().is_err());
        assert!(meter.read(0).is_nan());
    }
}
