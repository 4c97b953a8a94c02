use super::Sensor;
use crate::hal::PowerMonitor;
use crate::Result;

/// Power and supply voltage at one INA219 address. The address is part of
/// both labels so several monitors can share a log.
pub struct Ina219Sensor {
    chip: Box<dyn PowerMonitor>,
    labels: Vec<String>,
}

impl Ina219Sensor {
    pub fn new(chip: Box<dyn PowerMonitor>, addr: u8) -> Self {
        Self {
            chip,
            labels: vec![
                format!("Power(mW)[0x{addr:02X}]"),
                format!("Voltage[0x{addr:02X}]"),
            ],
        }
    }

    fn supply_voltage(&mut self) -> Result<f64> {
        Ok(self.chip.bus_voltage_v()? + self.chip.shunt_voltage_mv()? / 1000.0)
    }
}

impl Sensor for Ina219Sensor {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn init(&mut self) -> Result<()> {
        self.chip.begin()
    }

    fn read(&mut self, channel: u8) -> f64 {
        let value = match channel {
            0 => self.chip.power_mw(),
            1 => self.supply_voltage(),
            _ => return f64::NAN,
        };
        value.unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bench;

    impl PowerMonitor for Bench {
        fn begin(&mut self) -> Result<()> {
            Ok(())
        }

        fn power_mw(&mut self) -> Result<f64> {
            Ok(250.0)
        }

        fn bus_voltage_v(&mut self) -> Result<f64> {
            Ok(12.0)
        }

        fn shunt_voltage_mv(&mut self) -> Result<f64> {
            Ok(40.0)
        }
    }

    #[test]
    fn labels_carry_the_address() {
        let sensor = Ina219Sensor::new(Box::new(Bench), 0x4a);
        assert_eq!(sensor.labels(), ["Power(mW)[0x4A]", "Voltage[0x4A]"]);
    }

    #[test]
    fn voltage_channel_adds_shunt_drop() {
        let mut sensor = Ina219Sensor::new(Box::new(Bench), 0x40);
        assert_eq!(sensor.read(0), 250.0);
        assert!((sensor.read(1) - 12.04).abs() < 1e-9);
        assert!(sensor.read(2).is_nan());
    }
}
