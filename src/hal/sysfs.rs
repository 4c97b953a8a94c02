//! Backends over Linux sysfs: IIO for the BME280 and raw analog inputs,
//! `w1_therm` for the DS18B20 bus. Roots are configurable so tests can point
//! them at a temporary tree.

use std::fs;
use std::path::{Path, PathBuf};

use super::{AnalogPin, AtmosphericSample, Barometer, OneWireBus, RomCode};
use crate::{Error, Result};

pub const DEFAULT_IIO_ROOT: &str = "/sys/bus/iio/devices";
pub const DEFAULT_W1_ROOT: &str = "/sys/bus/w1/devices";

const BME280_NAME: &str = "bme280";
/// Value `w1_therm` reports for a probe that stopped answering.
const DISCONNECTED_MILLI_C: i64 = -127_000;

fn read_trimmed(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Hardware(format!("{}: {e}", path.display())))?;
    Ok(raw.trim().to_string())
}

fn read_f64(path: &Path) -> Result<f64> {
    let text = read_trimmed(path)?;
    text.parse::<f64>()
        .map_err(|_| Error::Parse(format!("{}: '{text}' is not a number", path.display())))
}

fn find_iio_device(root: &Path, pred: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("iio:device"))
        })
        .collect();
    dirs.sort();
    dirs.into_iter().find(|p| pred(p))
}

/// BME280 bound by the `bmp280` IIO driver.
pub struct IioBarometer {
    root: PathBuf,
    device: Option<PathBuf>,
}

impl IioBarometer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            device: None,
        }
    }

    fn device(&self) -> Result<&Path> {
        self.device
            .as_deref()
            .ok_or_else(|| Error::Hardware("bme280 not initialised".into()))
    }
}

impl Barometer for IioBarometer {
    fn begin(&mut self) -> Result<()> {
        let found = find_iio_device(&self.root, |dir| {
            read_trimmed(&dir.join("name")).is_ok_and(|name| name == BME280_NAME)
        });
        match found {
            Some(dir) => {
                self.device = Some(dir);
                Ok(())
            }
            None => Err(Error::Hardware(format!(
                "no {BME280_NAME} device under {}",
                self.root.display()
            ))),
        }
    }

    fn measure(&mut self) -> Result<AtmosphericSample> {
        let dir = self.device()?;
        let pressure_kpa = read_f64(&dir.join("in_pressure_input"))?;
        let humidity_milli = read_f64(&dir.join("in_humidityrelative_input"))?;
        let temp_milli = read_f64(&dir.join("in_temp_input"))?;
        Ok(AtmosphericSample {
            pressure_pa: pressure_kpa * 1000.0,
            humidity_pct: humidity_milli / 1000.0,
            temperature_c: temp_milli / 1000.0,
        })
    }
}

/// Board ADC channel exposed as `in_voltage<pin>_raw`.
pub struct IioAnalogPin {
    root: PathBuf,
    pin: u8,
    file: Option<PathBuf>,
}

impl IioAnalogPin {
    pub fn new(root: impl Into<PathBuf>, pin: u8) -> Self {
        Self {
            root: root.into(),
            pin,
            file: None,
        }
    }

    fn locate(&mut self) -> Result<PathBuf> {
        if let Some(file) = &self.file {
            return Ok(file.clone());
        }
        let name = format!("in_voltage{}_raw", self.pin);
        let dir = find_iio_device(&self.root, |dir| dir.join(&name).is_file()).ok_or_else(
            || Error::Hardware(format!("no IIO channel {name} under {}", self.root.display())),
        )?;
        let file = dir.join(name);
        self.file = Some(file.clone());
        Ok(file)
    }
}

impl AnalogPin for IioAnalogPin {
    fn read_raw(&mut self) -> Result<u16> {
        let file = self.locate()?;
        let text = read_trimmed(&file)?;
        text.parse::<u16>()
            .map_err(|_| Error::Parse(format!("{}: '{text}' is not a count", file.display())))
    }
}

/// One-wire bus driven through the `w1_therm` kernel driver.
pub struct W1Bus {
    root: PathBuf,
    master: Option<PathBuf>,
}

impl W1Bus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            master: None,
        }
    }
}

impl OneWireBus for W1Bus {
    fn begin(&mut self) -> Result<()> {
        let master = fs::read_dir(&self.root)
            .map_err(|e| Error::Hardware(format!("{}: {e}", self.root.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("w1_bus_master"))
            })
            .ok_or_else(|| {
                Error::Hardware(format!("no w1 bus master under {}", self.root.display()))
            })?;
        self.master = Some(master);
        Ok(())
    }

    fn request_temperatures(&mut self) -> Result<()> {
        let Some(master) = &self.master else {
            return Err(Error::Hardware("w1 bus not initialised".into()));
        };
        let trigger = master.join("therm_bulk_read");
        // Kernels without bulk read convert on every per-probe read instead.
        if !trigger.exists() {
            return Ok(());
        }
        fs::write(&trigger, "trigger\n")
            .map_err(|e| Error::Hardware(format!("{}: {e}", trigger.display())))
    }

    fn temperature_c(&mut self, rom: &RomCode) -> Result<f64> {
        let path = self.root.join(rom.w1_name()).join("temperature");
        let text = read_trimmed(&path)?;
        let milli: i64 = text
            .parse()
            .map_err(|_| Error::Parse(format!("{}: '{text}' is not a reading", path.display())))?;
        if milli == DISCONNECTED_MILLI_C {
            return Err(Error::Hardware(format!("probe {rom} disconnected")));
        }
        Ok(milli as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn barometer_finds_bme280_and_scales_units() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("iio:device0/name"), "ads1015\n");
        let dev = dir.path().join("iio:device1");
        write(&dev.join("name"), "bme280\n");
        write(&dev.join("in_pressure_input"), "101.325\n");
        write(&dev.join("in_humidityrelative_input"), "45250\n");
        write(&dev.join("in_temp_input"), "21500\n");

        let mut baro = IioBarometer::new(dir.path());
        baro.begin().unwrap();
        let sample = baro.measure().unwrap();
        assert!((sample.pressure_pa - 101_325.0).abs() < 1e-6);
        assert!((sample.humidity_pct - 45.25).abs() < 1e-9);
        assert!((sample.temperature_c - 21.5).abs() < 1e-9);
    }

    #[test]
    fn barometer_begin_fails_without_device() {
        let dir = tempdir().unwrap();
        let mut baro = IioBarometer::new(dir.path());
        let err = baro.begin().unwrap_err();
        assert!(format!("{err}").contains("no bme280 device"));
        assert!(baro.measure().is_err());
    }

    #[test]
    fn analog_pin_reads_raw_counts() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("iio:device0/in_voltage0_raw"), "512\n");
        let mut pin = IioAnalogPin::new(dir.path(), 0);
        assert_eq!(pin.read_raw().unwrap(), 512);
        let mut missing = IioAnalogPin::new(dir.path(), 3);
        assert!(missing.read_raw().is_err());
    }

    #[test]
    fn w1_bus_triggers_bulk_read_and_reads_probe() {
        let dir = tempdir().unwrap();
        let master = dir.path().join("w1_bus_master1");
        write(&master.join("therm_bulk_read"), "");
        let rom: RomCode = "28DCA049F6EB3CF0".parse().unwrap();
        write(&dir.path().join("28-3cebf649a0dc/temperature"), "23125\n");

        let mut bus = W1Bus::new(dir.path());
        bus.begin().unwrap();
        bus.request_temperatures().unwrap();
        assert_eq!(
            fs::read_to_string(master.join("therm_bulk_read")).unwrap(),
            "trigger\n"
        );
        assert!((bus.temperature_c(&rom).unwrap() - 23.125).abs() < 1e-9);
    }

    #[test]
    fn w1_disconnected_probe_is_an_error() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("w1_bus_master1")).unwrap();
        let rom: RomCode = "286A6449F6BE3CF0".parse().unwrap();
        write(&dir.path().join(rom.w1_name()).join("temperature"), "-127000\n");

        let mut bus = W1Bus::new(dir.path());
        bus.begin().unwrap();
        bus.request_temperatures().unwrap();
        let err = bus.temperature_c(&rom).unwrap_err();
        assert!(format!("{err}").contains("disconnected"));
    }

    #[test]
    fn w1_begin_requires_bus_master() {
        let dir = tempdir().unwrap();
        let mut bus = W1Bus::new(dir.path());
        assert!(bus.begin().is_err());
    }
}
