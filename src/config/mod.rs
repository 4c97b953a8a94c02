use crate::display::format::{DisplayEntry, LINE_WIDTH, MAX_ENTRIES};
use crate::hal::sysfs::{DEFAULT_IIO_ROOT, DEFAULT_W1_ROOT};
use crate::hal::RomCode;
use crate::registry::{SensorDescriptor, SensorKind, SensorSettings};
use crate::sensor::bme280::Bme280Channels;
use crate::sensor::ds18b20::{ProbeEntry, MAX_PROBES};
use crate::sensor::Divider;
use crate::storage::ShortName;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod loader;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_STORAGE_DIR: &str = "/var/lib/sensorlog";
pub const DEFAULT_LOG_FILENAME: &str = "log.txt";
pub const DEFAULT_OPEN_ATTEMPTS: u32 = 30;
pub const DEFAULT_OPEN_RETRY_MS: u64 = 100;
pub const DEFAULT_READ_ATTEMPTS: u32 = 11;
pub const DEFAULT_VOLTMETER_SCALE: f64 = 2.0;
pub const DEFAULT_COLS: u8 = 20;
pub const DEFAULT_ROWS: u8 = 4;
pub const DEFAULT_PCF8574_ADDR: Pcf8574Addr = Pcf8574Addr::Auto;
pub const DEFAULT_I2C_BUS: u8 = 1;
const CONFIG_DIR_NAME: &str = ".sensorlog";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pcf8574Addr {
    Auto,
    Addr(u8),
}

impl std::str::FromStr for Pcf8574Addr {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_pcf_addr(s)
    }
}

/// Settings loaded from the config file, then overridden from the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub poll_interval_ms: u64,
    pub storage_enabled: bool,
    pub storage_dir: PathBuf,
    pub log_filename: String,
    pub open_attempts: u32,
    pub open_retry_ms: u64,
    pub read_attempts: u32,
    pub read_retry_ms: u64,
    pub sensors: Vec<SensorDescriptor>,
    pub probes: Vec<ProbeEntry>,
    pub bme280_channels: Bme280Channels,
    pub voltmeter_scale: f64,
    pub adc_divider_r1: f64,
    pub adc_divider_r2: f64,
    pub display: Vec<DisplayEntry>,
    pub display_enabled: bool,
    pub cols: u8,
    pub rows: u8,
    pub pcf8574_addr: Pcf8574Addr,
    pub led_gpio_pin: Option<u8>,
    pub i2c_bus: u8,
    pub w1_root: PathBuf,
    pub iio_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            storage_enabled: true,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            log_filename: DEFAULT_LOG_FILENAME.to_string(),
            open_attempts: DEFAULT_OPEN_ATTEMPTS,
            open_retry_ms: DEFAULT_OPEN_RETRY_MS,
            read_attempts: DEFAULT_READ_ATTEMPTS,
            read_retry_ms: 0,
            sensors: default_sensors(),
            probes: default_probes(),
            bme280_channels: Bme280Channels::all(),
            voltmeter_scale: DEFAULT_VOLTMETER_SCALE,
            adc_divider_r1: Divider::NONE.r1,
            adc_divider_r2: Divider::NONE.r2,
            display: default_display(),
            display_enabled: true,
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            pcf8574_addr: DEFAULT_PCF8574_ADDR,
            led_gpio_pin: None,
            i2c_bus: DEFAULT_I2C_BUS,
            w1_root: PathBuf::from(DEFAULT_W1_ROOT),
            iio_root: PathBuf::from(DEFAULT_IIO_ROOT),
        }
    }
}

fn default_sensors() -> Vec<SensorDescriptor> {
    vec![
        SensorDescriptor::new(SensorKind::Ina219, 0x40),
        SensorDescriptor::new(SensorKind::Ina219, 0x41),
        SensorDescriptor::new(SensorKind::Bme280, 0),
        SensorDescriptor::new(SensorKind::Ds18b20, 10),
        SensorDescriptor::new(SensorKind::Light, 0),
        SensorDescriptor::new(SensorKind::Anemometer, 1),
    ]
}

fn default_probes() -> Vec<ProbeEntry> {
    vec![
        ProbeEntry::new(
            RomCode([0x28, 0xDC, 0xA0, 0x49, 0xF6, 0xEB, 0x3C, 0xF0]),
            "Batt",
        ),
        ProbeEntry::new(
            RomCode([0x28, 0x6A, 0x64, 0x49, 0xF6, 0xBE, 0x3C, 0xF0]),
            "MCU",
        ),
    ]
}

fn default_display() -> Vec<DisplayEntry> {
    vec![
        DisplayEntry::new("BME280 Temp(F)", "Air:", "F"),
        DisplayEntry::new("BME280 RH(%)", "Air:", "%"),
        DisplayEntry::new("DS18 Temp(F)[Batt]", "Batt:", "F"),
        DisplayEntry::new("Voltage[0x40]", "Batt:", "V"),
        DisplayEntry::new("Power(mW)[0x40]", "Batt:", "mW"),
        DisplayEntry::new("Wind Speed", "Wnd:", "m/s"),
    ]
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save(&self) -> Result<()> {
        loader::save(self)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }

    pub fn validate(&self) -> Result<()> {
        validate(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn open_retry(&self) -> Duration {
        Duration::from_millis(self.open_retry_ms)
    }

    pub fn read_retry(&self) -> Duration {
        Duration::from_millis(self.read_retry_ms)
    }

    pub fn short_name(&self) -> Result<ShortName> {
        self.log_filename.parse()
    }

    pub fn sensor_settings(&self) -> SensorSettings {
        SensorSettings {
            descriptors: self.sensors.clone(),
            probes: self.probes.clone(),
            bme280_channels: self.bme280_channels.clone(),
            voltmeter_scale: self.voltmeter_scale,
            adc_divider: Divider {
                r1: self.adc_divider_r1,
                r2: self.adc_divider_r2,
            },
        }
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if cfg.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        return Err(Error::InvalidArgs(format!(
            "poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}"
        )));
    }
    if !(1..=255).contains(&cfg.open_attempts) {
        return Err(Error::InvalidArgs(
            "open_attempts must be between 1 and 255".into(),
        ));
    }
    if !(1..=50).contains(&cfg.read_attempts) {
        return Err(Error::InvalidArgs(
            "read_attempts must be between 1 and 50".into(),
        ));
    }
    cfg.short_name()?;
    if cfg.probes.len() > MAX_PROBES {
        return Err(Error::InvalidArgs(format!(
            "probes lists {} entries; at most {MAX_PROBES} are supported",
            cfg.probes.len()
        )));
    }
    let wants_probes = cfg.sensors.iter().any(|s| s.kind == SensorKind::Ds18b20);
    if wants_probes && cfg.probes.is_empty() {
        return Err(Error::InvalidArgs(
            "a ds18b20 sensor is configured but probes is empty".into(),
        ));
    }
    if !(cfg.voltmeter_scale.is_finite() && cfg.voltmeter_scale > 0.0) {
        return Err(Error::InvalidArgs(
            "voltmeter_scale must be a positive number".into(),
        ));
    }
    if !(cfg.adc_divider_r1.is_finite() && cfg.adc_divider_r1 >= 0.0) {
        return Err(Error::InvalidArgs(
            "adc_divider_r1 must be zero or positive".into(),
        ));
    }
    if !(cfg.adc_divider_r2.is_finite() && cfg.adc_divider_r2 > 0.0) {
        return Err(Error::InvalidArgs(
            "adc_divider_r2 must be greater than zero".into(),
        ));
    }
    if cfg.display.len() > MAX_ENTRIES {
        return Err(Error::InvalidArgs(format!(
            "display lists {} entries; at most {MAX_ENTRIES} fit on the panel",
            cfg.display.len()
        )));
    }
    if !(LINE_WIDTH..=40).contains(&usize::from(cfg.cols)) {
        return Err(Error::InvalidArgs(format!(
            "cols must be between {LINE_WIDTH} and 40; the status layout is {LINE_WIDTH} wide"
        )));
    }
    if cfg.rows != DEFAULT_ROWS {
        return Err(Error::InvalidArgs(format!(
            "rows must be {DEFAULT_ROWS}"
        )));
    }
    Ok(())
}

fn parse_pcf_addr(raw: &str) -> std::result::Result<Pcf8574Addr, String> {
    if raw.eq_ignore_ascii_case("auto") {
        return Ok(Pcf8574Addr::Auto);
    }
    let cleaned = raw.trim_start_matches("0x");
    let value = u8::from_str_radix(cleaned, 16)
        .or_else(|_| raw.parse::<u8>())
        .map_err(|_| "expected 'auto' or a hex/decimal address (e.g., 0x27)".to_string())?;
    Ok(Pcf8574Addr::Addr(value))
}

fn format_pcf_addr(addr: &Pcf8574Addr) -> String {
    match addr {
        Pcf8574Addr::Auto => "\"auto\"".into(),
        Pcf8574Addr::Addr(a) => format!("{a:#04x}"),
    }
}
