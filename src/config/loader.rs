use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::sensor::bme280::{Bme280Channel, Bme280Channels};
use crate::{Error, Result};

use super::{Config, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

pub fn load_or_default() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        cfg.save_to_path(&path)?;
        super::validate(&cfg)?;
        return Ok(cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        super::validate(&cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

pub fn save(config: &Config) -> Result<()> {
    let path = config_path()?;
    save_to_path(config, &path)
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = format!(
        "# sensorlog config\n\
poll_interval_ms = {}\n\
storage_enabled = {}\n\
storage_dir = \"{}\"\n\
log_filename = \"{}\"\n\
open_attempts = {}\n\
open_retry_ms = {}\n\
read_attempts = {}\n\
read_retry_ms = {}\n\
sensors = {}\n\
probes = {}\n\
bme280_channels = {}\n\
voltmeter_scale = {}\n\
adc_divider_r1 = {}\n\
adc_divider_r2 = {}\n\
display = {}\n\
display_enabled = {}\n\
cols = {}\n\
rows = {}\n\
pcf8574_addr = {}\n\
led_gpio_pin = {}\n\
i2c_bus = {}\n\
w1_root = \"{}\"\n\
iio_root = \"{}\"\n",
        config.poll_interval_ms,
        config.storage_enabled,
        config.storage_dir.display(),
        config.log_filename,
        config.open_attempts,
        config.open_retry_ms,
        config.read_attempts,
        config.read_retry_ms,
        format_array(&config.sensors),
        format_array(
            &config
                .probes
                .iter()
                .map(|p| format!("{}={}", p.rom, p.label))
                .collect::<Vec<_>>()
        ),
        format_array(config.bme280_channels.as_slice()),
        config.voltmeter_scale,
        config.adc_divider_r1,
        config.adc_divider_r2,
        format_array(&config.display),
        config.display_enabled,
        config.cols,
        config.rows,
        super::format_pcf_addr(&config.pcf8574_addr),
        config
            .led_gpio_pin
            .map(|p| p.to_string())
            .unwrap_or_else(|| "null".into()),
        config.i2c_bus,
        config.w1_root.display(),
        config.iio_root.display(),
    );
    fs::write(path, contents)?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<Config> {
    let mut cfg = Config::default();

    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, raw_value) = trimmed.split_once('=').ok_or_else(|| {
            Error::InvalidArgs(format!("invalid config line {}: '{}'", idx + 1, line))
        })?;

        let key = key.trim();
        let raw_value = raw_value.trim();
        let value = raw_value.trim_matches('"');
        let line_no = idx + 1;
        match key {
            "poll_interval_ms" => cfg.poll_interval_ms = number(key, value, line_no)?,
            "storage_enabled" => cfg.storage_enabled = boolean(key, value, line_no)?,
            "storage_dir" => cfg.storage_dir = PathBuf::from(value),
            "log_filename" => cfg.log_filename = value.to_string(),
            "open_attempts" => cfg.open_attempts = number(key, value, line_no)?,
            "open_retry_ms" => cfg.open_retry_ms = number(key, value, line_no)?,
            "read_attempts" => cfg.read_attempts = number(key, value, line_no)?,
            "read_retry_ms" => cfg.read_retry_ms = number(key, value, line_no)?,
            "sensors" => cfg.sensors = typed_array(key, raw_value, line_no)?,
            "probes" => cfg.probes = typed_array(key, raw_value, line_no)?,
            "bme280_channels" => {
                let channels: Vec<Bme280Channel> = typed_array(key, raw_value, line_no)?;
                cfg.bme280_channels = Bme280Channels::new(channels).map_err(|e| {
                    Error::InvalidArgs(format!("invalid bme280_channels on line {line_no}: {e}"))
                })?;
            }
            "voltmeter_scale" => cfg.voltmeter_scale = number(key, value, line_no)?,
            "adc_divider_r1" => cfg.adc_divider_r1 = number(key, value, line_no)?,
            "adc_divider_r2" => cfg.adc_divider_r2 = number(key, value, line_no)?,
            "display" => cfg.display = typed_array(key, raw_value, line_no)?,
            "display_enabled" => cfg.display_enabled = boolean(key, value, line_no)?,
            "cols" => cfg.cols = number(key, value, line_no)?,
            "rows" => cfg.rows = number(key, value, line_no)?,
            "pcf8574_addr" => {
                cfg.pcf8574_addr = super::parse_pcf_addr(value).map_err(|e| {
                    Error::InvalidArgs(format!("invalid pcf8574_addr on line {line_no}: {e}"))
                })?;
            }
            "led_gpio_pin" => {
                if value == "null" {
                    cfg.led_gpio_pin = None;
                } else {
                    cfg.led_gpio_pin = Some(number(key, value, line_no)?);
                }
            }
            "i2c_bus" => cfg.i2c_bus = number(key, value, line_no)?,
            "w1_root" => cfg.w1_root = PathBuf::from(value),
            "iio_root" => cfg.iio_root = PathBuf::from(value),
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown config key '{}' on line {}",
                    other, line_no
                )));
            }
        }
    }

    super::validate(&cfg)?;
    Ok(cfg)
}

fn config_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| Error::InvalidArgs("HOME not set; cannot locate config directory".into()))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn number<T: FromStr>(key: &str, value: &str, line_no: usize) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgs(format!("invalid {key} value on line {line_no}")))
}

fn boolean(key: &str, value: &str, line_no: usize) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::InvalidArgs(format!(
            "invalid {key} on line {line_no}: expected true or false"
        ))),
    }
}

fn typed_array<T>(key: &str, raw: &str, line_no: usize) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let items = parse_string_array(raw)
        .map_err(|e| Error::InvalidArgs(format!("invalid {key} on line {line_no}: {e}")))?;
    items
        .iter()
        .map(|item| {
            item.parse::<T>().map_err(|e| {
                Error::InvalidArgs(format!("invalid {key} entry on line {line_no}: {e}"))
            })
        })
        .collect()
}

/// `["a", "b, c", bare]`. Quoted items may contain commas and `\"` escapes.
fn parse_string_array(value: &str) -> std::result::Result<Vec<String>, String> {
    let trimmed = value.trim();
    if !trimmed.starts_with('[') || !trimmed.ends_with(']') || trimmed.len() < 2 {
        return Err("expected array literal (e.g., [\"a\", \"b\"])".into());
    }
    let inner = &trimmed[1..trimmed.len() - 1];
    let mut entries = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else {
            break;
        };
        let item = if first == '"' {
            chars.next();
            let mut item = String::new();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(escaped) => item.push(escaped),
                        None => return Err("unterminated escape".into()),
                    },
                    Some('"') => break,
                    Some(ch) => item.push(ch),
                    None => return Err("unterminated string".into()),
                }
            }
            item
        } else {
            let mut item = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == ',' {
                    break;
                }
                item.push(ch);
                chars.next();
            }
            item.trim().to_string()
        };
        if item.is_empty() {
            return Err("entries must not be empty".into());
        }
        entries.push(item);
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') | None => {}
            Some(other) => return Err(format!("unexpected '{other}' after entry")),
        }
    }
    Ok(entries)
}

fn format_array<T: std::fmt::Display>(values: &[T]) -> String {
    if values.is_empty() {
        return "[]".into();
    }
    let quoted = values
        .iter()
        .map(|value| {
            let mut encoded = String::new();
            for ch in value.to_string().chars() {
                match ch {
                    '\\' => encoded.push_str("\\\\"),
                    '"' => encoded.push_str("\\\""),
                    other => encoded.push(other),
                }
            }
            format!("\"{}\"", encoded)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{quoted}]")
}
