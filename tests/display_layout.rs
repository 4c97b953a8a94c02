use sensorlog::{
    acquisition::{Acquisition, PollScheduler, RetryPolicy},
    config::Config,
    display::{
        format::{channel_index, format_cell, format_value, render_lines, UNAVAILABLE},
        DisplayEntry, DisplayFormatter, DisplaySink, FrameCache, MemoryDisplay,
    },
    registry::Registry,
    sensor::{Sensor, SensorHandle},
    Result,
};

struct Fixed {
    labels: Vec<String>,
    values: Vec<f64>,
}

impl Fixed {
    fn new(labels: &[&str], values: &[f64]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            values: values.to_vec(),
        }
    }
}

impl Sensor for Fixed {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn read(&mut self, channel: u8) -> f64 {
        self.values[usize::from(channel)]
    }
}

/// Engine after one completed cycle, so every handle has a last reading.
fn polled(sensors: Vec<Fixed>) -> Acquisition {
    let mut registry = Registry::new();
    for sensor in sensors {
        registry.push(SensorHandle::new(Box::new(sensor)).unwrap());
    }
    let mut acquisition =
        Acquisition::new(registry, PollScheduler::new(1000), RetryPolicy::default());
    acquisition.run_cycle();
    acquisition
}

#[test]
fn combined_label_resolves_to_channel() {
    let combined = "BME280 P(hPa), BME280 RH(%), BME280 Temp(F)";
    assert_eq!(channel_index(combined, 3, "BME280 P(hPa)"), Some(0));
    assert_eq!(channel_index(combined, 3, "BME280 RH(%)"), Some(1));
    assert_eq!(channel_index(combined, 3, "BME280 Temp(F)"), Some(2));
    assert_eq!(channel_index(combined, 3, "Wind Speed"), None);
}

#[test]
fn rounding_examples() {
    assert_eq!(format_value(3.456), "3.46");
    assert_eq!(format_value(23.47), "23.5");
    assert_eq!(format_value(456.7), "457");
    assert_eq!(format_value(10.00), "10");
    assert_eq!(format_value(UNAVAILABLE), "--");
}

#[test]
fn overlong_cell_is_rounded_once_more() {
    let entry = DisplayEntry::new("Power(mW)[0x40]", "Batt:", "mW");
    // "Batt:" + "1234" + "mW" is 11 wide; it cannot shrink further.
    assert_eq!(format_cell(&entry, 1234.4), "Batt:1234mW");

    let entry = DisplayEntry::new("Voltage[0x40]", "Batt:", "V");
    assert_eq!(format_cell(&entry, 3.14159), "Batt:3.14V");
    let entry = DisplayEntry::new("Voltage[0x40]", "Batt:", "mV");
    assert_eq!(format_cell(&entry, 3.14159), "Batt:3.1mV");
}

#[test]
fn default_table_renders_four_lines_from_a_polled_registry() {
    let engine = polled(vec![
        Fixed::new(
            &["BME280 P(hPa)", "BME280 RH(%)", "BME280 Temp(F)"],
            &[1013.2, 45.67, 71.24],
        ),
        Fixed::new(&["DS18 Temp(F)[Batt]", "DS18 Temp(F)[MCU]"], &[68.0, 80.5]),
        Fixed::new(&["Power(mW)[0x40]", "Voltage[0x40]"], &[512.4, 12.61]),
        Fixed::new(&["Wind Speed"], &[3.456]),
    ]);
    let formatter = DisplayFormatter::new(Config::default().display).unwrap();
    let lines = formatter.render(engine.registry(), 5_400_000);
    assert_eq!(
        lines,
        [
            "Air:71.2F Batt:512mW",
            "Air:45.7% Wnd:3.5m/s",
            "Batt:68F  ",
            "Batt:12.6V t:1.50hrs",
        ]
    );
}

#[test]
fn default_table_at_widest_values_fits_the_default_panel() {
    let engine = polled(vec![
        Fixed::new(
            &["BME280 P(hPa)", "BME280 RH(%)", "BME280 Temp(F)"],
            &[1013.2, 99.94, 99.94],
        ),
        Fixed::new(&["DS18 Temp(F)[Batt]"], &[99.94]),
        Fixed::new(&["Power(mW)[0x40]", "Voltage[0x40]"], &[999.4, 9.994]),
        Fixed::new(&["Wind Speed"], &[9.994]),
    ]);
    let cfg = Config::default();
    let formatter = DisplayFormatter::new(cfg.display.clone()).unwrap();
    let lines = formatter.render(engine.registry(), 359_964_000);
    assert_eq!(
        lines,
        [
            "Air:99.9F Batt:999mW",
            "Air:99.9%  Wnd:10m/s",
            "Batt:99.9F",
            "Batt:9.99Vt:99.99hrs",
        ]
    );
    for line in &lines {
        assert!(
            line.chars().count() <= usize::from(cfg.cols),
            "{line:?} is wider than {} columns",
            cfg.cols
        );
    }
}

#[test]
fn missing_channels_show_dashes() {
    let engine = polled(vec![Fixed::new(&["Wind Speed"], &[f64::NAN])]);
    let formatter = DisplayFormatter::new(vec![
        DisplayEntry::new("Wind Speed", "Wnd:", "m/s"),
        DisplayEntry::new("Light (%)", "Lux:", "%"),
    ])
    .unwrap();
    let lines = formatter.render(engine.registry(), 0);
    assert_eq!(lines[0].trim_end(), "Wnd:--m/s");
    assert_eq!(lines[1].trim_end(), "Lux:--%");
    assert_eq!(lines[3], "           t:0.00hrs");
}

#[test]
fn unchanged_frames_reach_the_sink_once() {
    let lines = render_lines(&["A:1V".to_string()], 0);
    let mut cache = FrameCache::new();
    let mut sink = MemoryDisplay::new();
    for _ in 0..3 {
        if cache.is_new(&lines) {
            sink.show(&lines).unwrap();
        }
    }
    assert_eq!(sink.frames.len(), 1);
}

#[test]
fn table_is_capped_at_eight_entries() {
    let entry = DisplayEntry::new("X", "X:", "");
    assert!(DisplayFormatter::new(vec![entry.clone(); 8]).is_ok());
    assert!(DisplayFormatter::new(vec![entry; 9]).is_err());
}
