use crate::{
    acquisition::{Acquisition, BootClock, Clock, PollScheduler, Record, RetryPolicy},
    cli::RunOptions,
    config::Config,
    display::{ConsoleDisplay, DisplayFormatter, DisplaySink, FrameCache, NullDisplay},
    hal::{sim::SimulatedHardware, Hardware},
    registry::{build_registry, Registry},
    storage::{FsStorage, LogWriter, Storage},
    Error, Result,
};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

pub mod indicator;
mod lifecycle;
mod logger;

use indicator::{Indicator, NoIndicator, BLINK_PERIOD};
pub use logger::{LogLevel, Logger};

const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Config for the daemon: the file settings with CLI overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub config: Config,
    pub demo: bool,
    pub cycles: Option<u64>,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: Config::default(),
            demo: false,
            cycles: None,
            log_level: LogLevel::default(),
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_sources(mut config: Config, opts: RunOptions) -> Result<Self> {
        if let Some(dir) = opts.storage_dir {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(name) = opts.log_filename {
            config.log_filename = name;
        }
        if let Some(interval) = opts.interval_ms {
            config.poll_interval_ms = interval;
        }
        if opts.no_storage {
            config.storage_enabled = false;
        }
        if opts.no_display {
            config.display_enabled = false;
        }
        config.validate()?;
        Ok(Self {
            config,
            demo: opts.demo,
            cycles: opts.cycles,
            log_level: opts.log_level.unwrap_or_default(),
            log_file: opts.log_file,
        })
    }
}

/// Loads `--config <path>` when given (the file must exist), otherwise the
/// per-user config, creating it on first run.
pub fn load_config(opts: &RunOptions) -> Result<Config> {
    match &opts.config_path {
        Some(path) => {
            let path = Path::new(path);
            if !path.exists() {
                return Err(Error::InvalidArgs(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            Config::load_from_path(path)
        }
        None => Config::load_or_default(),
    }
}

/// One logging run: the polling engine plus where its output goes.
pub struct Session<S> {
    acquisition: Acquisition,
    formatter: DisplayFormatter,
    frames: FrameCache,
    writer: Option<LogWriter<S>>,
}

impl<S: Storage> Session<S> {
    pub fn new(
        acquisition: Acquisition,
        formatter: DisplayFormatter,
        writer: Option<LogWriter<S>>,
    ) -> Self {
        Self {
            acquisition,
            formatter,
            frames: FrameCache::new(),
            writer,
        }
    }

    pub fn acquisition(&self) -> &Acquisition {
        &self.acquisition
    }

    pub fn writer(&self) -> Option<&LogWriter<S>> {
        self.writer.as_ref()
    }

    /// Header to the console and, as a `#` comment line, to storage.
    pub fn start(&mut self, out: &mut dyn Write, logger: &Logger) -> Result<()> {
        let schema = self.acquisition.schema();
        writeln!(out, "{}", schema.header())?;
        out.flush()?;
        let comment = schema.comment_line();
        self.store(&comment, logger)
    }

    /// Runs a cycle if one is due at `now_ms`. Only a storage exhaustion
    /// is returned as an error; other sink failures are logged.
    pub fn step(
        &mut self,
        now_ms: u64,
        out: &mut dyn Write,
        display: &mut dyn DisplaySink,
        logger: &Logger,
    ) -> Result<Option<Record>> {
        let Some(record) = self.acquisition.poll_if_due(now_ms) else {
            return Ok(None);
        };
        let retries = self.acquisition.last_cycle_retries();
        if retries > 0 {
            logger.debug(format!("cycle needed {retries} re-reads"));
        }

        let line = record.to_csv_line();
        if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            logger.warn(format!("console write failed: {err}"));
        }

        let frame = self
            .formatter
            .render(self.acquisition.registry(), self.acquisition.last_poll_ms());
        if self.frames.is_new(&frame) {
            if let Err(err) = display.show(&frame) {
                logger.warn(format!("display update failed: {err}"));
                self.frames.invalidate();
            }
        }

        self.store(&line, logger)?;
        Ok(Some(record))
    }

    fn store(&mut self, line: &str, logger: &Logger) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        match writer.append_line(line, logger) {
            Ok(()) => Ok(()),
            Err(err @ Error::StorageExhausted { .. }) => Err(err),
            Err(err) => {
                logger.warn(format!("could not write to {}: {err}", writer.filename()));
                Ok(())
            }
        }
    }
}

/// Cooperative polling loop. Returns the number of cycles run once `running`
/// clears or `cycles` is reached.
pub fn run_loop<S: Storage>(
    session: &mut Session<S>,
    clock: &dyn Clock,
    out: &mut dyn Write,
    display: &mut dyn DisplaySink,
    logger: &Logger,
    running: &AtomicBool,
    cycles: Option<u64>,
) -> Result<u64> {
    let mut completed = 0;
    while running.load(Ordering::SeqCst) {
        if cycles.is_some_and(|limit| completed >= limit) {
            break;
        }
        match session.step(clock.now_ms(), out, display, logger)? {
            Some(_) => completed += 1,
            None => thread::sleep(IDLE_SLEEP),
        }
    }
    Ok(completed)
}

/// Probes the medium until it is usable, double-blinking between probes.
/// Returns false if shutdown was requested first.
pub fn wait_for_storage(
    storage: &mut dyn Storage,
    led: &mut dyn Indicator,
    running: &AtomicBool,
    logger: &Logger,
    blink_period: Duration,
) -> bool {
    let mut attempt: u32 = 0;
    loop {
        match storage.ready() {
            Ok(()) => {
                if attempt > 0 {
                    logger.info(format!("storage ready after {} probes", attempt + 1));
                }
                return true;
            }
            Err(err) => {
                attempt += 1;
                logger.warn(format!("storage not ready ({err}); probe {attempt}"));
            }
        }
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        indicator::double_blink(led, blink_period);
    }
}

/// Initialises every handle; failures leave that handle disabled.
pub fn init_sensors(registry: &mut Registry, logger: &Logger) {
    for handle in registry.handles_mut() {
        match handle.init() {
            Ok(()) => logger.info(format!("sensor ready: {}", handle.combined_label())),
            Err(err) => logger.warn(format!(
                "sensor disabled: {} ({err})",
                handle.combined_label()
            )),
        }
    }
    for kind in registry.skipped() {
        logger.warn(format!("unknown sensor kind '{kind}' skipped"));
    }
}

pub struct App {
    config: AppConfig,
    logger: Logger,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let logger = Logger::new(config.log_level, config.log_file.clone())?;
        Ok(Self { config, logger })
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let cfg_file = load_config(&opts)?;
        let merged = AppConfig::from_sources(cfg_file, opts)?;
        Self::new(merged)
    }

    /// Entry point for the daemon.
    pub fn run(&self) -> Result<()> {
        let clock = BootClock::new();
        let cfg = &self.config.config;
        let running = lifecycle::create_shutdown_flag()?;

        let mut display = self.open_display();
        let mut led = self.open_indicator();
        if let Err(err) = lifecycle::render_boot(display.as_mut()) {
            self.logger.warn(format!("boot screen failed: {err}"));
        }
        self.logger.info(format!(
            "sensorlog start (interval={}, storage={}, display={}, demo={})",
            humantime::format_duration(cfg.poll_interval()),
            cfg.storage_enabled,
            cfg.display_enabled,
            self.config.demo
        ));

        let mut hardware = self.select_hardware()?;
        let mut registry = build_registry(&cfg.sensor_settings(), hardware.as_mut())?;
        init_sensors(&mut registry, &self.logger);
        let acquisition = Acquisition::new(
            registry,
            PollScheduler::new(cfg.poll_interval_ms),
            RetryPolicy::new(cfg.read_attempts, cfg.read_retry()),
        );
        let formatter = DisplayFormatter::new(cfg.display.clone())?;

        let writer = if cfg.storage_enabled {
            let mut storage = FsStorage::new(&cfg.storage_dir);
            if !wait_for_storage(&mut storage, led.as_mut(), &running, &self.logger, BLINK_PERIOD)
            {
                self.logger
                    .info("shutdown requested while waiting for storage");
                self.shutdown(display.as_mut(), led.as_mut());
                return Ok(());
            }
            let writer = LogWriter::create(
                storage,
                &cfg.short_name()?,
                cfg.open_attempts,
                cfg.open_retry(),
            );
            self.logger.info(format!(
                "logging to {}",
                writer.storage().path_of(writer.filename()).display()
            ));
            Some(writer)
        } else {
            self.logger
                .info("storage disabled; records go to stdout only");
            None
        };
        led.set(true);

        let mut session = Session::new(acquisition, formatter, writer);
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let result = session.start(&mut out, &self.logger).and_then(|()| {
            run_loop(
                &mut session,
                &clock,
                &mut out,
                display.as_mut(),
                &self.logger,
                &running,
                self.config.cycles,
            )
        });

        match result {
            Ok(cycles) => {
                self.logger.info(format!(
                    "stopping after {cycles} cycles ({} up)",
                    humantime::format_duration(Duration::from_secs(clock.now_ms() / 1000))
                ));
                self.shutdown(display.as_mut(), led.as_mut());
                Ok(())
            }
            Err(err @ Error::StorageExhausted { .. }) => {
                lifecycle::fatal_halt(
                    &err,
                    display.as_mut(),
                    led.as_mut(),
                    &running,
                    &self.logger,
                    BLINK_PERIOD,
                );
                let _ = display.power_off();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn shutdown(&self, display: &mut dyn DisplaySink, led: &mut dyn Indicator) {
        led.set(false);
        if let Err(err) = lifecycle::render_shutdown(display).and_then(|()| display.power_off()) {
            self.logger.warn(format!("display shutdown failed: {err}"));
        }
    }

    fn select_hardware(&self) -> Result<Box<dyn Hardware>> {
        if self.config.demo {
            self.logger.info("demo mode: using simulated sensors");
            return Ok(Box::new(SimulatedHardware::new()));
        }
        #[cfg(target_os = "linux")]
        {
            let cfg = &self.config.config;
            Ok(Box::new(crate::hal::linux::PiHardware::new(
                cfg.i2c_bus,
                &cfg.iio_root,
                &cfg.w1_root,
            )))
        }
        #[cfg(not(target_os = "linux"))]
        {
            Err(Error::InvalidArgs(
                "sensor hardware needs Linux; run with --demo on this host".into(),
            ))
        }
    }

    fn open_display(&self) -> Box<dyn DisplaySink> {
        let cfg = &self.config.config;
        if !cfg.display_enabled {
            return Box::new(NullDisplay);
        }
        if self.config.demo {
            return Box::new(ConsoleDisplay::new(io::stderr(), usize::from(cfg.cols)));
        }
        #[cfg(target_os = "linux")]
        {
            match crate::display::lcd::open(
                cfg.i2c_bus,
                cfg.pcf8574_addr.clone(),
                cfg.cols,
                cfg.rows,
            ) {
                Ok(lcd) => Box::new(lcd),
                Err(err) => {
                    self.logger
                        .warn(format!("LCD unavailable, continuing without it: {err}"));
                    Box::new(NullDisplay)
                }
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            self.logger
                .warn("LCD needs Linux I2C; continuing without it");
            Box::new(NullDisplay)
        }
    }

    fn open_indicator(&self) -> Box<dyn Indicator> {
        match indicator::open(self.config.config.led_gpio_pin) {
            Ok(led) => led,
            Err(err) => {
                self.logger
                    .warn(format!("status LED unavailable: {err}"));
                Box::new(NoIndicator)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::ManualClock;
    use crate::app::indicator::testing::RecordingIndicator;
    use crate::display::{DisplayEntry, MemoryDisplay};
    use crate::sensor::testing::ScriptedSensor;
    use crate::sensor::SensorHandle;
    use crate::storage::ShortName;
    use std::fs;
    use tempfile::tempdir;

    fn quiet() -> Logger {
        Logger::new(LogLevel::Error, None).unwrap()
    }

    fn acquisition(value: f64, interval_ms: u64) -> Acquisition {
        let mut registry = Registry::new();
        registry.push(SensorHandle::new(Box::new(ScriptedSensor::constant("X", value))).unwrap());
        init_sensors(&mut registry, &quiet());
        Acquisition::new(
            registry,
            PollScheduler::new(interval_ms),
            RetryPolicy::default(),
        )
    }

    fn formatter() -> DisplayFormatter {
        DisplayFormatter::new(vec![DisplayEntry::new("X", "X:", "V")]).unwrap()
    }

    struct DeadStorage;

    impl Storage for DeadStorage {
        fn ready(&mut self) -> Result<()> {
            Err(Error::InvalidArgs("no card".into()))
        }

        fn exists(&self, _name: &str) -> bool {
            false
        }

        fn open_append(&mut self, _name: &str) -> Result<Box<dyn Write>> {
            Err(Error::Io(io::Error::other("card removed")))
        }
    }

    #[test]
    fn cli_overrides_file_settings() {
        let opts = RunOptions {
            storage_dir: Some("/media/card".into()),
            log_filename: Some("bench.csv".into()),
            interval_ms: Some(500),
            no_storage: true,
            no_display: true,
            demo: true,
            cycles: Some(2),
            log_level: Some(LogLevel::Debug),
            ..RunOptions::default()
        };
        let app = AppConfig::from_sources(Config::default(), opts).unwrap();
        assert_eq!(app.config.storage_dir, PathBuf::from("/media/card"));
        assert_eq!(app.config.log_filename, "bench.csv");
        assert_eq!(app.config.poll_interval_ms, 500);
        assert!(!app.config.storage_enabled);
        assert!(!app.config.display_enabled);
        assert!(app.demo);
        assert_eq!(app.cycles, Some(2));
        assert_eq!(app.log_level, LogLevel::Debug);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let opts = RunOptions {
            interval_ms: Some(10),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), opts).is_err());
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = tempdir().unwrap();
        let opts = RunOptions {
            config_path: Some(dir.path().join("nope.toml").to_string_lossy().into_owned()),
            ..RunOptions::default()
        };
        assert!(load_config(&opts).is_err());

        let path = dir.path().join("sensorlog.toml");
        fs::write(&path, "poll_interval_ms = 250\n").unwrap();
        let opts = RunOptions {
            config_path: Some(path.to_string_lossy().into_owned()),
            ..RunOptions::default()
        };
        assert_eq!(load_config(&opts).unwrap().poll_interval_ms, 250);
    }

    #[test]
    fn session_writes_header_and_records() {
        let dir = tempdir().unwrap();
        let name: ShortName = "log.txt".parse().unwrap();
        let writer = LogWriter::create(FsStorage::new(dir.path()), &name, 3, Duration::ZERO);
        let mut session = Session::new(acquisition(1.5, 3000), formatter(), Some(writer));
        let clock = ManualClock::new(0);
        let mut out = Vec::new();
        let mut display = MemoryDisplay::new();
        let logger = quiet();

        session.start(&mut out, &logger).unwrap();
        assert!(session.step(clock.now_ms(), &mut out, &mut display, &logger).unwrap().is_none());
        clock.set(3001);
        let record = session
            .step(clock.now_ms(), &mut out, &mut display, &logger)
            .unwrap()
            .unwrap();
        assert_eq!(record.len(), 2);

        assert_eq!(String::from_utf8(out).unwrap(), "Time(s), X\n3,1.50\n");
        let stored = fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert_eq!(stored, "# Time(s), X\n3,1.50\n");
        assert_eq!(display.frames.len(), 1);
        assert_eq!(display.frames[0][0], "X:1.5V    ");
        assert_eq!(display.frames[0][3], "           t:0.00hrs");
    }

    #[test]
    fn identical_frames_are_not_redrawn() {
        let mut session: Session<FsStorage> = Session::new(acquisition(2.0, 100), formatter(), None);
        let mut out = Vec::new();
        let mut display = MemoryDisplay::new();
        let logger = quiet();
        for now in [101, 202, 303] {
            session.step(now, &mut out, &mut display, &logger).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
        assert_eq!(display.frames.len(), 1);
    }

    #[test]
    fn storage_exhaustion_stops_the_session() {
        let name: ShortName = "log.txt".parse().unwrap();
        let writer = LogWriter::create(DeadStorage, &name, 2, Duration::ZERO);
        let mut session = Session::new(acquisition(1.0, 100), formatter(), Some(writer));
        let mut display = MemoryDisplay::new();
        let err = session
            .step(101, &mut Vec::new(), &mut display, &quiet())
            .unwrap_err();
        assert!(matches!(err, Error::StorageExhausted { attempts: 2, .. }));
    }

    #[test]
    fn run_loop_honours_cycle_limit_and_shutdown() {
        let mut session: Session<FsStorage> = Session::new(acquisition(1.0, 1), formatter(), None);
        let clock = BootClock::new();
        let mut out = Vec::new();
        let mut display = MemoryDisplay::new();
        let running = AtomicBool::new(true);
        let done = run_loop(
            &mut session,
            &clock,
            &mut out,
            &mut display,
            &quiet(),
            &running,
            Some(2),
        )
        .unwrap();
        assert_eq!(done, 2);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);

        running.store(false, Ordering::SeqCst);
        let mut out = Vec::new();
        let done = run_loop(&mut session, &clock, &mut out, &mut display, &quiet(), &running, None)
            .unwrap();
        assert_eq!(done, 0);
    }

    #[test]
    fn storage_wait_stops_on_shutdown() {
        let mut led = RecordingIndicator::default();
        let running = AtomicBool::new(false);
        assert!(!wait_for_storage(
            &mut DeadStorage,
            &mut led,
            &running,
            &quiet(),
            Duration::ZERO
        ));

        let dir = tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path());
        assert!(wait_for_storage(&mut storage, &mut led, &running, &quiet(), Duration::ZERO));
        assert!(led.states.is_empty());
    }

    #[test]
    fn failed_init_disables_only_that_sensor() {
        let mut registry = Registry::new();
        registry.push(
            SensorHandle::new(Box::new(ScriptedSensor::constant("A", 1.0).failing_init())).unwrap(),
        );
        registry.push(SensorHandle::new(Box::new(ScriptedSensor::constant("B", 2.0))).unwrap());
        init_sensors(&mut registry, &quiet());
        assert!(registry.handles()[0].is_disabled());
        assert!(!registry.handles()[1].is_disabled());
    }
}
