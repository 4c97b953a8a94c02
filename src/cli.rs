use crate::app::LogLevel;
use crate::{Error, Result};

/// Options for the `run` command; values are `None` when not provided on CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub config_path: Option<String>,
    pub storage_dir: Option<String>,
    pub log_filename: Option<String>,
    pub interval_ms: Option<u64>,
    pub no_storage: bool,
    pub no_display: bool,
    pub demo: bool,
    pub cycles: Option<u64>,
    pub log_level: Option<LogLevel>,
    pub log_file: Option<String>,
}

/// Parsed command-line intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunOptions),
    ShowHelp,
    ShowVersion,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter();
        match iter.next().map(|s| s.as_str()) {
            None => Ok(Command::Run(RunOptions::default())),
            Some("run") => parse_run_options(&mut iter),
            Some("--help") | Some("-h") => Ok(Command::ShowHelp),
            Some("--version") | Some("-V") => Ok(Command::ShowVersion),
            Some(flag) if flag.starts_with('-') => {
                // `run` is implied; start over so the first flag is parsed too.
                let mut iter = args.iter();
                parse_run_options(&mut iter)
            }
            Some(cmd) => Err(Error::InvalidArgs(format!(
                "unknown command '{cmd}', try --help"
            ))),
        }
    }

    pub fn help() -> &'static str {
        concat!(
            "sensorlog - periodic multi-sensor data logger\n",
            "\n",
            "USAGE:\n",
            "  sensorlog [run] [OPTIONS]\n",
            "  sensorlog --help\n",
            "  sensorlog --version\n",
            "\n",
            "OPTIONS:\n",
            "  --config <path>         Config file (default: ~/.sensorlog/config.toml)\n",
            "  --storage-dir <path>    Directory on the storage medium (default: /var/lib/sensorlog)\n",
            "  --log-filename <name>   8.3 name of the data log (default: log.txt)\n",
            "  --interval-ms <number>  Polling interval in milliseconds (default: 3000, min 100)\n",
            "  --no-storage            Print records to stdout only\n",
            "  --no-display            Do not drive the status LCD\n",
            "  --demo                  Use simulated sensors and draw the display on stderr\n",
            "  --cycles <number>       Stop after this many polling cycles\n",
            "  --log-level <level>     error, warn, info, debug or trace (default: info)\n",
            "  --log-file <path>       Also append diagnostics to this file\n",
            "  -h, --help              Show this help\n",
            "  -V, --version           Show version\n",
        )
    }

    pub fn print_help() {
        println!("{}", Self::help());
    }
}

fn parse_run_options(iter: &mut std::slice::Iter<String>) -> Result<Command> {
    let mut opts = RunOptions::default();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--config" => opts.config_path = Some(take_value(flag, iter)?),
            "--storage-dir" => opts.storage_dir = Some(take_value(flag, iter)?),
            "--log-filename" => opts.log_filename = Some(take_value(flag, iter)?),
            "--interval-ms" => {
                let raw = take_value(flag, iter)?;
                opts.interval_ms = Some(raw.parse().map_err(|_| {
                    Error::InvalidArgs("interval-ms must be a positive integer".to_string())
                })?);
            }
            "--no-storage" => opts.no_storage = true,
            "--no-display" => opts.no_display = true,
            "--demo" => opts.demo = true,
            "--cycles" => {
                let raw = take_value(flag, iter)?;
                let cycles: u64 = raw.parse().map_err(|_| {
                    Error::InvalidArgs("cycles must be a positive integer".to_string())
                })?;
                if cycles == 0 {
                    return Err(Error::InvalidArgs("cycles must be at least 1".to_string()));
                }
                opts.cycles = Some(cycles);
            }
            "--log-level" => {
                let raw = take_value(flag, iter)?;
                opts.log_level = Some(raw.parse().map_err(|_| {
                    Error::InvalidArgs(format!(
                        "unknown log level '{raw}' (expected error, warn, info, debug or trace)"
                    ))
                })?);
            }
            "--log-file" => opts.log_file = Some(take_value(flag, iter)?),
            "--help" | "-h" => return Ok(Command::ShowHelp),
            "--version" | "-V" => return Ok(Command::ShowVersion),
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }

    Ok(Command::Run(opts))
}

fn take_value(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::InvalidArgs(format!("expected a value after {flag}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_defaults_with_no_args() {
        let cmd = Command::parse(&[]).unwrap();
        assert_eq!(cmd, Command::Run(RunOptions::default()));
    }

    #[test]
    fn parse_run_with_overrides() {
        let cmd = Command::parse(&args(&[
            "run",
            "--config",
            "/etc/sensorlog.toml",
            "--storage-dir",
            "/media/card",
            "--log-filename",
            "bench.csv",
            "--interval-ms",
            "500",
            "--no-storage",
            "--cycles",
            "3",
            "--log-level",
            "debug",
            "--log-file",
            "/tmp/sensorlog.log",
        ]))
        .unwrap();
        let expected = RunOptions {
            config_path: Some("/etc/sensorlog.toml".into()),
            storage_dir: Some("/media/card".into()),
            log_filename: Some("bench.csv".into()),
            interval_ms: Some(500),
            no_storage: true,
            cycles: Some(3),
            log_level: Some(LogLevel::Debug),
            log_file: Some("/tmp/sensorlog.log".into()),
            ..RunOptions::default()
        };
        assert_eq!(cmd, Command::Run(expected));
    }

    #[test]
    fn parse_run_allows_implicit_subcommand() {
        let cmd = Command::parse(&args(&["--demo", "--no-display"])).unwrap();
        let expected = RunOptions {
            demo: true,
            no_display: true,
            ..RunOptions::default()
        };
        assert_eq!(cmd, Command::Run(expected));
    }

    #[test]
    fn parse_help_and_version() {
        assert_eq!(Command::parse(&args(&["--help"])).unwrap(), Command::ShowHelp);
        assert_eq!(
            Command::parse(&args(&["run", "--demo", "-h"])).unwrap(),
            Command::ShowHelp
        );
        assert_eq!(Command::parse(&args(&["-V"])).unwrap(), Command::ShowVersion);
    }

    #[test]
    fn parse_rejects_bad_values() {
        let err = Command::parse(&args(&["--nope"])).unwrap_err();
        assert!(format!("{err}").contains("unknown flag"));
        assert!(Command::parse(&args(&["--cycles", "0"])).is_err());
        assert!(Command::parse(&args(&["--interval-ms"])).is_err());
        assert!(Command::parse(&args(&["--log-level", "loud"])).is_err());
        assert!(Command::parse(&args(&["serve"])).is_err());
    }
}
