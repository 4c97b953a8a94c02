pub mod acquisition;
pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod hal;
pub mod registry;
pub mod schema;
pub mod sensor;
pub mod storage;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    InvalidArgs(String),
    Io(std::io::Error),
    Parse(String),
    Hardware(String),
    StorageExhausted { filename: String, attempts: u32 },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgs(msg) => write!(f, "invalid arguments: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::Hardware(msg) => write!(f, "hardware error: {msg}"),
            Error::StorageExhausted { filename, attempts } => write!(
                f,
                "storage failure: could not open \"{filename}\" after {attempts} attempts"
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}
