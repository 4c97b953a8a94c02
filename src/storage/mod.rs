//! Durable storage for the log: the medium itself, 8.3 file naming and the
//! retrying line writer.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub mod filename;
pub mod telemetry;
pub mod writer;

pub use filename::ShortName;
pub use writer::LogWriter;

/// Raw primitives of the storage medium.
pub trait Storage {
    /// Ok once the medium is mounted and usable.
    fn ready(&mut self) -> Result<()>;
    fn exists(&self, name: &str) -> bool;
    fn open_append(&mut self, name: &str) -> Result<Box<dyn Write>>;
}

/// A directory on a mounted filesystem (an SD card or USB stick on the Pi).
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for FsStorage {
    // Never creates the directory; an unmounted card reads as not ready.
    fn ready(&mut self) -> Result<()> {
        let meta = fs::metadata(&self.root)
            .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", self.root.display()))))?;
        if !meta.is_dir() {
            return Err(Error::InvalidArgs(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(Error::InvalidArgs(format!(
                "{} is read-only",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.path_of(name).exists()
    }

    fn open_append(&mut self, name: &str) -> Result<Box<dyn Write>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_of(name))?;
        Ok(Box::new(file))
    }
}
