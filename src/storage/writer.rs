use std::io::Write;
use std::thread;
use std::time::Duration;

use super::filename::ShortName;
use super::telemetry::{OpenPhase, StorageEvent};
use super::Storage;
use crate::app::Logger;
use crate::{Error, Result};

/// Appends lines to one file whose name is fixed when the writer is made.
/// Every append opens, writes one line and closes again.
pub struct LogWriter<S> {
    storage: S,
    filename: String,
    attempts: u32,
    retry_delay: Duration,
}

impl<S: Storage> LogWriter<S> {
    /// Picks the first free rotation of `requested` on `storage`.
    pub fn create(storage: S, requested: &ShortName, attempts: u32, retry_delay: Duration) -> Self {
        let filename = requested.next_available(|name| storage.exists(name));
        Self {
            storage,
            filename,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Fails with [`Error::StorageExhausted`] once every open attempt failed.
    pub fn append_line(&mut self, line: &str, logger: &Logger) -> Result<()> {
        let delay_ms = self.retry_delay.as_millis() as u64;
        for attempt in 1..=self.attempts {
            match self.storage.open_append(&self.filename) {
                Ok(mut out) => {
                    writeln!(out, "{line}")?;
                    out.flush()?;
                    if attempt > 1 {
                        self.trace(logger, OpenPhase::Success, attempt, delay_ms);
                    }
                    return Ok(());
                }
                Err(err) => {
                    logger.warn(format!(
                        "could not open {} ({err}); attempt {attempt}/{}",
                        self.filename, self.attempts
                    ));
                    self.trace(logger, OpenPhase::Retry, attempt, delay_ms);
                    if attempt < self.attempts && !self.retry_delay.is_zero() {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        self.trace(logger, OpenPhase::Exhausted, self.attempts, delay_ms);
        Err(Error::StorageExhausted {
            filename: self.filename.clone(),
            attempts: self.attempts,
        })
    }

    fn trace(&self, logger: &Logger, phase: OpenPhase, attempt: u32, delay_ms: u64) {
        let event = StorageEvent::open(phase, attempt, self.attempts, delay_ms, &self.filename);
        if let Ok(line) = event.to_json() {
            logger.debug(line);
        }
    }
}
