use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenPhase {
    Retry,
    Success,
    Exhausted,
}

/// One open-for-append outcome, logged as a single JSON line.
#[derive(Debug, Serialize)]
pub struct StorageEvent<'a> {
    pub ts_ms: u128,
    pub event: &'static str,
    pub phase: OpenPhase,
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub file: &'a str,
}

impl<'a> StorageEvent<'a> {
    pub fn open(phase: OpenPhase, attempt: u32, max_attempts: u32, delay_ms: u64, file: &'a str) -> Self {
        Self {
            ts_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            event: "storage_open",
            phase,
            attempt,
            max_attempts,
            delay_ms,
            file,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Parse(format!("telemetry: {e}")))
    }
}
