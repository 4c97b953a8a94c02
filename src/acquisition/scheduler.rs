use std::cell::Cell;
use std::time::Instant;

/// Milliseconds since the process came up.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

pub struct BootClock {
    started: Instant,
}

impl BootClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for BootClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for BootClock {
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Non-blocking fixed-interval gate. A cycle is due once strictly more than
/// `interval_ms` has passed since the last one.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    interval_ms: u64,
    last_poll_ms: u64,
}

impl PollScheduler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_poll_ms: 0,
        }
    }

    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_poll_ms) > self.interval_ms {
            self.last_poll_ms = now_ms;
            true
        } else {
            false
        }
    }

    pub fn last_poll_ms(&self) -> u64 {
        self.last_poll_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}
