//! Polling engine: scheduler gate, per-channel retry and record assembly.

pub mod record;
pub mod retry;
pub mod scheduler;

pub use record::Record;
pub use retry::{ReadOutcome, RetryPolicy};
pub use scheduler::{BootClock, Clock, ManualClock, PollScheduler};

use crate::registry::Registry;
use crate::schema::Schema;

pub struct Acquisition {
    registry: Registry,
    schema: Schema,
    scheduler: PollScheduler,
    retry: RetryPolicy,
    extra_reads: u32,
}

impl Acquisition {
    /// Expects a registry whose handles have already been initialised, so the
    /// schema reflects the final labels.
    pub fn new(registry: Registry, scheduler: PollScheduler, retry: RetryPolicy) -> Self {
        let schema = Schema::from_registry(&registry);
        Self {
            registry,
            schema,
            scheduler,
            retry,
            extra_reads: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Boot-relative time of the most recent cycle.
    pub fn last_poll_ms(&self) -> u64 {
        self.scheduler.last_poll_ms()
    }

    /// Runs one cycle if the interval has elapsed at `now_ms`.
    pub fn poll_if_due(&mut self, now_ms: u64) -> Option<Record> {
        if self.scheduler.due(now_ms) {
            Some(self.run_cycle())
        } else {
            None
        }
    }

    /// Reads every channel of every handle in registry order. This is the only
    /// place the handles' last readings change.
    pub fn run_cycle(&mut self) -> Record {
        let mut values = Vec::with_capacity(self.schema.total_channels() - 1);
        let mut extra_reads = 0;
        for handle in self.registry.handles_mut() {
            for channel in 0..handle.channel_count() {
                let ReadOutcome { value, attempts } = self.retry.read(handle, channel);
                extra_reads += attempts - 1;
                handle.set_last_reading(channel, value);
                values.push(value);
            }
        }
        self.extra_reads = extra_reads;
        Record::new(self.scheduler.last_poll_ms(), values)
    }

    /// Re-reads spent on NaN values during the most recent cycle.
    pub fn last_cycle_retries(&self) -> u32 {
        self.extra_reads
    }
}
