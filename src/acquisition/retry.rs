use std::thread;
use std::time::Duration;

use crate::sensor::SensorHandle;

pub const DEFAULT_READ_ATTEMPTS: u32 = 11;

/// Bounded re-read while a channel keeps answering NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

/// Final value of one channel plus how many reads it took.
#[derive(Debug, Clone, Copy)]
pub struct ReadOutcome {
    pub value: f64,
    pub attempts: u32,
}

impl RetryPolicy {
    /// `attempts` counts the first read; zero is treated as one.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn read(&self, handle: &mut SensorHandle, channel: u8) -> ReadOutcome {
        let mut value = f64::NAN;
        for attempt in 1..=self.attempts {
            value = handle.get_reading(channel);
            if !value.is_nan() {
                return ReadOutcome {
                    value,
                    attempts: attempt,
                };
            }
            if attempt < self.attempts && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }
        ReadOutcome {
            value,
            attempts: self.attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_READ_ATTEMPTS, Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::testing::ScriptedSensor;

    #[test]
    fn stops_at_first_valid_value() {
        let nan = f64::NAN;
        let sensor = ScriptedSensor::constant("X", 7.0).then(&[nan, nan, nan, nan, nan, 42.0]);
        let reads = sensor.reads.clone();
        let mut handle = SensorHandle::new(Box::new(sensor)).unwrap();

        let outcome = RetryPolicy::default().read(&mut handle, 0);
        assert_eq!(outcome.value, 42.0);
        assert_eq!(outcome.attempts, 6);
        assert_eq!(reads.get(), 6);
    }

    #[test]
    fn gives_up_after_eleven_reads() {
        let sensor = ScriptedSensor::constant("X", f64::NAN);
        let reads = sensor.reads.clone();
        let mut handle = SensorHandle::new(Box::new(sensor)).unwrap();

        let outcome = RetryPolicy::default().read(&mut handle, 0);
        assert!(outcome.value.is_nan());
        assert_eq!(outcome.attempts, 11);
        assert_eq!(reads.get(), 11);
    }

    #[test]
    fn disabled_handle_never_reaches_driver() {
        let sensor = ScriptedSensor::constant("X", 1.0).failing_init();
        let reads = sensor.reads.clone();
        let mut handle = SensorHandle::new(Box::new(sensor)).unwrap();
        let _ = handle.init();

        let outcome = RetryPolicy::default().read(&mut handle, 0);
        assert!(outcome.value.is_nan());
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn zero_attempts_still_reads_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.attempts(), 1);
    }
}
