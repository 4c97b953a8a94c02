use std::thread;
use std::time::Duration;

use crate::Result;

pub const BLINK_PERIOD: Duration = Duration::from_millis(100);

/// A single status LED.
pub trait Indicator {
    fn set(&mut self, on: bool);
}

/// Used when no LED pin is configured.
pub struct NoIndicator;

impl Indicator for NoIndicator {
    fn set(&mut self, _on: bool) {}
}

/// GPIO LED wired active-low: driving the pin low lights it.
#[cfg(target_os = "linux")]
pub struct StatusLed {
    pin: rppal::gpio::OutputPin,
}

#[cfg(target_os = "linux")]
impl StatusLed {
    pub fn new(bcm_pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new()
            .map_err(|e| crate::Error::Hardware(format!("gpio: {e}")))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| crate::Error::Hardware(format!("gpio {bcm_pin}: {e}")))?
            .into_output_high();
        Ok(Self { pin })
    }
}

#[cfg(target_os = "linux")]
impl Indicator for StatusLed {
    fn set(&mut self, on: bool) {
        if on {
            self.pin.set_low();
        } else {
            self.pin.set_high();
        }
    }
}

/// Opens the configured LED, or a no-op indicator when there is none.
pub fn open(pin: Option<u8>) -> Result<Box<dyn Indicator>> {
    match pin {
        None => Ok(Box::new(NoIndicator)),
        #[cfg(target_os = "linux")]
        Some(pin) => Ok(Box::new(StatusLed::new(pin)?)),
        #[cfg(not(target_os = "linux"))]
        Some(pin) => Err(crate::Error::InvalidArgs(format!(
            "led_gpio_pin {pin} needs a Linux GPIO controller"
        ))),
    }
}

/// Two quick flashes then a pause: the storage medium is not ready yet.
pub fn double_blink(led: &mut dyn Indicator, period: Duration) {
    for _ in 0..2 {
        led.set(true);
        sleep(period);
        led.set(false);
        sleep(period);
    }
    sleep(period * 6);
}

/// One full on/off toggle pair of the fatal pattern.
pub fn fatal_blink(led: &mut dyn Indicator, period: Duration) {
    led.set(true);
    sleep(period);
    led.set(false);
    sleep(period);
}

fn sleep(period: Duration) {
    if !period.is_zero() {
        thread::sleep(period);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Indicator;

    /// Records every state change.
    #[derive(Debug, Default)]
    pub struct RecordingIndicator {
        pub states: Vec<bool>,
    }

    impl Indicator for RecordingIndicator {
        fn set(&mut self, on: bool) {
            self.states.push(on);
        }
    }
}
