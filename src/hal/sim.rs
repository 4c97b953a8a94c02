//! Bench backend for `--demo`: every chip answers with a slow deterministic
//! waveform so the pipeline can run on any host.

use super::{
    Adc, AnalogPin, AtmosphericSample, Barometer, Hardware, OneWireBus, PowerMonitor, RomCode,
};
use crate::Result;

fn wave(step: u32, period: u32, base: f64, amplitude: f64) -> f64 {
    let phase = f64::from(step % period) / f64::from(period);
    base + amplitude * (phase * std::f64::consts::TAU).sin()
}

#[derive(Default)]
pub struct SimulatedHardware;

impl SimulatedHardware {
    pub fn new() -> Self {
        Self
    }
}

impl Hardware for SimulatedHardware {
    fn analog_pin(&mut self, pin: u8) -> Box<dyn AnalogPin> {
        Box::new(SimPin { pin, step: 0 })
    }

    fn adc(&mut self) -> Box<dyn Adc> {
        Box::new(SimAdc { step: 0 })
    }

    fn barometer(&mut self) -> Box<dyn Barometer> {
        Box::new(SimBarometer { step: 0 })
    }

    fn one_wire(&mut self, _pin: u8) -> Box<dyn OneWireBus> {
        Box::new(SimOneWire { step: 0 })
    }

    fn power_monitor(&mut self, addr: u8) -> Box<dyn PowerMonitor> {
        Box::new(SimPowerMonitor { addr, step: 0 })
    }
}

struct SimPin {
    pin: u8,
    step: u32,
}

impl AnalogPin for SimPin {
    fn read_raw(&mut self) -> Result<u16> {
        self.step = self.step.wrapping_add(1);
        let offset = f64::from(self.pin) * 40.0;
        let counts = wave(self.step, 120, 300.0 + offset, 80.0);
        Ok(counts.clamp(0.0, 1023.0) as u16)
    }
}

struct SimAdc {
    step: u32,
}

impl Adc for SimAdc {
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_volts(&mut self, pin: u8) -> Result<f64> {
        self.step = self.step.wrapping_add(1);
        // Pins sit on different parts of the 0.4..3.3 V span the calibrated
        // sensors expect.
        let base = 0.8 + 0.6 * f64::from(pin % 4);
        Ok(wave(self.step, 90, base, 0.3))
    }
}

struct SimBarometer {
    step: u32,
}

impl Barometer for SimBarometer {
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn measure(&mut self) -> Result<AtmosphericSample> {
        self.step = self.step.wrapping_add(1);
        Ok(AtmosphericSample {
            pressure_pa: wave(self.step, 600, 101_325.0, 250.0),
            humidity_pct: wave(self.step, 300, 48.0, 6.0),
            temperature_c: wave(self.step, 400, 21.0, 2.5),
        })
    }
}

struct SimOneWire {
    step: u32,
}

impl OneWireBus for SimOneWire {
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn request_temperatures(&mut self) -> Result<()> {
        self.step = self.step.wrapping_add(1);
        Ok(())
    }

    fn temperature_c(&mut self, rom: &RomCode) -> Result<f64> {
        let offset = f64::from(rom.0[1] % 8);
        Ok(wave(self.step, 200, 18.0 + offset, 1.5))
    }
}

struct SimPowerMonitor {
    addr: u8,
    step: u32,
}

impl PowerMonitor for SimPowerMonitor {
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn power_mw(&mut self) -> Result<f64> {
        self.step = self.step.wrapping_add(1);
        let base = 400.0 + 150.0 * f64::from(self.addr & 0x0f);
        Ok(wave(self.step, 150, base, 120.0))
    }

    fn bus_voltage_v(&mut self) -> Result<f64> {
        Ok(wave(self.step, 500, 12.4, 0.4))
    }

    fn shunt_voltage_mv(&mut self) -> Result<f64> {
        Ok(wave(self.step, 150, 4.0, 1.0))
    }
}
