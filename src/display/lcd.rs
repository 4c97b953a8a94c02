use embedded_hal::i2c::I2c;

use super::hd44780::Hd44780;
use super::pcf8574::{self, Pcf8574};
use super::DisplaySink;
use crate::config::Pcf8574Addr;
use crate::{Error, Result};

/// Status panel: the HD44780 driver plus the row bounds the sink contract
/// needs.
pub struct Lcd<I2C> {
    driver: Hd44780<I2C>,
}

impl<I2C: I2c> Lcd<I2C> {
    pub fn new(mut bus: I2C, addr: Pcf8574Addr, cols: u8, rows: u8) -> Result<Self> {
        let addr = match addr {
            Pcf8574Addr::Auto => pcf8574::detect_address(&mut bus, &pcf8574::CANDIDATE_ADDRS)
                .unwrap_or(pcf8574::DEFAULT_ADDR),
            Pcf8574Addr::Addr(addr) => addr,
        };
        let driver = Hd44780::new(Pcf8574::new(bus, addr), cols, rows)?;
        Ok(Self { driver })
    }

    pub fn cols(&self) -> u8 {
        self.driver.cols()
    }

    pub fn rows(&self) -> u8 {
        self.driver.rows()
    }

    pub fn write_line(&mut self, row: u8, content: &str) -> Result<()> {
        if row >= self.driver.rows() {
            return Err(Error::InvalidArgs(format!(
                "row {row} out of bounds for display with {} rows",
                self.driver.rows()
            )));
        }
        self.driver.write_line(row, content)
    }

    #[cfg(test)]
    pub(crate) fn driver(&self) -> &Hd44780<I2C> {
        &self.driver
    }
}

impl<I2C: I2c> DisplaySink for Lcd<I2C> {
    fn show(&mut self, lines: &[String]) -> Result<()> {
        for row in 0..self.driver.rows() {
            let text = lines.get(usize::from(row)).map(String::as_str).unwrap_or("");
            self.write_line(row, text)?;
        }
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<()> {
        self.driver.set_backlight(on)
    }

    fn power_off(&mut self) -> Result<()> {
        self.driver.clear()?;
        self.driver.set_backlight(false)?;
        self.driver.display_off()
    }
}

/// Opens the panel on the Pi's I2C bus.
#[cfg(target_os = "linux")]
pub fn open(i2c_bus: u8, addr: Pcf8574Addr, cols: u8, rows: u8) -> Result<Lcd<rppal::i2c::I2c>> {
    let bus = rppal::i2c::I2c::with_bus(i2c_bus)
        .map_err(|e| Error::Hardware(format!("/dev/i2c-{i2c_bus}: {e}")))?;
    Lcd::new(bus, addr, cols, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::hd44780::tests::decode;
    use crate::hal::registers::fake::FakeI2c;

    fn panel() -> Lcd<FakeI2c> {
        let mut bus = FakeI2c::default();
        bus.present = vec![0x3f, 0x25];
        Lcd::new(bus, Pcf8574Addr::Auto, 20, 4).unwrap()
    }

    #[test]
    fn autodetects_backpack_address() {
        let lcd = panel();
        assert_eq!(lcd.driver().expander().addr(), 0x25);
    }

    #[test]
    fn rejects_out_of_bounds_row() {
        let mut lcd = panel();
        let err = lcd.write_line(4, "oops").unwrap_err();
        assert!(format!("{err}").contains("out of bounds"));
    }

    #[test]
    fn show_writes_every_row() {
        let mut lcd = panel();
        let before = lcd.driver().expander().bus().raw.len();
        lcd.show(&["one".to_string(), "two".to_string()]).unwrap();
        let decoded = decode(&lcd.driver().expander().bus().raw[before..]);
        let commands = decoded.iter().filter(|&&(rs, _)| !rs).count();
        let data = decoded.iter().filter(|&&(rs, _)| rs).count();
        assert_eq!(commands, 4);
        assert_eq!(data, 80);
    }
}
