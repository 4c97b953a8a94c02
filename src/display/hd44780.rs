//! HD44780 character LCD in 4-bit mode behind a PCF8574 backpack.
//!
//! Backpack wiring: P0 = RS, P1 = RW, P2 = E, P3 = backlight, P4..P7 = D4..D7.

use std::time::Duration;

use embedded_hal::i2c::I2c;

use super::pcf8574::Pcf8574;
use crate::Result;

const MASK_RS: u8 = 0x01;
const MASK_E: u8 = 0x04;
const SHIFT_BACKLIGHT: u8 = 3;
const SHIFT_DATA: u8 = 4;

const LCD_CLR: u8 = 0x01;
const LCD_HOME: u8 = 0x02;
const LCD_ENTRY_MODE: u8 = 0x04;
const LCD_ENTRY_INC: u8 = 0x02;
const LCD_ON_CTRL: u8 = 0x08;
const LCD_ON_DISPLAY: u8 = 0x04;
const LCD_FUNCTION: u8 = 0x20;
const LCD_FUNCTION_2LINES: u8 = 0x08;
const LCD_FUNCTION_RESET: u8 = 0x30;
const LCD_DDRAM: u8 = 0x80;

pub struct Hd44780<I2C> {
    expander: Pcf8574<I2C>,
    cols: u8,
    rows: u8,
    backlight: bool,
}

impl<I2C: I2c> Hd44780<I2C> {
    /// Runs the power-on reset sequence and leaves the display on, cleared,
    /// with the backlight lit.
    pub fn new(expander: Pcf8574<I2C>, cols: u8, rows: u8) -> Result<Self> {
        let mut lcd = Self {
            expander,
            cols: cols.min(40),
            rows: rows.clamp(1, 4),
            backlight: true,
        };

        lcd.expander.write_byte(0)?;
        sleep_ms(20);
        lcd.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(5);
        lcd.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(1);
        lcd.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(1);
        lcd.write_init_nibble(LCD_FUNCTION)?;
        sleep_ms(1);

        let mut function = LCD_FUNCTION;
        if lcd.rows > 1 {
            function |= LCD_FUNCTION_2LINES;
        }
        lcd.write_command(function)?;
        lcd.write_command(LCD_ON_CTRL)?;
        lcd.clear()?;
        lcd.write_command(LCD_ENTRY_MODE | LCD_ENTRY_INC)?;
        lcd.write_command(LCD_ON_CTRL | LCD_ON_DISPLAY)?;
        Ok(lcd)
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn clear(&mut self) -> Result<()> {
        self.write_command(LCD_CLR)?;
        self.write_command(LCD_HOME)
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<()> {
        self.backlight = on;
        self.expander.write_byte(self.backlight_mask())
    }

    pub fn display_off(&mut self) -> Result<()> {
        self.write_command(LCD_ON_CTRL)
    }

    /// Overwrites a whole row, padding with spaces so stale characters from a
    /// longer previous frame disappear without a full clear.
    pub fn write_line(&mut self, row: u8, text: &str) -> Result<()> {
        self.move_to(0, row)?;
        let width = usize::from(self.cols);
        let padded = format!("{text:<width$}");
        for ch in padded.chars().take(width) {
            self.write_data(glyph(ch))?;
        }
        Ok(())
    }

    fn move_to(&mut self, col: u8, row: u8) -> Result<()> {
        let row = row % self.rows;
        let mut addr = col & 0x3f;
        if row & 1 == 1 {
            addr += 0x40;
        }
        if row & 2 == 2 {
            addr += self.cols;
        }
        self.write_command(LCD_DDRAM | addr)
    }

    fn write_init_nibble(&mut self, nibble: u8) -> Result<()> {
        let byte = ((nibble >> 4) & 0x0f) << SHIFT_DATA;
        self.expander.write_byte(byte | MASK_E)?;
        self.expander.write_byte(byte)
    }

    fn write_command(&mut self, cmd: u8) -> Result<()> {
        self.write_nibble(cmd, false)?;
        self.write_nibble(cmd << 4, false)?;
        if cmd <= 3 {
            // Clear and home take far longer than other commands.
            sleep_ms(5);
        }
        Ok(())
    }

    fn write_data(&mut self, data: u8) -> Result<()> {
        self.write_nibble(data, true)?;
        self.write_nibble(data << 4, true)
    }

    fn write_nibble(&mut self, nibble: u8, is_data: bool) -> Result<()> {
        let mut byte = self.backlight_mask();
        if is_data {
            byte |= MASK_RS;
        }
        byte |= (nibble >> 4) << SHIFT_DATA;
        self.expander.write_byte(byte | MASK_E)?;
        self.expander.write_byte(byte)
    }

    fn backlight_mask(&self) -> u8 {
        if self.backlight {
            1 << SHIFT_BACKLIGHT
        } else {
            0
        }
    }

    #[cfg(test)]
    pub(crate) fn expander(&self) -> &Pcf8574<I2C> {
        &self.expander
    }
}

/// Character ROM A00 covers printable ASCII; anything else shows as '?'.
fn glyph(ch: char) -> u8 {
    if ch.is_ascii() && !ch.is_ascii_control() {
        ch as u8
    } else {
        b'?'
    }
}

fn sleep_ms(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}
