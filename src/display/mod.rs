//! Status display: formatting of the curated channel table and the sinks
//! that receive the four rendered lines.

use std::io::Write;

use crc32fast::Hasher;

use crate::Result;

pub mod format;
pub mod hd44780;
pub mod lcd;
pub mod pcf8574;

pub use format::{DisplayEntry, DisplayFormatter};

/// Receives whole frames, one string per row, to be drawn from the top-left.
pub trait DisplaySink {
    fn show(&mut self, lines: &[String]) -> Result<()>;

    fn set_backlight(&mut self, _on: bool) -> Result<()> {
        Ok(())
    }

    /// Blank the panel before the process exits.
    fn power_off(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Used when the display is disabled.
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn show(&mut self, _lines: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Draws frames as a boxed block on a text stream (stderr in `--demo`).
pub struct ConsoleDisplay<W: Write> {
    out: W,
    width: usize,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self { out, width }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySink for ConsoleDisplay<W> {
    fn show(&mut self, lines: &[String]) -> Result<()> {
        let border = format!("+{}+", "-".repeat(self.width));
        writeln!(self.out, "{border}")?;
        for line in lines {
            let clipped: String = line.chars().take(self.width).collect();
            writeln!(self.out, "|{clipped:<width$}|", width = self.width)?;
        }
        writeln!(self.out, "{border}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps every frame it is shown.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    pub frames: Vec<Vec<String>>,
    pub backlight: Option<bool>,
    pub powered_off: bool,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&[String]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl DisplaySink for MemoryDisplay {
    fn show(&mut self, lines: &[String]) -> Result<()> {
        self.frames.push(lines.to_vec());
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<()> {
        self.backlight = Some(on);
        Ok(())
    }

    fn power_off(&mut self) -> Result<()> {
        self.powered_off = true;
        Ok(())
    }
}

/// CRC32 of the last frame sent, so unchanged frames are not redrawn.
#[derive(Debug, Default)]
pub struct FrameCache {
    last_crc: Option<u32>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True (and remembered) when `lines` differs from the previous frame.
    pub fn is_new(&mut self, lines: &[String]) -> bool {
        let crc = checksum_frame(lines);
        if self.last_crc == Some(crc) {
            return false;
        }
        self.last_crc = Some(crc);
        true
    }

    /// Forget the last frame, e.g. after a banner replaced it.
    pub fn invalidate(&mut self) {
        self.last_crc = None;
    }
}

fn checksum_frame(lines: &[String]) -> u32 {
    let mut hasher = Hasher::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn dedupes_identical_frames() {
        let mut cache = FrameCache::new();
        assert!(cache.is_new(&frame(&["a", "b"])));
        assert!(!cache.is_new(&frame(&["a", "b"])));
        // Same characters, different split across rows.
        assert!(cache.is_new(&frame(&["ab", ""])));
        cache.invalidate();
        assert!(cache.is_new(&frame(&["ab", ""])));
    }

    #[test]
    fn console_display_boxes_lines() {
        let mut console = ConsoleDisplay::new(Vec::new(), 4);
        console.show(&frame(&["ab", "abcdef"])).unwrap();
        let text = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(text, "+----+\n|ab  |\n|abcd|\n+----+\n");
    }

    #[test]
    fn memory_display_records_frames() {
        let mut sink = MemoryDisplay::new();
        sink.show(&frame(&["x"])).unwrap();
        sink.show(&frame(&["y"])).unwrap();
        sink.power_off().unwrap();
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.last_frame(), Some(&frame(&["y"])[..]));
        assert!(sink.powered_off);
    }
}
