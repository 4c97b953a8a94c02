//! Picks named channels out of the registry and renders them into the four
//! fixed-width status lines.
//!
//! Every cell is `prefix + value + unit` and aims for ten characters. Values
//! are rounded by magnitude, trailing zeros are dropped, and an over-long cell
//! gets one more, coarser rounding. A cell that still does not fit is shown
//! as is.

use std::str::FromStr;

use crate::registry::Registry;
use crate::{Error, Result};

/// Stand-in for a channel no handle provides.
pub const UNAVAILABLE: f64 = -196.6;
pub const CELL_WIDTH: usize = 10;
/// Two cells side by side; the narrowest panel the layout fits on.
pub const LINE_WIDTH: usize = 2 * CELL_WIDTH;
pub const DISPLAY_ROWS: usize = 4;
pub const MAX_ENTRIES: usize = 2 * DISPLAY_ROWS;

const UNAVAILABLE_TEXT: &str = "--";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEntry {
    pub lookup: String,
    pub prefix: String,
    pub unit: String,
}

impl DisplayEntry {
    pub fn new(lookup: &str, prefix: &str, unit: &str) -> Self {
        Self {
            lookup: lookup.to_string(),
            prefix: prefix.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// Parses `<lookup>|<prefix>|<unit>`.
impl FromStr for DisplayEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('|').collect();
        match parts.as_slice() {
            [lookup, prefix, unit] if !lookup.trim().is_empty() => {
                Ok(Self::new(lookup.trim(), prefix, unit))
            }
            _ => Err(Error::InvalidArgs(format!(
                "display entry '{s}' must look like <label>|<prefix>|<unit>"
            ))),
        }
    }
}

impl std::fmt::Display for DisplayEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.lookup, self.prefix, self.unit)
    }
}

/// Finds which channel of a combined `"a, b, c"` label answers to `target`.
/// Each channel is matched against what is left of the label after cutting
/// one leading `"label, "` segment per channel already passed.
pub fn channel_index(combined: &str, channel_count: u8, target: &str) -> Option<u8> {
    let mut remaining = combined;
    for channel in 0..channel_count {
        if remaining == target || remaining.starts_with(target) {
            return Some(channel);
        }
        match remaining.find(", ") {
            Some(pos) => remaining = &remaining[pos + 2..],
            None => break,
        }
    }
    None
}

/// Last reading of the first handle exposing `lookup`, or [`UNAVAILABLE`].
pub fn lookup_value(registry: &Registry, lookup: &str) -> f64 {
    registry
        .handles()
        .iter()
        .find_map(|handle| {
            channel_index(&handle.combined_label(), handle.channel_count(), lookup)
                .map(|channel| handle.last_reading(channel))
        })
        .unwrap_or(UNAVAILABLE)
}

pub fn is_unavailable(value: f64) -> bool {
    value.is_nan() || (value - UNAVAILABLE).abs() < 0.01
}

/// Drops fractional trailing zeros, then a bare trailing point.
pub fn strip_trailing_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn render(value: f64) -> String {
    // Rounding a small negative reading yields -0.0, which would print its sign.
    let value = if value == 0.0 { 0.0 } else { value };
    strip_trailing_zeros(&format!("{value:.2}"))
}

/// First-pass rounding: two decimals below 10, one below 100, else whole.
pub fn format_value(value: f64) -> String {
    if is_unavailable(value) {
        return UNAVAILABLE_TEXT.to_string();
    }
    render(ladder_round(value))
}

fn ladder_round(value: f64) -> f64 {
    if value < 10.0 {
        round_to(value, 2)
    } else if value < 100.0 {
        round_to(value, 1)
    } else {
        value.round()
    }
}

/// `prefix + value + unit`, re-rounded once if it runs past the cell width.
pub fn format_cell(entry: &DisplayEntry, value: f64) -> String {
    if is_unavailable(value) {
        return format!("{}{UNAVAILABLE_TEXT}{}", entry.prefix, entry.unit);
    }
    let rounded = ladder_round(value);
    let first = format!("{}{}{}", entry.prefix, render(rounded), entry.unit);
    let len = first.chars().count();
    if len <= CELL_WIDTH {
        return first;
    }
    let coarser = if len - CELL_WIDTH == 1 && rounded < 10.0 {
        round_to(rounded, 1)
    } else {
        rounded.round()
    };
    format!("{}{}{}", entry.prefix, render(coarser), entry.unit)
}

/// Lays cells out two per line: cell `i` on the left padded to the cell
/// width, cell `i + 4` right-aligned in the other half. The right half of
/// the last line always holds the elapsed time in hours. Cells within
/// budget keep every line inside [`LINE_WIDTH`].
pub fn render_lines(cells: &[String], elapsed_ms: u64) -> Vec<String> {
    let mut lines = vec![String::new(); DISPLAY_ROWS];
    for (row, line) in lines.iter_mut().enumerate() {
        let Some(left) = cells.get(row) else {
            continue;
        };
        *line = format!("{left:<width$}", width = CELL_WIDTH);
        if let Some(right) = cells.get(row + DISPLAY_ROWS) {
            line.push_str(&format!("{right:>width$}", width = CELL_WIDTH));
        }
    }
    if cells.len() < DISPLAY_ROWS {
        lines[DISPLAY_ROWS - 1] = " ".repeat(CELL_WIDTH);
    }
    let hours = elapsed_ms as f64 / 3_600_000.0;
    let time = format!("t:{hours:.2}hrs");
    lines[DISPLAY_ROWS - 1].push_str(&format!("{time:>width$}", width = CELL_WIDTH));
    lines
}

/// The curated entry table plus the rendering pipeline over a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFormatter {
    entries: Vec<DisplayEntry>,
}

impl DisplayFormatter {
    pub fn new(entries: Vec<DisplayEntry>) -> Result<Self> {
        if entries.len() > MAX_ENTRIES {
            return Err(Error::InvalidArgs(format!(
                "at most {MAX_ENTRIES} display entries fit on the screen, got {}",
                entries.len()
            )));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DisplayEntry] {
        &self.entries
    }

    pub fn cells(&self, registry: &Registry) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| format_cell(entry, lookup_value(registry, &entry.lookup)))
            .collect()
    }

    pub fn render(&self, registry: &Registry, elapsed_ms: u64) -> Vec<String> {
        render_lines(&self.cells(registry), elapsed_ms)
    }
}
