//! 8.3 short names and collision-free rotation.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

pub const MAX_BASE: usize = 8;
pub const MAX_EXT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortName {
    base: String,
    ext: String,
}

impl ShortName {
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    fn with_suffix(base: &str, suffix: &str, ext: &str) -> String {
        if ext.is_empty() {
            format!("{base}{suffix}")
        } else {
            format!("{base}{suffix}.{ext}")
        }
    }

    /// The requested name if it is free, otherwise the first free
    /// `base_N.ext`. The base is cut so that base plus suffix stays within
    /// eight characters.
    pub fn next_available(&self, exists: impl Fn(&str) -> bool) -> String {
        let requested = self.to_string();
        if !exists(&requested) {
            return requested;
        }
        let mut n: u32 = 1;
        loop {
            let suffix = format!("_{n}");
            let keep = MAX_BASE.saturating_sub(suffix.len()).min(self.base.len());
            let candidate = Self::with_suffix(&self.base[..keep], &suffix, &self.ext);
            if !exists(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

impl FromStr for ShortName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (base, ext) = match s.rsplit_once('.') {
            Some((base, ext)) => (base, ext),
            None => (s, ""),
        };
        let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-');
        if base.is_empty()
            || base.len() > MAX_BASE
            || ext.len() > MAX_EXT
            || !base.chars().all(valid_char)
            || !ext.chars().all(valid_char)
        {
            return Err(Error::InvalidArgs(format!(
                "log file name '{s}' must be an 8.3 short name (e.g. log.txt)"
            )));
        }
        Ok(Self {
            base: base.to_string(),
            ext: ext.to_string(),
        })
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::with_suffix(&self.base, "", &self.ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn taken(names: &[&str]) -> impl Fn(&str) -> bool {
        let set: HashSet<String> = names.iter().map(|n| n.to_string()).collect();
        move |name| set.contains(name)
    }

    #[test]
    fn keeps_free_name() {
        let name: ShortName = "log.txt".parse().unwrap();
        assert_eq!(name.next_available(taken(&[])), "log.txt");
    }

    #[test]
    fn appends_counter_before_extension() {
        let name: ShortName = "log.txt".parse().unwrap();
        assert_eq!(name.next_available(taken(&["log.txt"])), "log_1.txt");
        assert_eq!(
            name.next_available(taken(&["log.txt", "log_1.txt"])),
            "log_2.txt"
        );
    }

    #[test]
    fn truncates_long_base_to_fit_suffix() {
        let name: ShortName = "sensors1.csv".parse().unwrap();
        assert_eq!(name.next_available(taken(&["sensors1.csv"])), "sensor_1.csv");

        let mut existing = vec!["sensors1.csv".to_string()];
        existing.extend((1..10).map(|n| format!("sensor_{n}.csv")));
        let refs: Vec<&str> = existing.iter().map(String::as_str).collect();
        assert_eq!(name.next_available(taken(&refs)), "senso_10.csv");
    }

    #[test]
    fn handles_names_without_extension() {
        let name: ShortName = "data".parse().unwrap();
        assert_eq!(name.to_string(), "data");
        assert_eq!(name.next_available(taken(&["data"])), "data_1");
    }

    #[test]
    fn rejects_non_short_names() {
        assert!("toolongname.txt".parse::<ShortName>().is_err());
        assert!("log.text".parse::<ShortName>().is_err());
        assert!("../log.txt".parse::<ShortName>().is_err());
        assert!(".txt".parse::<ShortName>().is_err());
    }
}
