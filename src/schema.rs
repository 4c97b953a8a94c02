//! Column header shared by the console, the log file and every record.

use crate::registry::Registry;

pub const TIME_LABEL: &str = "Time(s)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    labels: Vec<String>,
}

impl Schema {
    /// Built once, after every handle has been initialised.
    pub fn from_registry(registry: &Registry) -> Self {
        let mut labels = vec![TIME_LABEL.to_string()];
        for handle in registry.handles() {
            labels.extend(handle.labels().iter().cloned());
        }
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Time column included.
    pub fn total_channels(&self) -> usize {
        self.labels.len()
    }

    pub fn header(&self) -> String {
        self.labels.join(", ")
    }

    /// Header as written to the log file.
    pub fn comment_line(&self) -> String {
        format!("# {}", self.header())
    }
}
