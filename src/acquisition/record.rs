/// One cycle's row: elapsed whole seconds, then one value per channel in
/// schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    elapsed_s: u64,
    values: Vec<f64>,
}

impl Record {
    pub fn new(poll_ms: u64, values: Vec<f64>) -> Self {
        Self {
            elapsed_s: poll_ms / 1000,
            values,
        }
    }

    pub fn elapsed_s(&self) -> u64 {
        self.elapsed_s
    }

    /// Channel values only, without the time column.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Field count including the time column.
    pub fn len(&self) -> usize {
        self.values.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// NaN is written the way `f64` formats it (`NaN`).
    pub fn to_csv_line(&self) -> String {
        let mut line = self.elapsed_s.to_string();
        for value in &self.values {
            line.push(',');
            line.push_str(&format!("{value:.2}"));
        }
        line
    }
}
