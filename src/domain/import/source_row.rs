// ============================================================
// SOURCE ROW
// ============================================================
// One raw data row exactly as read from the uploaded file

use serde::{Deserialize, Serialize};

/// Ordered header → raw value cells for a single data row.
///
/// Cells are positional so duplicated header text stays addressable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Zero-based index among data rows (header excluded)
    pub index: usize,

    /// (header, value) pairs in column order
    pub cells: Vec<(String, String)>,
}

impl SourceRow {
    pub fn new(index: usize, headers: &[String], values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        let cells = headers
            .iter()
            .map(|h| (h.clone(), values.next().unwrap_or_default()))
            .collect();

        Self { index, cells }
    }

    pub fn headers(&self) -> Vec<String> {
        self.cells.iter().map(|(h, _)| h.clone()).collect()
    }

    /// Raw value at a column position.
    pub fn value_at(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(|(_, v)| v.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}
