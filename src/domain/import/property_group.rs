use serde::{Deserialize, Serialize};

use super::NormalizedRow;

/// Valid rows sharing one property name, in original row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyGroup {
    pub property_name: String,
    pub rows: Vec<NormalizedRow>,
}

impl PropertyGroup {
    pub fn new(property_name: String) -> Self {
        Self {
            property_name,
            rows: Vec::new(),
        }
    }

    pub fn row_indices(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.row_index).collect()
    }
}
