// ============================================================
// TABULAR INFRASTRUCTURE LAYER
// ============================================================
// Delimited text and workbook readers producing header + raw records

mod csv_parser;
mod workbook_reader;

pub use csv_parser::{decode_text, CsvParser};
pub use workbook_reader::{WorkbookKind, WorkbookReader};

/// Header row plus raw data records, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}
