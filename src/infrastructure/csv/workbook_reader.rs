// ============================================================
// WORKBOOK READER
// ============================================================
// First worksheet of an xlsx/xls workbook as a raw table

use std::io::Cursor;

use calamine::{Data, DataType, Range, Reader, Xls, Xlsx};

use super::RawTable;
use crate::domain::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookKind {
    /// Office Open XML (zip container)
    Xlsx,
    /// Legacy BIFF (OLE compound document)
    Xls,
}

pub struct WorkbookReader;

impl WorkbookReader {
    /// Read the first sheet; the first row is the header.
    pub fn read_first_sheet(bytes: &[u8], kind: WorkbookKind) -> Result<RawTable, AppError> {
        let cursor = Cursor::new(bytes.to_vec());

        let range = match kind {
            WorkbookKind::Xlsx => {
                let mut workbook: Xlsx<_> = Xlsx::new(cursor).map_err(|e| {
                    AppError::FormatError(format!("Failed to open Excel workbook: {}", e))
                })?;
                first_range(workbook.worksheet_range_at(0).map(|r| r.map_err(|e| e.to_string())))?
            }
            WorkbookKind::Xls => {
                let mut workbook: Xls<_> = Xls::new(cursor).map_err(|e| {
                    AppError::FormatError(format!("Failed to open Excel workbook: {}", e))
                })?;
                first_range(workbook.worksheet_range_at(0).map(|r| r.map_err(|e| e.to_string())))?
            }
        };

        Ok(range_to_table(&range))
    }
}

fn first_range(
    range: Option<std::result::Result<Range<Data>, String>>,
) -> Result<Range<Data>, AppError> {
    range
        .ok_or_else(|| AppError::FormatError("No worksheet found in workbook".to_string()))?
        .map_err(|e| AppError::FormatError(format!("Failed to read worksheet: {}", e)))
}

fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows().map(|row| {
        row.iter()
            .map(|cell| {
                cell.as_string()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("{}", cell))
            })
            .collect::<Vec<String>>()
    });

    let headers = rows
        .next()
        .map(|h| h.into_iter().map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();

    RawTable {
        headers,
        records: rows.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_xlsx_is_format_error() {
        let bytes = b"PK\x03\x04not really a zip archive";
        let err = WorkbookReader::read_first_sheet(bytes, WorkbookKind::Xlsx).unwrap_err();
        assert!(matches!(err, AppError::FormatError(_)));
    }

    #[test]
    fn test_corrupt_xls_is_format_error() {
        let bytes = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00];
        let err = WorkbookReader::read_first_sheet(&bytes, WorkbookKind::Xls).unwrap_err();
        assert!(matches!(err, AppError::FormatError(_)));
    }

    #[test]
    fn test_range_to_table_uses_first_row_as_header() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String(" Unità ".to_string()));
        range.set_value((0, 1), Data::String("Mq".to_string()));
        range.set_value((1, 0), Data::String("A1".to_string()));
        range.set_value((1, 1), Data::Float(56.0));
        range.set_value((2, 0), Data::String("B2".to_string()));

        let table = range_to_table(&range);
        assert_eq!(table.headers, vec!["Unità", "Mq"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0], vec!["A1".to_string(), "56".to_string()]);
        assert_eq!(table.records[1][1], "");
    }
}
