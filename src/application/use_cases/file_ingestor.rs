// ============================================================
// FILE INGESTOR
// ============================================================
// Detect the upload format and turn it into ordered source rows

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::error::{AppError, Result};
use crate::domain::import::SourceRow;
use crate::infrastructure::csv::{decode_text, CsvParser, RawTable, WorkbookKind, WorkbookReader};

const ZIP_SIGNATURE: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const OLE_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    DelimitedText,
    Xlsx,
    Xls,
}

/// What the uploader claims the file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclaredType {
    Text,
    Workbook,
    #[default]
    Unknown,
}

impl DeclaredType {
    /// Accepts a MIME type, a file name or a bare extension.
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.trim().to_lowercase();
        let mime = hint.split(';').next().unwrap_or("").trim();

        match mime {
            "text/csv" | "text/plain" | "text/tab-separated-values" | "application/csv" => {
                return DeclaredType::Text
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => return DeclaredType::Workbook,
            _ => {}
        }

        let extension = hint.rsplit('.').next().unwrap_or(hint.as_str());
        match extension {
            "csv" | "txt" => DeclaredType::Text,
            "xlsx" | "xls" | "xlsm" => DeclaredType::Workbook,
            _ => DeclaredType::Unknown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub format: FileFormat,
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
    /// Cells past the last header, dropped from their rows
    pub overflow_cells: usize,
}

impl ParsedFile {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Sniff the byte signature. Anything not a known container is treated as text.
pub fn detect_format(bytes: &[u8]) -> FileFormat {
    if bytes.starts_with(ZIP_SIGNATURE) {
        FileFormat::Xlsx
    } else if bytes.starts_with(OLE_SIGNATURE) {
        FileFormat::Xls
    } else {
        FileFormat::DelimitedText
    }
}

/// Parse an upload into source rows. Fails before yielding any row on
/// unreadable input.
pub fn parse(bytes: &[u8], declared: DeclaredType) -> Result<ParsedFile> {
    if bytes.is_empty() {
        return Err(AppError::FormatError("Uploaded file is empty".to_string()));
    }

    let format = detect_format(bytes);
    if declared == DeclaredType::Workbook && format == FileFormat::DelimitedText {
        return Err(AppError::FormatError(
            "Declared spreadsheet does not carry a workbook signature".to_string(),
        ));
    }

    let table = match format {
        FileFormat::Xlsx => WorkbookReader::read_first_sheet(bytes, WorkbookKind::Xlsx)?,
        FileFormat::Xls => WorkbookReader::read_first_sheet(bytes, WorkbookKind::Xls)?,
        FileFormat::DelimitedText => {
            let text = decode_text(bytes)?;
            CsvParser::parse_auto_detect(&text)?
        }
    };

    let parsed = into_rows(format, table);
    info!(
        format = ?parsed.format,
        columns = parsed.headers.len(),
        rows = parsed.rows.len(),
        "Parsed upload"
    );
    Ok(parsed)
}

fn into_rows(format: FileFormat, table: RawTable) -> ParsedFile {
    let RawTable { headers, records } = table;
    let total = records.len();
    let overflow_cells: usize = records
        .iter()
        .map(|values| values.len().saturating_sub(headers.len()))
        .sum();

    let rows: Vec<SourceRow> = records
        .into_iter()
        .map(|values| SourceRow::new(0, &headers, values))
        .filter(|row| !row.is_blank())
        .enumerate()
        .map(|(index, mut row)| {
            row.index = index;
            row
        })
        .collect();

    if rows.len() < total {
        debug!(dropped = total - rows.len(), "Dropped blank rows");
    }
    if overflow_cells > 0 {
        debug!(overflow_cells, "Dropped cells beyond the header row");
    }

    ParsedFile {
        format,
        headers,
        rows,
        overflow_cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_from_hint() {
        assert_eq!(DeclaredType::from_hint("text/csv"), DeclaredType::Text);
        assert_eq!(DeclaredType::from_hint("text/csv; charset=utf-8"), DeclaredType::Text);
        assert_eq!(DeclaredType::from_hint("Portfolio 2024.XLSX"), DeclaredType::Workbook);
        assert_eq!(DeclaredType::from_hint("application/vnd.ms-excel"), DeclaredType::Workbook);
        assert_eq!(DeclaredType::from_hint("csv"), DeclaredType::Text);
        assert_eq!(DeclaredType::from_hint("application/octet-stream"), DeclaredType::Unknown);
    }

    #[test]
    fn test_detect_format_by_signature() {
        assert_eq!(detect_format(b"PK\x03\x04rest"), FileFormat::Xlsx);
        assert_eq!(detect_format(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1]), FileFormat::Xls);
        assert_eq!(detect_format(b"Nome;Email"), FileFormat::DelimitedText);
    }

    #[test]
    fn test_parse_semicolon_csv() {
        let bytes = "Condominio;Unità;Email\nResidenza Sole;A1;a@example.com\nResidenza Sole;A2;b@example.com\n";
        let parsed = parse(bytes.as_bytes(), DeclaredType::Text).unwrap();

        assert_eq!(parsed.format, FileFormat::DelimitedText);
        assert_eq!(parsed.headers, vec!["Condominio", "Unità", "Email"]);
        assert_eq!(parsed.row_count(), 2);
        assert_eq!(parsed.rows[1].value_at(1), Some("A2"));
    }

    #[test]
    fn test_blank_rows_are_dropped_and_indices_stay_dense() {
        let bytes = "Condominio,Unità\nSole,A1\n,\nSole,A2\n";
        let parsed = parse(bytes.as_bytes(), DeclaredType::Unknown).unwrap();

        assert_eq!(parsed.row_count(), 2);
        assert_eq!(parsed.rows[0].index, 0);
        assert_eq!(parsed.rows[1].index, 1);
        assert_eq!(parsed.rows[1].value_at(1), Some("A2"));
    }

    #[test]
    fn test_cells_beyond_header_are_counted() {
        let bytes = "Condominio,Unità\nSole,A1,extra,more\nSole,A2\n";
        let parsed = parse(bytes.as_bytes(), DeclaredType::Text).unwrap();

        assert_eq!(parsed.overflow_cells, 2);
        assert_eq!(parsed.rows[0].cells.len(), 2);
        assert_eq!(parsed.rows[0].value_at(2), None);
        assert_eq!(parsed.rows[1].value_at(1), Some("A2"));
    }

    #[test]
    fn test_parse_xlsx_reads_first_sheet_only() {
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let units = workbook.add_worksheet();
        units.write_string(0, 0, "Condominio").unwrap();
        units.write_string(0, 1, "Unità").unwrap();
        units.write_string(0, 2, "Mq").unwrap();
        units.write_string(1, 0, "Residenza Sole").unwrap();
        units.write_string(1, 1, "A1").unwrap();
        units.write_number(1, 2, 56.0).unwrap();
        units.write_string(2, 0, "Residenza Sole").unwrap();
        units.write_string(2, 1, "A2").unwrap();
        units.write_number(2, 2, 72.5).unwrap();

        let notes = workbook.add_worksheet();
        notes.set_name("Note").unwrap();
        notes.write_string(0, 0, "Promemoria").unwrap();
        notes.write_string(1, 0, "non importare").unwrap();

        let bytes = workbook.save_to_buffer().unwrap();
        let parsed = parse(&bytes, DeclaredType::from_hint("export.xlsx")).unwrap();

        assert_eq!(parsed.format, FileFormat::Xlsx);
        assert_eq!(parsed.headers, vec!["Condominio", "Unità", "Mq"]);
        assert_eq!(parsed.row_count(), 2);
        assert_eq!(parsed.rows[0].value_at(1), Some("A1"));
        assert_eq!(parsed.rows[0].value_at(2), Some("56"));
        assert_eq!(parsed.rows[1].value_at(2), Some("72.5"));
        assert!(parsed
            .rows
            .iter()
            .all(|row| row.cells.iter().all(|(_, v)| v != "non importare")));
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let parsed = parse(b"Condominio,Email\n", DeclaredType::Text).unwrap();
        assert_eq!(parsed.headers.len(), 2);
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn test_empty_input_is_format_error() {
        assert!(matches!(
            parse(b"", DeclaredType::Text),
            Err(AppError::FormatError(_))
        ));
    }

    #[test]
    fn test_declared_workbook_without_signature_is_rejected() {
        let result = parse(b"Condominio,Email\nSole,a@example.com", DeclaredType::Workbook);
        assert!(matches!(result, Err(AppError::FormatError(_))));
    }

    #[test]
    fn test_corrupt_workbook_is_format_error() {
        let result = parse(b"PK\x03\x04 not really a zip", DeclaredType::Workbook);
        assert!(matches!(result, Err(AppError::FormatError(_))));
    }

    #[test]
    fn test_binary_text_is_format_error() {
        let result = parse(&[0x00, 0x01, 0x02, 0x03], DeclaredType::Unknown);
        assert!(matches!(result, Err(AppError::FormatError(_))));
    }
}
