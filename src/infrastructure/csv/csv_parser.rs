// ============================================================
// CSV PARSER
// ============================================================
// Parse delimited text with encoding fallback and delimiter detection

use csv::{ReaderBuilder, Trim};
use encoding_rs::WINDOWS_1252;

use super::RawTable;
use crate::domain::error::AppError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Delimiters considered when sniffing the header line.
const CANDIDATE_DELIMITERS: [u8; 2] = [b',', b';'];

/// CSV parser for legacy portfolio exports
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,

    /// Maximum allowed record length in bytes
    max_record_length: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            max_record_length: 1024 * 1024, // 1MB
        }
    }
}

impl CsvParser {
    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse text whose delimiter is sniffed from the header line
    pub fn parse_auto_detect(content: &str) -> Result<RawTable, AppError> {
        let header_line = content.lines().next().unwrap_or("");
        let delimiter = Self::detect_delimiter(header_line);

        Self::default().with_delimiter(delimiter).parse_content(content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<RawTable, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::None)
            .flexible(true) // Legacy exports often drop trailing empty cells
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::FormatError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(AppError::FormatError("CSV header row is empty".to_string()));
        }

        let mut records = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::FormatError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.as_slice().len() > self.max_record_length {
                return Err(AppError::FormatError(format!(
                    "CSV row {} exceeds {} bytes",
                    index + 1,
                    self.max_record_length
                )));
            }

            records.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(RawTable { headers, records })
    }

    /// Pick the candidate delimiter occurring most often in the header line.
    ///
    /// Quoted sections are ignored. Ties fall back to comma.
    pub fn detect_delimiter(header_line: &str) -> u8 {
        let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
        let mut in_quotes = false;

        for byte in header_line.bytes() {
            if byte == b'"' {
                in_quotes = !in_quotes;
                continue;
            }
            if in_quotes {
                continue;
            }
            if let Some(pos) = CANDIDATE_DELIMITERS.iter().position(|&d| d == byte) {
                counts[pos] += 1;
            }
        }

        let mut best = 0;
        for pos in 1..counts.len() {
            if counts[pos] > counts[best] {
                best = pos;
            }
        }
        CANDIDATE_DELIMITERS[best]
    }
}

/// Decode uploaded text: UTF-8 (BOM stripped) with a Windows-1252 fallback.
pub fn decode_text(bytes: &[u8]) -> Result<String, AppError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if bytes.contains(&0) {
        return Err(AppError::FormatError(
            "Input contains binary data and is not delimited text".to_string(),
        ));
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => {
            // Spreadsheet tools on Windows still export ANSI code pages
            let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
            if had_errors {
                return Err(AppError::FormatError(
                    "Input is neither UTF-8 nor Windows-1252 text".to_string(),
                ));
            }
            Ok(text.into_owned())
        }
    }
}
