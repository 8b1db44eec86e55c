//! Reading a register CSV file into raw rows
//!
//! Lines are numbered from 1. A UTF-8 byte-order mark is skipped and invalid UTF-8 is replaced,
//! which then fails the character check of the affected line. Blank lines are not skipped, they
//! fail the same check. Reading stops once `max_errors` line errors have been collected.

pub mod line_parser;

pub use line_parser::{parse_line, LineParseError};

use crate::ingest::models::RawRow;
use crate::ingest::validation::{message, ValidationError};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Everything read from one file
#[derive(Debug, Default)]
pub struct CsvContent {
    pub rows: Vec<RawRow>,
    pub errors: Vec<ValidationError>,
    /// Number of lines in the file
    pub line_count: usize,
    /// False when reading stopped early at the error limit
    pub fully_read: bool,
}

impl CsvContent {
    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }
}

impl LineParseError {
    /// Row-scoped error for this failure on the given line
    pub fn into_validation_error(self, line_number: usize) -> ValidationError {
        message::with_header_hint(
            ValidationError::value_error(None, self.to_string()).at_line(line_number),
        )
    }
}

pub fn read_rows(bytes: &[u8], max_errors: usize) -> CsvContent {
    let decoded = String::from_utf8_lossy(bytes);
    let text = decoded
        .strip_prefix(BYTE_ORDER_MARK)
        .unwrap_or(decoded.as_ref());

    let mut content = CsvContent {
        line_count: text.lines().count(),
        fully_read: true,
        ..Default::default()
    };

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        match parse_line(line) {
            Ok(fields) => content.rows.push(RawRow::new(Some(line_number), fields)),
            Err(e) => {
                content.errors.push(e.into_validation_error(line_number));
                if content.errors.len() >= max_errors {
                    content.fully_read = line_number == content.line_count;
                    break;
                }
            },
        }
    }

    if content.fully_read {
        if let Some(last) = content.errors.pop() {
            let last = if last.line_number() == Some(content.line_count) {
                message::with_trailing_row_hint(last)
            } else {
                last
            };
            content.errors.push(last);
        }
    }

    content
}
