//! Single-line CSV tokenizer
//!
//! Supports RFC 4180 quoting within one physical line: quoted fields may contain commas, and
//! `""` inside a quoted field stands for one `"`. Embedded line breaks are not supported.
//!
//! Length, character, trailing comma and quote placement checks run on the raw line before it is
//! handed to the `csv` reader.

use thiserror::Error;

pub const MAX_LINE_LENGTH: usize = 100;
pub const EXPECTED_FIELD_COUNT: usize = 4;

/// Why a line could not be split into fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineParseError {
    #[error("Line is too long (actual value: {actual}, allowed value: {max}).", max = MAX_LINE_LENGTH)]
    TooLong { actual: usize },

    #[error("Line contains invalid character(s), is empty or has trailing comma character.")]
    InvalidCharacters,

    #[error(
        "Line contains invalid number of fields (actual value: {actual}, allowable value: {expected}).",
        expected = EXPECTED_FIELD_COUNT
    )]
    InvalidFieldCount { actual: usize },

    #[error("Line contains a quoted field that is not closed properly.")]
    MalformedQuotes,
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '_' | ' '
                | '&'
                | ','
                | '\''
                | '"'
                | '-'
                | '('
                | ')'
                | '.'
                | '*'
                | '/'
                | '%'
                | '!'
                | '+'
                | ':'
                | ';'
                | '='
                | '?'
                | '@'
                | '['
                | ']'
                | '^'
                | '{'
                | '}'
                | '~'
        )
}

fn reader_builder() -> ::csv::ReaderBuilder {
    let mut builder = ::csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

/// Split one line into exactly [`EXPECTED_FIELD_COUNT`] unquoted fields
pub fn parse_line(line: &str) -> Result<Vec<String>, LineParseError> {
    let length = line.chars().count();
    if length > MAX_LINE_LENGTH {
        return Err(LineParseError::TooLong { actual: length });
    }

    if line.is_empty() || !line.chars().all(is_allowed) || line.trim_end().ends_with(',') {
        return Err(LineParseError::InvalidCharacters);
    }

    if line.matches('"').count() % 2 != 0 || !quotes_close_cleanly(line) {
        return Err(LineParseError::MalformedQuotes);
    }

    let fields = split_fields(line)?;
    if fields.len() != EXPECTED_FIELD_COUNT {
        return Err(LineParseError::InvalidFieldCount {
            actual: fields.len(),
        });
    }

    Ok(fields)
}

/// A quoted field must close on this line, right before a comma or the line end
fn quotes_close_cleanly(line: &str) -> bool {
    let mut chars = line.chars().peekable();
    let mut field_start = true;

    while let Some(c) = chars.next() {
        if !(field_start && c == '"') {
            field_start = c == ',';
            continue;
        }

        loop {
            match chars.next() {
                Some('"') if chars.peek() == Some(&'"') => {
                    chars.next();
                },
                Some('"') => break,
                Some(_) => {},
                None => return false,
            }
        }

        match chars.next() {
            Some(',') => field_start = true,
            Some(_) => return false,
            None => return true,
        }
    }

    true
}

fn split_fields(line: &str) -> Result<Vec<String>, LineParseError> {
    let mut reader = reader_builder().from_reader(line.as_bytes());
    let mut record = ::csv::StringRecord::new();

    let found = reader
        .read_record(&mut record)
        .map_err(|_| LineParseError::MalformedQuotes)?;
    if !found {
        return Ok(Vec::new());
    }

    Ok(record.iter().map(str::to_string).collect())
}
