//! Hints appended to errors that usually come from a stray header or trailing line

use super::error::ValidationError;

pub const HEADER_HINT: &str = "Please make sure you have not included a header row.";
pub const TRAILING_ROW_HINT: &str = "Please make sure you have not included a trailing row.";

/// Append the header hint when the error sits on the first line
pub fn with_header_hint(error: ValidationError) -> ValidationError {
    if error.line_number() == Some(1) {
        append(error, HEADER_HINT)
    } else {
        error
    }
}

pub fn with_trailing_row_hint(error: ValidationError) -> ValidationError {
    append(error, TRAILING_ROW_HINT)
}

fn append(error: ValidationError, hint: &str) -> ValidationError {
    let detail = format!("{} {}", error.raw_detail(), hint);
    error.with_detail(detail)
}
