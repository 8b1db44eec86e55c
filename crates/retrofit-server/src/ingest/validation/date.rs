use chrono::NaiveDate;

use super::{subject_of, RowValidator, ValidationError};
use crate::ingest::models::VehicleRow;

pub const MISSING_DATE: &str =
    "Data does not include the 'date of retrofit installation' field which is mandatory.";
pub const INVALID_DATE_FORMAT: &str =
    "Invalid format of date of retrofit installation, should be ISO 8601.";

/// Parse a strict `YYYY-MM-DD` calendar date
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !shaped {
        return None;
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub struct DateOfRetrofitInstallationValidator;

impl RowValidator for DateOfRetrofitInstallationValidator {
    fn validate(&self, row: &VehicleRow) -> Vec<ValidationError> {
        match row.date_of_retrofit_installation.as_deref() {
            None => vec![ValidationError::missing_field(subject_of(row), MISSING_DATE)],
            Some(value) if parse_iso_date(value).is_none() => {
                vec![ValidationError::value_error(subject_of(row), INVALID_DATE_FORMAT)]
            },
            Some(_) => Vec::new(),
        }
    }
}
