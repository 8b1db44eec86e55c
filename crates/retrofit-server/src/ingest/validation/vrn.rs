use regex::Regex;

use super::{subject_of, RowValidator, ValidationError};
use crate::ingest::models::VehicleRow;

pub const MAX_VRN_LENGTH: usize = 7;

const VRN_PATTERN: &str = concat!(
    r"^(?:",
    r"[A-Za-z]{3}[0-9]{1,4}",
    r"|[A-Za-z][0-9]{1,3}[A-Za-z]{3}",
    r"|[A-Za-z]{3}[0-9]{1,3}[A-Za-z]",
    r"|[A-Za-z]{2}[0-9]{2}[A-Za-z]{3}",
    r"|[A-Za-z]{1,3}[0-9]{1,3}",
    r"|[0-9]{1,4}[A-Za-z]{1,3}",
    r"|[A-Za-z]{1,2}[0-9]{1,4}",
    r")$"
);

pub const MISSING_VRN: &str = "Data does not include the 'vrn' field which is mandatory.";
pub const INVALID_VRN_FORMAT: &str = "Invalid format of VRN (regex validation).";

/// Checks presence, length and format of the vehicle registration number
pub struct VrnValidator {
    pattern: Regex,
}

impl VrnValidator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(VRN_PATTERN)?,
        })
    }
}

impl RowValidator for VrnValidator {
    fn validate(&self, row: &VehicleRow) -> Vec<ValidationError> {
        let Some(vrn) = row.vrn.as_deref() else {
            return vec![ValidationError::missing_field(None, MISSING_VRN)];
        };

        let length = vrn.chars().count();
        if length == 0 || length > MAX_VRN_LENGTH {
            return vec![ValidationError::value_error(
                subject_of(row),
                format!(
                    "VRN should have from 1 to {} characters instead of {}.",
                    MAX_VRN_LENGTH, length
                ),
            )];
        }

        if !self.pattern.is_match(vrn) {
            return vec![ValidationError::value_error(subject_of(row), INVALID_VRN_FORMAT)];
        }

        Vec::new()
    }
}
