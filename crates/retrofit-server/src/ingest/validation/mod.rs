//! Row validation
//!
//! Each attribute of a row has its own [`RowValidator`]. [`RowValidation`] runs them in a fixed
//! order (VRN, vehicle category, model, date of retrofit installation) and makes the resulting
//! errors line-aware: errors take the row's line number, and errors on the first line get a hint
//! about header rows.

pub mod date;
pub mod error;
pub mod free_text;
pub mod message;
pub mod vrn;

pub use date::DateOfRetrofitInstallationValidator;
pub use error::ValidationError;
pub use free_text::MaxLengthValidator;
pub use vrn::VrnValidator;

use crate::ingest::models::VehicleRow;

/// Validates one attribute of a row
pub trait RowValidator: Send + Sync {
    fn validate(&self, row: &VehicleRow) -> Vec<ValidationError>;
}

/// Subject id reported on row errors: the VRN when there is one
pub(crate) fn subject_of(row: &VehicleRow) -> Option<String> {
    row.vrn.as_ref().filter(|vrn| !vrn.is_empty()).cloned()
}

/// The full, ordered validator set for register rows
pub struct RowValidation {
    validators: Vec<Box<dyn RowValidator>>,
}

impl RowValidation {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self::with_validators(vec![
            Box::new(VrnValidator::new()?),
            Box::new(MaxLengthValidator::vehicle_category()),
            Box::new(MaxLengthValidator::model()),
            Box::new(DateOfRetrofitInstallationValidator),
        ]))
    }

    pub fn with_validators(validators: Vec<Box<dyn RowValidator>>) -> Self {
        Self { validators }
    }

    pub fn validate(&self, row: &VehicleRow) -> Vec<ValidationError> {
        self.validators
            .iter()
            .flat_map(|validator| validator.validate(row))
            .map(|error| match row.line_number {
                Some(line) => message::with_header_hint(error.at_line(line)),
                None => error,
            })
            .collect()
    }
}
