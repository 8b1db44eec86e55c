use super::{subject_of, RowValidator, ValidationError};
use crate::ingest::models::VehicleRow;

pub const MAX_VEHICLE_CATEGORY_LENGTH: usize = 40;
pub const MAX_MODEL_LENGTH: usize = 30;

/// Rejects optional text attributes that are present but too long
pub struct MaxLengthValidator {
    field_name: &'static str,
    max_length: usize,
    value: fn(&VehicleRow) -> Option<&str>,
}

impl MaxLengthValidator {
    pub fn vehicle_category() -> Self {
        Self {
            field_name: "vehicleCategory",
            max_length: MAX_VEHICLE_CATEGORY_LENGTH,
            value: |row| row.vehicle_category.as_deref(),
        }
    }

    pub fn model() -> Self {
        Self {
            field_name: "model",
            max_length: MAX_MODEL_LENGTH,
            value: |row| row.model.as_deref(),
        }
    }
}

impl RowValidator for MaxLengthValidator {
    fn validate(&self, row: &VehicleRow) -> Vec<ValidationError> {
        match (self.value)(row) {
            Some(value) if !value.is_empty() && value.chars().count() > self.max_length => {
                vec![ValidationError::value_error(
                    subject_of(row),
                    format!(
                        "'{}' should have from 1 to {} characters instead of {}.",
                        self.field_name,
                        self.max_length,
                        value.chars().count()
                    ),
                )]
            },
            _ => Vec::new(),
        }
    }
}
