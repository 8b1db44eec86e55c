//! Raw row to vehicle record conversion

use crate::ingest::models::{RawRow, VehicleRecord, VehicleRow};
use crate::ingest::validation::{date::parse_iso_date, RowValidation, ValidationError};

/// Outcome of converting one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Success(VehicleRecord),
    Failure(Vec<ValidationError>),
}

/// Records and errors from converting many rows
#[derive(Debug, Default)]
pub struct ConvertedRows {
    /// Records in line order, duplicates included
    pub records: Vec<VehicleRecord>,
    pub errors: Vec<ValidationError>,
}

/// Validates rows and turns the valid ones into [`VehicleRecord`]s
pub struct RowConverter {
    validation: RowValidation,
}

impl RowConverter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self::with_validation(RowValidation::new()?))
    }

    pub fn with_validation(validation: RowValidation) -> Self {
        Self { validation }
    }

    /// Convert one row. A row with any validation error is never converted.
    pub fn convert(&self, row: &RawRow) -> ConversionResult {
        let vehicle_row = VehicleRow::from(row);
        let errors = self.validation.validate(&vehicle_row);
        if !errors.is_empty() {
            return ConversionResult::Failure(errors);
        }

        let date = vehicle_row
            .date_of_retrofit_installation
            .as_deref()
            .and_then(parse_iso_date);

        match (vehicle_row.vrn, date) {
            (Some(vrn), Some(date_of_retrofit_installation)) => {
                ConversionResult::Success(VehicleRecord {
                    vrn,
                    vehicle_category: vehicle_row.vehicle_category,
                    model: vehicle_row.model,
                    date_of_retrofit_installation,
                })
            },
            _ => ConversionResult::Failure(vec![ValidationError::internal(
                "Row passed validation but could not be converted",
            )]),
        }
    }

    /// Convert rows in order, stopping once `max_errors` errors have been collected
    pub fn convert_all(&self, rows: &[RawRow], max_errors: usize) -> ConvertedRows {
        let mut converted = ConvertedRows::default();

        for row in rows {
            match self.convert(row) {
                ConversionResult::Success(record) => converted.records.push(record),
                ConversionResult::Failure(errors) => {
                    converted.errors.extend(errors);
                    if converted.errors.len() >= max_errors {
                        converted.errors.truncate(max_errors);
                        break;
                    }
                },
            }
        }

        converted
    }
}
