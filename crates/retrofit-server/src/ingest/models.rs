//! Row and record types flowing through CSV ingestion

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Field positions in a register CSV line
pub const VRN_FIELD: usize = 0;
pub const VEHICLE_CATEGORY_FIELD: usize = 1;
pub const MODEL_FIELD: usize = 2;
pub const DATE_OF_RETROFIT_INSTALLATION_FIELD: usize = 3;

/// Fields of one parsed CSV line, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source file, used for diagnostics only
    pub line_number: Option<usize>,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line_number: Option<usize>, fields: Vec<String>) -> Self {
        Self {
            line_number,
            fields,
        }
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

/// A raw row with its fields mapped onto named, still unvalidated, attributes
///
/// Whitespace is removed from the VRN, and empty category or model values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleRow {
    pub line_number: Option<usize>,
    pub vrn: Option<String>,
    pub vehicle_category: Option<String>,
    pub model: Option<String>,
    pub date_of_retrofit_installation: Option<String>,
}

impl From<&RawRow> for VehicleRow {
    fn from(row: &RawRow) -> Self {
        Self {
            line_number: row.line_number,
            vrn: row
                .field(VRN_FIELD)
                .map(|vrn| vrn.chars().filter(|c| !c.is_whitespace()).collect()),
            vehicle_category: row.field(VEHICLE_CATEGORY_FIELD).and_then(empty_to_none),
            model: row.field(MODEL_FIELD).and_then(empty_to_none),
            date_of_retrofit_installation: row
                .field(DATE_OF_RETROFIT_INSTALLATION_FIELD)
                .map(str::to_string),
        }
    }
}

fn empty_to_none(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// A validated vehicle, keyed by its VRN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub vrn: String,
    pub vehicle_category: Option<String>,
    pub model: Option<String>,
    pub date_of_retrofit_installation: NaiveDate,
}
