//! Structured, row-scoped validation errors

use serde::Serialize;
use std::num::NonZeroUsize;

pub const VALUE_ERROR_TITLE: &str = "Value error";
pub const MISSING_FIELD_TITLE: &str = "Mandatory field missing";
pub const S3_ERROR_TITLE: &str = "S3 error";
pub const UNKNOWN_ERROR_TITLE: &str = "Unknown error";
pub const INTERNAL_ERROR_TITLE: &str = "Internal error";

/// Detail used whenever a job fails for a reason callers should not see
pub const UNKNOWN_ERROR_DETAIL: &str = "Unknown error occurred while processing registration";

/// A problem found in one row, or with the job as a whole when no line is attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    subject_id: Option<String>,
    title: String,
    detail: String,
    line_number: Option<NonZeroUsize>,
}

impl ValidationError {
    fn new(subject_id: Option<String>, title: &str, detail: impl Into<String>) -> Self {
        Self {
            subject_id,
            title: title.to_string(),
            detail: detail.into(),
            line_number: None,
        }
    }

    pub fn missing_field(subject_id: Option<String>, detail: impl Into<String>) -> Self {
        Self::new(subject_id, MISSING_FIELD_TITLE, detail)
    }

    pub fn value_error(subject_id: Option<String>, detail: impl Into<String>) -> Self {
        Self::new(subject_id, VALUE_ERROR_TITLE, detail)
    }

    pub fn s3_error(detail: impl Into<String>) -> Self {
        Self::new(None, S3_ERROR_TITLE, detail)
    }

    pub fn unknown() -> Self {
        Self::new(None, UNKNOWN_ERROR_TITLE, UNKNOWN_ERROR_DETAIL)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(None, INTERNAL_ERROR_TITLE, detail)
    }

    /// Attach a 1-based line number. Zero is not a line and leaves the error unnumbered.
    pub fn at_line(mut self, line_number: usize) -> Self {
        self.line_number = NonZeroUsize::new(line_number);
        self
    }

    /// Same error with its unprefixed detail replaced
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn line_number(&self) -> Option<usize> {
        self.line_number.map(NonZeroUsize::get)
    }

    /// Detail as shown to users, prefixed with `Line N: ` when a line is known
    pub fn detail(&self) -> String {
        match self.line_number {
            Some(line) => format!("Line {}: {}", line, self.detail),
            None => self.detail.clone(),
        }
    }

    pub fn raw_detail(&self) -> &str {
        &self.detail
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.detail())
    }
}
