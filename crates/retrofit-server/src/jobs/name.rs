//! Register job names
//!
//! `<yyyyMMdd>_<HHmmss>_<TRIGGER>_<file>` where `<file>` is the last segment of the object key
//! without its `.csv` extension, e.g. `20240301_093000_RETROFIT_CSV_FROM_S3_fleet-march`.
//! The file part is cut so the whole name fits the `job_name` column.

use chrono::{DateTime, Utc};
use retrofit_common::types::RegisterJobTrigger;

const CSV_EXTENSION: &str = ".csv";

/// Width of `t_register_job.job_name`
pub const MAX_JOB_NAME_LENGTH: usize = 256;

pub fn job_name(now: DateTime<Utc>, trigger: RegisterJobTrigger, filename: &str) -> String {
    let file = filename.rsplit('/').next().unwrap_or(filename);
    let file = file.strip_suffix(CSV_EXTENSION).unwrap_or(file);

    let prefix = format!("{}_{}_", now.format("%Y%m%d_%H%M%S"), trigger.as_str());
    let budget = MAX_JOB_NAME_LENGTH.saturating_sub(prefix.len());
    let end = file
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= budget)
        .last()
        .unwrap_or(0);

    format!("{}{}", prefix, &file[..end])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap()
    }

    #[test]
    fn test_job_name() {
        assert_eq!(
            job_name(at(), RegisterJobTrigger::RetrofitCsvFromS3, "fleet-march.csv"),
            "20240301_093005_RETROFIT_CSV_FROM_S3_fleet-march"
        );
    }

    #[test]
    fn test_job_name_uses_last_key_segment() {
        assert_eq!(
            job_name(at(), RegisterJobTrigger::GreenModCsvFromS3, "uploads/2024/green.csv"),
            "20240301_093005_GREEN_MOD_CSV_FROM_S3_green"
        );
    }

    #[test]
    fn test_job_name_without_extension() {
        assert_eq!(
            job_name(at(), RegisterJobTrigger::WhiteModCsvFromS3, "white.CSV"),
            "20240301_093005_WHITE_MOD_CSV_FROM_S3_white.CSV"
        );
    }

    #[test]
    fn test_job_name_truncates_long_keys() {
        let filename = format!("uploads/{}.csv", "a".repeat(300));

        let name = job_name(at(), RegisterJobTrigger::GreenModCsvFromS3, &filename);

        assert_eq!(name.len(), MAX_JOB_NAME_LENGTH);
        assert!(name.starts_with("20240301_093005_GREEN_MOD_CSV_FROM_S3_aaa"));
    }

    #[test]
    fn test_job_name_truncates_on_char_boundary() {
        let filename = "é".repeat(200);

        let name = job_name(at(), RegisterJobTrigger::RetrofitCsvFromS3, &filename);

        assert!(name.len() <= MAX_JOB_NAME_LENGTH);
        assert!(name.len() >= MAX_JOB_NAME_LENGTH - 1);
        assert!(name.ends_with('é'));
    }
}
