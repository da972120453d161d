//! Module for errors.
use std::process::ExitStatus;

use thiserror::Error;

/// Error from validating, planning, or running a retrieval.
#[derive(Debug, Error)]
pub enum FetchErr {
    // Validation errors, detected before any side effect.
    /// No start time was given.
    #[error("must provide at least a start time")]
    MissingArguments,
    /// A date string was not 8 (YYYYMMDD) or 10 (YYYYMMDDHH) digits, or not a real date.
    #[error("invalid time format: {0:?}, expected YYYYMMDD or YYYYMMDDHH")]
    InvalidTimeFormat(String),
    /// The interval is not a positive multiple of 6 hours.
    #[error("invalid interval {0:?}, must be a positive multiple of 6")]
    InvalidInterval(String),
    /// The start time is not at a synoptic hour.
    #[error("invalid cycle hour {0:02}, only 00, 06, 12, and 18 supported")]
    InvalidCycleHour(u32),
    /// The end of the range is earlier than the start.
    #[error("end time {end} is before start time {start}")]
    EndBeforeStart {
        /// Requested start.
        start: String,
        /// Requested end.
        end: String,
    },
    /// Worker mode was entered without a time array.
    #[error("no time array provided for array job")]
    MissingTimeArray,
    /// Worker mode was entered without an array index.
    #[error("no array index provided, pass --index or set {0}")]
    MissingArrayIndex(String),
    /// The array index does not select an element of the time array.
    #[error("array index {index} out of range for time array of length {len}")]
    IndexOutOfRange {
        /// Array index, as supplied.
        index: String,
        /// Number of times in the array.
        len: usize,
    },
    /// The requested range expands to more cycle times than allowed.
    #[error("{count} times requested, more than the maximum of {max}; check your arguments for a typo")]
    RangeTooLarge {
        /// Number of cycle times the range expands to.
        count: usize,
        /// Configured maximum.
        max: usize,
    },
    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Run time errors.
    /// An archive path or member template could not be rendered.
    #[error("bad template {template:?}: {reason}")]
    LocatorTemplateError {
        /// The template text.
        template: String,
        /// What was wrong with it.
        reason: String,
    },
    /// The extraction tool could not be started or exited with a failure.
    #[error("extraction from {archive} failed: {reason}")]
    ExtractionToolFailure {
        /// Archive the tool was reading.
        archive: String,
        /// Exit status or launch failure.
        reason: String,
    },
    /// One or more extractions for a cycle failed.
    #[error("{failed} of {total} extractions failed")]
    ExtractionFailures {
        /// Number of failed archive requests.
        failed: usize,
        /// Number of archive requests attempted.
        total: usize,
    },
    /// The scheduler rejected the job or could not be invoked.
    #[error("job submission failed: {0}")]
    SubmissionFailure(String),

    // Forwarded errors.
    /// Error forwarded from std
    #[error("std lib io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchErr {
    /// Process exit code for this failure class. Every class has its own code so calling
    /// infrastructure can branch on it. Codes 1 and 2 are left to the runtime and to `clap`.
    pub fn exit_code(&self) -> i32 {
        use crate::errors::FetchErr::*;

        match self {
            MissingArguments => 3,
            InvalidTimeFormat(_) => 4,
            InvalidInterval(_) => 5,
            InvalidCycleHour(_) => 6,
            EndBeforeStart { .. } => 7,
            MissingTimeArray => 8,
            MissingArrayIndex(_) => 9,
            IndexOutOfRange { .. } => 10,
            RangeTooLarge { .. } => 11,
            InvalidConfig(_) => 12,
            LocatorTemplateError { .. } => 20,
            ExtractionToolFailure { .. } | ExtractionFailures { .. } => 21,
            SubmissionFailure(_) => 22,
            Io(_) => 23,
        }
    }

    /// True for errors raised while checking input, before anything touches the file system or
    /// the scheduler.
    pub fn is_validation(&self) -> bool {
        self.exit_code() < 20
    }

    pub(crate) fn template(template: &str, reason: impl Into<String>) -> Self {
        FetchErr::LocatorTemplateError {
            template: template.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn tool_status(archive: &str, status: ExitStatus) -> Self {
        FetchErr::ExtractionToolFailure {
            archive: archive.to_owned(),
            reason: format!("tool exited with {}", status),
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_exit_codes_distinct_for_validation() {
        let errs = [
            FetchErr::MissingArguments,
            FetchErr::InvalidTimeFormat("2021".to_owned()),
            FetchErr::InvalidInterval("7".to_owned()),
            FetchErr::InvalidCycleHour(3),
            FetchErr::EndBeforeStart {
                start: "2021010200".to_owned(),
                end: "2021010100".to_owned(),
            },
            FetchErr::MissingTimeArray,
            FetchErr::MissingArrayIndex("SLURM_ARRAY_TASK_ID".to_owned()),
            FetchErr::IndexOutOfRange {
                index: "3".to_owned(),
                len: 2,
            },
            FetchErr::RangeTooLarge {
                count: 1001,
                max: 1000,
            },
            FetchErr::InvalidConfig("max_jobs".to_owned()),
        ];

        let mut codes: Vec<i32> = errs.iter().map(FetchErr::exit_code).collect();
        assert!(errs.iter().all(FetchErr::is_validation));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
        assert!(codes.iter().all(|&c| c > 2));
    }

    #[test]
    fn test_run_time_errors_not_validation() {
        assert!(!FetchErr::SubmissionFailure("sbatch".to_owned()).is_validation());
        assert!(!FetchErr::template("{x}", "unknown").is_validation());
        assert_ne!(
            FetchErr::SubmissionFailure("sbatch".to_owned()).exit_code(),
            FetchErr::ExtractionFailures { failed: 1, total: 2 }.exit_code()
        );
    }
}
