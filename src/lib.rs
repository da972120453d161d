#![deny(missing_docs)]
//! Retrieve ensemble initialization data from a tape archive, one forecast cycle at a time.
//!
//! A requested time range is validated and expanded into cycle times. A single cycle is
//! extracted directly; several are submitted as one scheduler array job whose elements each
//! come back through [`pipeline::run_worker`] to extract one cycle.

//
// Public API
//
pub use cmd_line::{main_for, CommonCmdLineArgs, Invocation};
pub use config::{Config, EnsembleLayout, SchedulerConfig, SchedulerKind, Templates};
pub use cycle::CycleTime;
pub use datasets::Dataset;
pub use dispatch::DispatchPlan;
pub use errors::FetchErr;
pub use extract::{extract_all, ExternalTool, ExtractionReport, Extractor};
pub use locator::{ArchiveRequest, Locator};
pub use submit::{ExternalScheduler, Scheduler, SubmissionHandle, SubmitCommand};
pub use time_grammar::{TimeRange, TimeSeries};

pub mod cmd_line;
pub mod config;
pub mod cycle;
pub mod datasets;
pub mod dispatch;
pub mod errors;
pub mod extract;
pub mod locator;
pub mod logging;
pub mod pipeline;
pub mod submit;
pub mod time_grammar;
