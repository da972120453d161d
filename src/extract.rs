//! Pull member files out of archives, one cycle at a time.

use std::{fs, process::Command};

use itertools::Itertools;
use tracing::{error, info};

use crate::{errors::FetchErr, locator::ArchiveRequest};

/// Something that can pull members out of an archive into the request's destination.
pub trait Extractor {
    /// Extract the members of one request. Blocks until the extraction finishes.
    fn extract(&self, request: &ArchiveRequest) -> Result<(), FetchErr>;

    /// The command line this extractor would run, for logging.
    fn describe(&self, request: &ArchiveRequest) -> String;
}

/// An external `htar`-style tool: `<tool> -xf <archive> <member>...`, run in the destination.
#[derive(Clone, Debug)]
pub struct ExternalTool {
    program: String,
}

impl ExternalTool {
    /// Use `program` as the extraction tool.
    pub fn new(program: &str) -> Self {
        ExternalTool {
            program: program.to_owned(),
        }
    }

    fn command(&self, request: &ArchiveRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-xf")
            .arg(&request.archive)
            .args(&request.members)
            .current_dir(&request.destination);
        cmd
    }
}

impl Extractor for ExternalTool {
    fn extract(&self, request: &ArchiveRequest) -> Result<(), FetchErr> {
        let status = self
            .command(request)
            .status()
            .map_err(|err| FetchErr::ExtractionToolFailure {
                archive: request.archive.clone(),
                reason: format!("could not run {}: {}", self.program, err),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(FetchErr::tool_status(&request.archive, status))
        }
    }

    fn describe(&self, request: &ArchiveRequest) -> String {
        format!(
            "{} -xf {} {}",
            self.program,
            request.archive,
            request.members.iter().join(" ")
        )
    }
}

/// Outcome of extracting every request for a cycle.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Distinct archives attempted.
    pub attempted: usize,
    /// One error per failed archive, in the order they happened.
    pub failures: Vec<FetchErr>,
}

impl ExtractionReport {
    /// True if nothing failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Collapse to a single result for the exit status.
    pub fn into_result(self) -> Result<(), FetchErr> {
        if self.is_success() {
            Ok(())
        } else {
            Err(FetchErr::ExtractionFailures {
                failed: self.failures.len(),
                total: self.attempted,
            })
        }
    }
}

/// Run every request in order, merging requests for the same archive first.
///
/// A failed extraction is logged and recorded, then the next request runs anyway. With
/// `dry_run` the commands are only logged and no directories are created.
pub fn extract_all(
    requests: Vec<ArchiveRequest>,
    extractor: &dyn Extractor,
    dry_run: bool,
) -> ExtractionReport {
    let requests = ArchiveRequest::merge_by_archive(requests);
    let mut report = ExtractionReport {
        attempted: requests.len(),
        failures: vec![],
    };

    for request in &requests {
        info!("Extracting {}", request.archive);

        if dry_run {
            info!(
                "dry run, in {}: {}",
                request.destination.display(),
                extractor.describe(request)
            );
            continue;
        }

        let outcome = fs::create_dir_all(&request.destination)
            .map_err(FetchErr::from)
            .and_then(|_| extractor.extract(request));

        if let Err(err) = outcome {
            error!(archive = %request.archive, "{}", err);
            report.failures.push(err);
        }
    }

    report
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
