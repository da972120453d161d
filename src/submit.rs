//! Submit a multi-cycle request as one scheduler array job.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    process::Command,
};

use itertools::Itertools;
use tracing::info;

use crate::{
    config::{Config, SchedulerConfig, SchedulerKind},
    datasets::Dataset,
    errors::FetchErr,
    time_grammar::TimeSeries,
};

/// The array job to submit, independent of which scheduler runs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayJob {
    /// Scheduler job name.
    pub job_name: String,
    /// Number of array elements, one per cycle time.
    pub elements: usize,
    /// Most elements running at once.
    pub max_jobs: usize,
    /// Scheduler output log.
    pub output_log: PathBuf,
    /// Directory the elements run in.
    pub workdir: PathBuf,
    /// Program and arguments each element runs.
    pub worker: Vec<String>,
}

/// A validated scheduler command line, kept as separate arguments until it is run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitCommand {
    program: String,
    args: Vec<String>,
}

impl SubmitCommand {
    /// Build the submission command for `job` on the configured scheduler.
    pub fn build(sched: &SchedulerConfig, job: &ArrayJob) -> Result<Self, FetchErr> {
        if job.elements < 2 {
            return Err(FetchErr::InvalidConfig(format!(
                "array job needs at least 2 elements, got {}",
                job.elements
            )));
        }
        if job.max_jobs == 0 {
            return Err(FetchErr::InvalidConfig("max_jobs must be at least 1".to_owned()));
        }
        if job.worker.is_empty() {
            return Err(FetchErr::InvalidConfig("no worker command".to_owned()));
        }

        let log = path_arg("output log", &job.output_log)?;
        let workdir = path_arg("working directory", &job.workdir)?;

        let args = match sched.kind {
            SchedulerKind::Slurm => vec![
                "--job-name".to_owned(),
                field("job name", &job.job_name)?,
                "-p".to_owned(),
                field("partition", &sched.partition)?,
                format!("--qos={}", field("qos", &sched.qos)?),
                "-A".to_owned(),
                field("account", &sched.account)?,
                "-n".to_owned(),
                "1".to_owned(),
                "-t".to_owned(),
                field("walltime", &sched.walltime)?,
                format!("--mem={}", field("memory", &sched.memory)?),
                format!("--array=0-{}%{}", job.elements - 1, job.max_jobs),
                "-o".to_owned(),
                log,
                format!("--chdir={}", workdir),
                "--wrap".to_owned(),
                job.worker.iter().map(|arg| shell_quote(arg)).join(" "),
            ],
            SchedulerKind::Lsf => {
                let mut args = vec![
                    "-J".to_owned(),
                    format!(
                        "{}[1-{}]%{}",
                        field("job name", &job.job_name)?,
                        job.elements,
                        job.max_jobs
                    ),
                    "-P".to_owned(),
                    field("account", &sched.account)?,
                    "-q".to_owned(),
                    field("queue", &sched.partition)?,
                    "-M".to_owned(),
                    field("memory", &sched.memory)?,
                    "-R".to_owned(),
                    "span[ptile=1]".to_owned(),
                    "-R".to_owned(),
                    "affinity[core(1)]".to_owned(),
                    "-n".to_owned(),
                    "1".to_owned(),
                    "-W".to_owned(),
                    field("walltime", &sched.walltime)?,
                    "-o".to_owned(),
                    log,
                    "-cwd".to_owned(),
                    workdir,
                ];
                args.extend(job.worker.iter().cloned());
                args
            }
        };

        Ok(SubmitCommand {
            program: sched.kind.program().to_owned(),
            args,
        })
    }

    /// The submission program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for SubmitCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn field(name: &str, value: &str) -> Result<String, FetchErr> {
    if value.trim().is_empty() || value.chars().any(char::is_control) {
        Err(FetchErr::InvalidConfig(format!(
            "scheduler {} is empty or has control characters: {:?}",
            name, value
        )))
    } else {
        Ok(value.to_owned())
    }
}

fn path_arg(name: &str, path: &Path) -> Result<String, FetchErr> {
    match path.to_str() {
        Some(text) => field(name, text),
        None => Err(FetchErr::InvalidConfig(format!(
            "{} is not valid UTF-8: {}",
            name,
            path.display()
        ))),
    }
}

/// Quote one word for a POSIX shell. Plain words pass through unchanged.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./,=:%@+".contains(c));

    if plain {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// What the scheduler said when it accepted a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionHandle {
    /// Job id, if the acknowledgement could be parsed.
    pub job_id: Option<String>,
    /// The scheduler's standard output.
    pub acknowledgement: String,
}

impl SubmissionHandle {
    /// Parse Slurm's `Submitted batch job N` or LSF's `Job <N> is submitted ...`.
    pub fn from_acknowledgement(text: &str) -> Self {
        let text = text.trim();

        let job_id = text.lines().find_map(|line| {
            if let Some(rest) = line.trim().strip_prefix("Submitted batch job ") {
                rest.split_whitespace().next().map(str::to_owned)
            } else if line.trim().starts_with("Job <") {
                let start = line.find('<')? + 1;
                let end = line[start..].find('>')? + start;
                Some(line[start..end].to_owned())
            } else {
                None
            }
        });

        SubmissionHandle {
            job_id,
            acknowledgement: text.to_owned(),
        }
    }
}

/// Something that accepts array jobs.
pub trait Scheduler {
    /// Submit and wait for the submission command itself, not for the job.
    fn submit(&self, command: &SubmitCommand) -> Result<SubmissionHandle, FetchErr>;
}

/// Runs the real submission program.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExternalScheduler;

impl Scheduler for ExternalScheduler {
    fn submit(&self, command: &SubmitCommand) -> Result<SubmissionHandle, FetchErr> {
        let output = Command::new(command.program())
            .args(command.args())
            .output()
            .map_err(|err| {
                FetchErr::SubmissionFailure(format!("could not run {}: {}", command.program(), err))
            })?;

        if !output.status.success() {
            return Err(FetchErr::SubmissionFailure(format!(
                "{} exited with {}: {}",
                command.program(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(SubmissionHandle::from_acknowledgement(
            &String::from_utf8_lossy(&output.stdout),
        ))
    }
}

/// Command line an array element runs: this program in worker mode, given the whole time array.
///
/// Settings that came from flags are passed on explicitly; settings from the environment reach
/// the elements through the scheduler's environment export.
pub fn worker_command(config: &Config, times: &TimeSeries) -> Vec<String> {
    vec![
        config.program.to_string_lossy().into_owned(),
        "--destination".to_owned(),
        config.destination_root.to_string_lossy().into_owned(),
        "--scheduler".to_owned(),
        config.scheduler.kind.as_ref().to_owned(),
        "--extract-tool".to_owned(),
        config.extract_tool.clone(),
        "worker".to_owned(),
        times.serialize(),
    ]
}

/// `<workdir>/logs/<program>_<start>_<end>.log`
pub fn log_path(config: &Config, start: &str, end: &str) -> PathBuf {
    let program = config
        .program
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gefs-init-data".to_owned());

    config
        .workdir
        .join("logs")
        .join(format!("{}_{}_{}.log", program, start, end))
}

/// Submit one array job covering `times`. Blocks until the scheduler has answered.
pub fn submit_fan_out(
    dataset: Dataset,
    times: &TimeSeries,
    requested: (&str, &str),
    config: &Config,
    scheduler: &dyn Scheduler,
) -> Result<Option<SubmissionHandle>, FetchErr> {
    let output_log = log_path(config, requested.0, requested.1);
    let job = ArrayJob {
        job_name: dataset.job_name().to_owned(),
        elements: times.len(),
        max_jobs: config.scheduler.max_jobs,
        output_log,
        workdir: config.workdir.clone(),
        worker: worker_command(config, times),
    };
    let command = SubmitCommand::build(&config.scheduler, &job)?;

    if config.dry_run {
        info!("dry run: {}", command);
        return Ok(None);
    }

    if let Some(log_dir) = job.output_log.parent() {
        fs::create_dir_all(log_dir)?;
    }

    info!("Submitting {} cycles: {}", times.len(), command);
    let handle = scheduler.submit(&command)?;
    match &handle.job_id {
        Some(id) => info!("Submitted array job {}", id),
        None => info!("Submitted: {}", handle.acknowledgement),
    }

    Ok(Some(handle))
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
