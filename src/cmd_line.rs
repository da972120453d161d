//! Command line options that are used across applications.

use std::{ffi::OsString, path::PathBuf, str::FromStr};

use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::error;

use crate::{
    config::{Config, SchedulerKind},
    datasets::Dataset,
    errors::FetchErr,
    extract::ExternalTool,
    pipeline::{run_planner, run_worker, PlanArgs, PlanOutcome, WorkerArgs},
    submit::ExternalScheduler,
};

/// What the command line asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Plan a range of cycles.
    Plan(PlanArgs),
    /// Run one element of an array job.
    Worker(WorkerArgs),
}

/// Struct to package up command line arguments.
#[derive(Clone, Debug)]
pub struct CommonCmdLineArgs {
    dataset: Dataset,
    invocation: Invocation,
    config: Config,
}

impl CommonCmdLineArgs {
    const WORKER: &'static str = "worker";

    /// Create the application for a dataset's program.
    pub fn new_app(dataset: Dataset) -> Command {
        let name = format!("get_{}", dataset);

        Command::new(name)
            .about(format!(
                "Retrieve {} files for ensemble initialization from the tape archive.",
                dataset
            ))
            .version(crate_version!())
            .arg(
                Arg::new("start")
                    .value_name("START")
                    .help("First initialization time, YYYYMMDDHH or YYYYMMDD (hour 00)."),
            )
            .arg(
                Arg::new("end")
                    .value_name("END")
                    .help("Final initialization time (default: START)."),
            )
            .arg(
                Arg::new("interval")
                    .value_name("INTERVAL")
                    .allow_negative_numbers(true)
                    .help("Hours between initialization times, a multiple of 6 (default: 24)."),
            )
            .arg(
                Arg::new("destination")
                    .short('d')
                    .long("destination")
                    .env("GEFS_INIT_DESTINATION")
                    .value_parser(value_parser!(PathBuf))
                    .help("Root directory to extract into.")
                    .long_help("Root directory to extract into. Defaults to '${HOME}/gefs_input'."),
            )
            .arg(
                Arg::new("workdir")
                    .long("workdir")
                    .env("GEFS_INIT_WORKDIR")
                    .value_parser(value_parser!(PathBuf))
                    .help("Working directory for array jobs; logs go in its logs/ directory.")
                    .long_help(concat!(
                        "Working directory for array jobs; logs go in its logs/ directory. ",
                        "Defaults to the directory holding this program."
                    )),
            )
            .arg(
                Arg::new("scheduler")
                    .long("scheduler")
                    .env("GEFS_INIT_SCHEDULER")
                    .default_value("slurm")
                    .value_parser(|s: &str| SchedulerKind::from_str(s).map_err(|e| e.to_string()))
                    .help("Batch scheduler: slurm or lsf."),
            )
            .arg(string_opt("partition", "GEFS_INIT_PARTITION", "Partition (Slurm) or queue (LSF)."))
            .arg(string_opt("qos", "GEFS_INIT_QOS", "Quality of service class."))
            .arg(string_opt("account", "GEFS_INIT_ACCOUNT", "Account to charge."))
            .arg(string_opt("walltime", "GEFS_INIT_WALLTIME", "Walltime per array element."))
            .arg(string_opt("memory", "GEFS_INIT_MEMORY", "Memory per array element."))
            .arg(
                Arg::new("max-jobs")
                    .long("max-jobs")
                    .env("GEFS_INIT_MAX_JOBS")
                    .value_parser(value_parser!(usize))
                    .help("Most array elements allowed to run at once."),
            )
            .arg(
                Arg::new("max-times")
                    .long("max-times")
                    .env("GEFS_INIT_MAX_TIMES")
                    .value_parser(value_parser!(usize))
                    .help("Refuse requests expanding to more cycle times than this."),
            )
            .arg(string_opt("extract-tool", "GEFS_INIT_EXTRACT_TOOL", "Archive extraction tool."))
            .arg(
                Arg::new("dry-run")
                    .long("dry-run")
                    .action(ArgAction::SetTrue)
                    .help("Log the extraction and submission commands without running them."),
            )
            .subcommand(
                Command::new(Self::WORKER)
                    .about("Run one element of an array job. Used by the scheduler.")
                    .arg(
                        Arg::new("index")
                            .long("index")
                            .value_name("N")
                            .allow_negative_numbers(true)
                            .help("Array index; defaults to the scheduler's array index variable."),
                    )
                    .arg(
                        Arg::new("time-list")
                            .value_name("TIME_LIST")
                            .help("Comma separated YYYYMMDDHH times, one per array element."),
                    ),
            )
            .after_help(concat!(
                "If END is later than START, the cycles are submitted as a scheduler array job ",
                "and each element extracts one cycle. A single cycle is extracted directly."
            ))
    }

    /// Parse the process's own arguments. Exits through `clap` on a usage error or `--help`.
    pub fn matches(dataset: Dataset) -> Result<Self, FetchErr> {
        let matches = Self::new_app(dataset).get_matches();
        Self::from_matches(dataset, &matches, |var| std::env::var(var).ok())
    }

    /// Parse an explicit argument list, reading the array index variable through `env`.
    pub fn parse_from<I, T>(
        dataset: Dataset,
        args: I,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, FetchErr>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::new_app(dataset)
            .try_get_matches_from(args)
            .map_err(|err| FetchErr::InvalidConfig(err.to_string()))?;
        Self::from_matches(dataset, &matches, env)
    }

    fn from_matches(
        dataset: Dataset,
        matches: &ArgMatches,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, FetchErr> {
        let config = Self::build_config(matches)?;

        let invocation = match matches.subcommand() {
            Some((Self::WORKER, sub)) => {
                let index = sub
                    .get_one::<String>("index")
                    .cloned()
                    .or_else(|| env(config.scheduler.kind.index_env_var()));

                Invocation::Worker(WorkerArgs {
                    time_list: sub.get_one::<String>("time-list").cloned(),
                    index,
                })
            }
            _ => Invocation::Plan(PlanArgs {
                start: matches.get_one::<String>("start").cloned(),
                end: matches.get_one::<String>("end").cloned(),
                interval: matches.get_one::<String>("interval").cloned(),
            }),
        };

        Ok(CommonCmdLineArgs {
            dataset,
            invocation,
            config,
        })
    }

    fn build_config(matches: &ArgMatches) -> Result<Config, FetchErr> {
        let mut config = Config::default();
        let text = |id: &str| matches.get_one::<String>(id).cloned();

        if let Some(root) = matches.get_one::<PathBuf>("destination") {
            config.destination_root = root.clone();
        }
        if let Some(workdir) = matches.get_one::<PathBuf>("workdir") {
            config.workdir = workdir.clone();
        }
        if let Some(kind) = matches.get_one::<SchedulerKind>("scheduler") {
            config.scheduler.kind = *kind;
        }

        let sched = &mut config.scheduler;
        for (id, field) in [
            ("partition", &mut sched.partition),
            ("qos", &mut sched.qos),
            ("account", &mut sched.account),
            ("walltime", &mut sched.walltime),
            ("memory", &mut sched.memory),
        ] {
            if let Some(value) = text(id) {
                *field = value;
            }
        }
        if let Some(max_jobs) = matches.get_one::<usize>("max-jobs") {
            sched.max_jobs = *max_jobs;
        }

        if let Some(max_times) = matches.get_one::<usize>("max-times") {
            config.max_times = *max_times;
        }
        if let Some(tool) = text("extract-tool") {
            config.extract_tool = tool;
        }
        config.dry_run = matches.get_flag("dry-run");

        config.validate()
    }

    /// The dataset this program retrieves.
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Planner or worker.
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn string_opt(id: &'static str, env: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).env(env).help(help)
}

/// Entry point shared by the dataset programs. Returns the process exit code.
pub fn main_for(dataset: Dataset) -> i32 {
    let outcome =
        CommonCmdLineArgs::matches(dataset).and_then(|args| run(&args).map(|_| ()));

    match outcome {
        Ok(()) => 0,
        Err(err) => {
            error!("FATAL: {}", err);
            if err.is_validation() {
                let mut app = CommonCmdLineArgs::new_app(dataset);
                eprintln!("\n{}\n", app.render_usage());
                eprintln!("Try the -h or --help option for more instructions.");
            }
            err.exit_code()
        }
    }
}

/// Run a parsed command line against the real extraction tool and scheduler.
pub fn run(args: &CommonCmdLineArgs) -> Result<Option<PlanOutcome>, FetchErr> {
    let config = args.config();
    let extractor = ExternalTool::new(&config.extract_tool);

    match args.invocation() {
        Invocation::Plan(plan_args) => {
            run_planner(args.dataset(), plan_args, config, &extractor, &ExternalScheduler).map(Some)
        }
        Invocation::Worker(worker_args) => {
            run_worker(args.dataset(), worker_args, config, &extractor).map(|_| None)
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
