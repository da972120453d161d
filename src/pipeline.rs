//! The two phases of a retrieval.
//!
//! The planner validates a requested range and either extracts its single cycle on the spot or
//! submits an array job. Each array element then runs the worker, which extracts exactly one
//! cycle picked out of the serialized time array by its array index.

use tracing::info;

use crate::{
    config::Config,
    cycle::CycleTime,
    datasets::Dataset,
    dispatch::DispatchPlan,
    errors::FetchErr,
    extract::{extract_all, Extractor},
    locator::Locator,
    submit::{submit_fan_out, Scheduler, SubmissionHandle},
    time_grammar::{TimeRange, TimeSeries},
};

/// Raw planner arguments, as typed on the command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlanArgs {
    /// YYYYMMDD or YYYYMMDDHH.
    pub start: Option<String>,
    /// Defaults to the start.
    pub end: Option<String>,
    /// Hours, defaults to 24.
    pub interval: Option<String>,
}

/// Raw worker arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerArgs {
    /// Comma separated 10-digit times.
    pub time_list: Option<String>,
    /// Array index, from `--index` or the scheduler's environment.
    pub index: Option<String>,
}

/// What a planner run did.
#[derive(Debug, PartialEq, Eq)]
pub enum PlanOutcome {
    /// One cycle, extracted in this process.
    Extracted(CycleTime),
    /// An array job was submitted; `None` on a dry run.
    Submitted(Option<SubmissionHandle>),
}

/// Validate the request and decide how to run it. No side effects.
pub fn plan(
    dataset: Dataset,
    args: &PlanArgs,
    config: &Config,
) -> Result<(TimeRange, DispatchPlan), FetchErr> {
    let start = args.start.as_deref().ok_or(FetchErr::MissingArguments)?;
    let range = TimeRange::parse(start, args.end.as_deref(), args.interval.as_deref())?;
    let times = dataset.collapse(range.expand(config.max_times)?);

    let sched = &config.scheduler;
    let plan = DispatchPlan::new(times, sched.max_jobs, sched.kind.index_env_var());

    Ok((range, plan))
}

/// Planner phase: validate, then extract inline or submit the array job.
pub fn run_planner(
    dataset: Dataset,
    args: &PlanArgs,
    config: &Config,
    extractor: &dyn Extractor,
    scheduler: &dyn Scheduler,
) -> Result<PlanOutcome, FetchErr> {
    let (range, plan) = plan(dataset, args, config)?;

    match plan {
        DispatchPlan::Inline(cycle) => {
            run_cycle(dataset, cycle, config, extractor)?;
            Ok(PlanOutcome::Extracted(cycle))
        }
        DispatchPlan::FanOut { times, .. } => {
            let requested = (range.start().to_string(), range.end().to_string());
            let handle = submit_fan_out(
                dataset,
                &times,
                (requested.0.as_str(), requested.1.as_str()),
                config,
                scheduler,
            )?;
            Ok(PlanOutcome::Submitted(handle))
        }
    }
}

/// Select this array element's cycle. No side effects.
pub fn worker_cycle(args: &WorkerArgs, config: &Config) -> Result<CycleTime, FetchErr> {
    let kind = config.scheduler.kind;

    if args.time_list.as_deref().map_or(true, |l| l.trim().is_empty()) {
        return Err(FetchErr::MissingTimeArray);
    }
    let index = args
        .index
        .as_deref()
        .ok_or_else(|| FetchErr::MissingArrayIndex(kind.index_env_var().to_owned()))?;

    let series = TimeSeries::from_array(args.time_list.as_deref(), index, kind.index_base())?;
    Ok(series.first())
}

/// Worker phase: extract the one cycle this array element is responsible for.
pub fn run_worker(
    dataset: Dataset,
    args: &WorkerArgs,
    config: &Config,
    extractor: &dyn Extractor,
) -> Result<CycleTime, FetchErr> {
    let cycle = worker_cycle(args, config)?;
    run_cycle(dataset, cycle, config, extractor)?;
    Ok(cycle)
}

/// Locate and extract everything for one cycle.
///
/// All requests are located before anything is extracted, so a template error stops the run
/// before any directory is made.
pub fn run_cycle(
    dataset: Dataset,
    cycle: CycleTime,
    config: &Config,
    extractor: &dyn Extractor,
) -> Result<(), FetchErr> {
    info!("Current cycle: {}", cycle.datetime().format("%Y %m %d %H"));
    match dataset {
        Dataset::SeaIce => info!(
            "Fetch for: {}",
            dataset.fetch_key(cycle).datetime().format("%Y %m %d 00")
        ),
        Dataset::Gfs15 => info!(
            "Previous cycle: {}",
            cycle.shifted(-6).datetime().format("%Y %m %d %H")
        ),
        Dataset::CfsSst => info!(
            "Previous day: {}",
            cycle.shifted(-24).datetime().format("%Y %m %d %H")
        ),
    }

    let requests = Locator::new(dataset, config).locate(cycle)?;
    extract_all(requests, extractor, config.dry_run).into_result()
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
