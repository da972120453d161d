//! Decide whether a request runs here or as an array job.

use crate::{cycle::CycleTime, time_grammar::TimeSeries};

/// What to do with an expanded request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchPlan {
    /// Exactly one cycle; extract it in this process.
    Inline(CycleTime),
    /// Several cycles; submit one array job with an element per cycle.
    FanOut {
        /// All cycles, in array index order.
        times: TimeSeries,
        /// Most array elements allowed to run at once.
        max_jobs: usize,
        /// Environment variable carrying each element's array index.
        index_env_var: String,
    },
}

impl DispatchPlan {
    /// Count check only. Whether the scheduler has room for the job is the scheduler's problem.
    pub fn new(times: TimeSeries, max_jobs: usize, index_env_var: &str) -> Self {
        if times.len() == 1 {
            DispatchPlan::Inline(times.first())
        } else {
            DispatchPlan::FanOut {
                times,
                max_jobs,
                index_env_var: index_env_var.to_owned(),
            }
        }
    }

    /// Highest zero-based array index, zero for an inline plan.
    pub fn last_index(&self) -> usize {
        match self {
            DispatchPlan::Inline(_) => 0,
            DispatchPlan::FanOut { times, .. } => times.len() - 1,
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
