//! Datasets that can be retrieved from the archive.

use itertools::Itertools;
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::{cycle::CycleTime, time_grammar::TimeSeries};

/// Datasets retrievable for ensemble initialization.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumString, AsRefStr, EnumIter)]
pub enum Dataset {
    /// Daily sea ice analysis, taken from the day before the cycle.
    #[strum(serialize = "sea_ice", serialize = "SEA_ICE")]
    SeaIce,
    /// CFS daily surface temperature, taken from the previous day's cycle.
    #[strum(serialize = "cfs_2_sst", serialize = "CFS_2_SST")]
    CfsSst,
    /// GFS and GDAS analyses plus EnKF members from the previous cycle.
    #[strum(serialize = "gfs_15", serialize = "GFS_15")]
    Gfs15,
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl Dataset {
    /// Name of the array job submitted to the scheduler.
    pub fn job_name(self) -> &'static str {
        match self {
            Dataset::SeaIce => "get_sea_ice",
            Dataset::CfsSst => "get_cfs_sst",
            Dataset::Gfs15 => "get_gfs",
        }
    }

    /// Directory under the destination root that this dataset extracts into.
    pub fn subdir(self) -> &'static str {
        match self {
            Dataset::SeaIce => "sea_ice",
            Dataset::CfsSst => "cfs_2_sst",
            Dataset::Gfs15 => "gfs_15",
        }
    }

    /// The time whose archive actually holds the data for a requested cycle, used to find
    /// requests that land on the same archive.
    pub fn fetch_key(self, requested: CycleTime) -> CycleTime {
        match self {
            Dataset::SeaIce => requested.shifted(-12).truncated_to_day(),
            Dataset::CfsSst | Dataset::Gfs15 => requested,
        }
    }

    /// Drop requested times that resolve to the same archive as an earlier request.
    ///
    /// The first requested time of each group is kept, not the fetch key, so a worker handed the
    /// result locates exactly as it would for the original request.
    pub fn collapse(self, series: TimeSeries) -> TimeSeries {
        match self {
            Dataset::SeaIce => {
                let kept: Vec<CycleTime> = series
                    .iter()
                    .unique_by(|&time| self.fetch_key(time))
                    .collect();
                TimeSeries::from_times(kept).unwrap_or(series)
            }
            Dataset::CfsSst | Dataset::Gfs15 => series,
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
