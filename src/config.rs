//! Immutable run configuration, built once at start up and passed to everything that needs it.

use std::path::PathBuf;

use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::errors::FetchErr;

/// Batch schedulers that can run the array job.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, AsRefStr, EnumIter)]
pub enum SchedulerKind {
    /// Slurm, via `sbatch`.
    #[strum(serialize = "slurm", serialize = "SLURM")]
    Slurm,
    /// IBM Spectrum LSF, via `bsub`.
    #[strum(serialize = "lsf", serialize = "LSF")]
    Lsf,
}

impl SchedulerKind {
    /// The submission program.
    pub fn program(self) -> &'static str {
        match self {
            SchedulerKind::Slurm => "sbatch",
            SchedulerKind::Lsf => "bsub",
        }
    }

    /// Environment variable the scheduler sets in each array element.
    pub fn index_env_var(self) -> &'static str {
        match self {
            SchedulerKind::Slurm => "SLURM_ARRAY_TASK_ID",
            SchedulerKind::Lsf => "LSB_JOBINDEX",
        }
    }

    /// Value of the index variable in the first array element. LSF does not allow index 0.
    pub fn index_base(self) -> usize {
        match self {
            SchedulerKind::Slurm => 0,
            SchedulerKind::Lsf => 1,
        }
    }
}

/// Settings for the array job submission.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub kind: SchedulerKind,
    pub partition: String,
    pub qos: String,
    pub account: String,
    pub walltime: String,
    pub memory: String,
    /// Most array elements allowed to run at once.
    pub max_jobs: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            kind: SchedulerKind::Slurm,
            partition: "service".to_owned(),
            qos: "batch".to_owned(),
            account: "fv3-cpu".to_owned(),
            walltime: "1:30:00".to_owned(),
            memory: "750M".to_owned(),
            max_jobs: 2,
        }
    }
}

/// How ensemble members are spread across cycles and tar groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnsembleLayout {
    /// Members needed per cycle.
    pub member_count: u32,
    /// Offset of the first member between consecutive cycles of a day.
    pub member_shift: u32,
    /// Members in the archived EnKF ensemble.
    pub total_members: u32,
    /// Members stored in each tar group.
    pub members_per_group: u32,
}

impl Default for EnsembleLayout {
    fn default() -> Self {
        EnsembleLayout {
            member_count: 30,
            member_shift: 20,
            total_members: 80,
            members_per_group: 10,
        }
    }
}

/// Archive path, member and destination templates.
///
/// Templates use strftime fields plus `{group}` and `{member}` (optionally zero padded as
/// `{member:03}`) placeholders. Destinations are relative to the dataset's directory.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Templates {
    pub sea_ice_archive: String,
    pub sea_ice_members: Vec<String>,
    pub sea_ice_destination: String,

    pub cfs_sst_archive: String,
    pub cfs_sst_members: Vec<String>,
    pub cfs_sst_destination: String,

    pub enkf_archive: String,
    pub enkf_member: String,
    pub gfs_archive: String,
    pub gfs_members: Vec<String>,
    pub gdas_archive: String,
    pub gdas_members: Vec<String>,
}

const RUNHISTORY: &str = "/NCEPPROD/hpssprod/runhistory/rh%Y/%Y%m/%Y%m%d";

impl Default for Templates {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|&s| s.to_owned()).collect()
        }

        Templates {
            sea_ice_archive: format!("{}/gpfs_dell1_nco_ops_com_omb_prod_sice.%Y%m%d.tar", RUNHISTORY),
            sea_ice_members: owned(&["./seaice.t00z.5min.grb.grib2"]),
            sea_ice_destination: "sice.%Y%m%d".to_owned(),

            cfs_sst_archive: "/NCEPPROD/hpssprod/runhistory/cfs%Y/%Y%m/%Y%m%d/time/cfs.%Y%m%d%H.m01.time.tar"
                .to_owned(),
            cfs_sst_members: owned(&["tmpsfc.01.%Y%m%d%H.daily.grb2"]),
            cfs_sst_destination: "cfs.%Y%m%d/%H/time_grib_01".to_owned(),

            enkf_archive: concat!(
                "/NCEPPROD/5year/hpssprod/runhistory/rh%Y/%Y%m/%Y%m%d/",
                "gpfs_dell1_nco_ops_com_gfs_prod_enkfgdas.%Y%m%d_%H.enkfgdas_grp{group}.tar"
            )
            .to_owned(),
            enkf_member: "./enkfgdas.%Y%m%d/%H/mem{member:03}/gdas.t%Hz.atmf006.nemsio".to_owned(),
            gfs_archive: format!("{}/gpfs_dell1_nco_ops_com_gfs_prod_gfs.%Y%m%d_%H.gfs_nemsioa.tar", RUNHISTORY),
            gfs_members: owned(&[
                "./gfs.%Y%m%d/%H/gfs.t%Hz.sfcanl.nemsio",
                "./gfs.%Y%m%d/%H/gfs.t%Hz.atmanl.nemsio",
            ]),
            gdas_archive: format!("{}/gpfs_dell1_nco_ops_com_gfs_prod_gdas.%Y%m%d_%H.gdas_nemsioa.tar", RUNHISTORY),
            gdas_members: owned(&["./gdas.%Y%m%d/%H/gdas.t%Hz.atmanl.nemsio"]),
        }
    }
}

/// Everything a planner or worker needs to know about its environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Root that dataset directories are created under.
    pub destination_root: PathBuf,
    /// Directory the scheduler runs jobs in; job logs go in `logs/` below it.
    pub workdir: PathBuf,
    /// Program the array elements run, normally the current executable.
    pub program: PathBuf,
    /// Archive extraction tool.
    pub extract_tool: String,
    /// Largest number of cycle times a single request may expand to.
    pub max_times: usize,
    /// Log commands instead of running them.
    pub dry_run: bool,
    #[allow(missing_docs)]
    pub scheduler: SchedulerConfig,
    #[allow(missing_docs)]
    pub ensemble: EnsembleLayout,
    #[allow(missing_docs)]
    pub templates: Templates,
}

impl Config {
    /// Default range cap.
    pub const DEFAULT_MAX_TIMES: usize = 1000;
    /// Default extraction tool.
    pub const DEFAULT_EXTRACT_TOOL: &'static str = "htar";

    /// The default destination root, `${HOME}/gefs_input`.
    pub fn default_destination_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gefs_input")
    }

    /// Check values that would otherwise fail later in confusing ways.
    pub fn validate(self) -> Result<Self, FetchErr> {
        let bad = |msg: &str| Err(FetchErr::InvalidConfig(msg.to_owned()));

        if self.max_times == 0 {
            return bad("max_times must be at least 1");
        }
        if self.scheduler.max_jobs == 0 {
            return bad("max_jobs must be at least 1");
        }
        if self.ensemble.total_members == 0 || self.ensemble.members_per_group == 0 {
            return bad("ensemble total_members and members_per_group must be at least 1");
        }
        if self.extract_tool.trim().is_empty() {
            return bad("extract tool must not be empty");
        }

        let sched = &self.scheduler;
        for (name, value) in &[
            ("partition", &sched.partition),
            ("qos", &sched.qos),
            ("account", &sched.account),
            ("walltime", &sched.walltime),
            ("memory", &sched.memory),
        ] {
            if value.trim().is_empty() {
                return Err(FetchErr::InvalidConfig(format!("{} must not be empty", name)));
            }
        }

        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        let program = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("gefs-init-data"));
        let workdir = program
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Config {
            destination_root: Self::default_destination_root(),
            workdir,
            program,
            extract_tool: Self::DEFAULT_EXTRACT_TOOL.to_owned(),
            max_times: Self::DEFAULT_MAX_TIMES,
            dry_run: false,
            scheduler: SchedulerConfig::default(),
            ensemble: EnsembleLayout::default(),
            templates: Templates::default(),
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
