//! Map a cycle time to the archives and member files that hold its data.

use std::path::{Path, PathBuf};

use crate::{
    config::{Config, EnsembleLayout, Templates},
    cycle::CycleTime,
    datasets::Dataset,
    errors::FetchErr,
};

pub mod ensemble;
mod template;

/// One extraction: the members to pull from an archive, and where to put them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Path of the archive on tape.
    pub archive: String,
    /// Member file names inside the archive, in extraction order.
    pub members: Vec<String>,
    /// Directory the tool runs in; members land relative to it.
    pub destination: PathBuf,
}

impl ArchiveRequest {
    /// Combine requests naming the same archive, so no archive is read twice.
    ///
    /// The order of first appearance is kept for archives and for members within each archive.
    /// Requests for one archive with different destinations are kept apart.
    pub fn merge_by_archive(requests: Vec<ArchiveRequest>) -> Vec<ArchiveRequest> {
        let mut merged: Vec<ArchiveRequest> = Vec::with_capacity(requests.len());

        for req in requests {
            match merged
                .iter_mut()
                .find(|m| m.archive == req.archive && m.destination == req.destination)
            {
                Some(existing) => {
                    for member in req.members {
                        if !existing.members.contains(&member) {
                            existing.members.push(member);
                        }
                    }
                }
                None => merged.push(req),
            }
        }

        merged
    }
}

/// Archive locator for one dataset. Pure: no I/O, same answer every time.
#[derive(Debug)]
pub struct Locator<'a> {
    dataset: Dataset,
    dataset_root: PathBuf,
    templates: &'a Templates,
    ensemble: EnsembleLayout,
}

impl<'a> Locator<'a> {
    /// Build a locator from the run configuration.
    pub fn new(dataset: Dataset, config: &'a Config) -> Self {
        Locator {
            dataset,
            dataset_root: config.destination_root.join(dataset.subdir()),
            templates: &config.templates,
            ensemble: config.ensemble,
        }
    }

    /// Directory this dataset extracts under.
    pub fn dataset_root(&self) -> &Path {
        &self.dataset_root
    }

    /// The archive requests for one validated cycle.
    pub fn locate(&self, cycle: CycleTime) -> Result<Vec<ArchiveRequest>, FetchErr> {
        match self.dataset {
            Dataset::SeaIce => self.sea_ice(cycle),
            Dataset::CfsSst => self.cfs_sst(cycle),
            Dataset::Gfs15 => self.gfs_15(cycle),
        }
    }

    fn sea_ice(&self, cycle: CycleTime) -> Result<Vec<ArchiveRequest>, FetchErr> {
        let fetch_day = self.dataset.fetch_key(cycle);
        let tpl = self.templates;

        Ok(vec![self.single(
            fetch_day,
            &tpl.sea_ice_archive,
            &tpl.sea_ice_members,
            Some(tpl.sea_ice_destination.as_str()),
        )?])
    }

    fn cfs_sst(&self, cycle: CycleTime) -> Result<Vec<ArchiveRequest>, FetchErr> {
        let prev_day = cycle.shifted(-24);
        let tpl = self.templates;

        Ok(vec![self.single(
            prev_day,
            &tpl.cfs_sst_archive,
            &tpl.cfs_sst_members,
            Some(tpl.cfs_sst_destination.as_str()),
        )?])
    }

    fn gfs_15(&self, cycle: CycleTime) -> Result<Vec<ArchiveRequest>, FetchErr> {
        let tpl = self.templates;

        let mut requests = self.enkf_members(cycle)?;
        requests.push(self.single(cycle, &tpl.gfs_archive, &tpl.gfs_members, None)?);
        requests.push(self.single(cycle, &tpl.gdas_archive, &tpl.gdas_members, None)?);

        Ok(requests)
    }

    // Members come from the previous cycle's EnKF, but which members is set by this cycle's hour.
    fn enkf_members(&self, cycle: CycleTime) -> Result<Vec<ArchiveRequest>, FetchErr> {
        let prev_cycle = cycle.shifted(-6);
        let layout = &self.ensemble;
        let tpl = self.templates;

        let mut by_group: Vec<(u32, Vec<String>)> = vec![];
        for member in ensemble::members_for(cycle, layout) {
            let group = ensemble::tar_group(member, layout);
            let file = template::render(
                &tpl.enkf_member,
                prev_cycle,
                &[("member", ensemble::archived_member(member, layout))],
            )?;

            match by_group.iter_mut().find(|(g, _)| *g == group) {
                Some((_, files)) if files.contains(&file) => {}
                Some((_, files)) => files.push(file),
                None => by_group.push((group, vec![file])),
            }
        }

        by_group
            .into_iter()
            .map(|(group, members)| -> Result<ArchiveRequest, FetchErr> {
                Ok(ArchiveRequest {
                    archive: template::render(&tpl.enkf_archive, prev_cycle, &[("group", group)])?,
                    members,
                    destination: self.dataset_root.clone(),
                })
            })
            .collect()
    }

    fn single(
        &self,
        time: CycleTime,
        archive: &str,
        members: &[String],
        destination: Option<&str>,
    ) -> Result<ArchiveRequest, FetchErr> {
        let archive = template::render(archive, time, &[])?;
        let members = members
            .iter()
            .map(|m| template::render(m, time, &[]))
            .collect::<Result<Vec<_>, _>>()?;
        let destination = match destination {
            Some(sub) => self.dataset_root.join(template::render(sub, time, &[])?),
            None => self.dataset_root.clone(),
        };

        Ok(ArchiveRequest {
            archive,
            members,
            destination,
        })
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use itertools::Itertools;

    fn t(s: &str) -> CycleTime {
        CycleTime::parse(s).unwrap()
    }

    fn test_config() -> Config {
        Config {
            destination_root: PathBuf::from("/data/gefs_input"),
            ..Config::default()
        }
    }

    #[test]
    fn test_cfs_sst_uses_previous_day() {
        let config = test_config();
        let reqs = Locator::new(Dataset::CfsSst, &config)
            .locate(t("2021010106"))
            .unwrap();

        assert_eq!(reqs.len(), 1);
        assert_eq!(
            reqs[0].archive,
            "/NCEPPROD/hpssprod/runhistory/cfs2020/202012/20201231/time/cfs.2020123106.m01.time.tar"
        );
        assert_eq!(reqs[0].members, vec!["tmpsfc.01.2020123106.daily.grb2"]);
        assert_eq!(
            reqs[0].destination,
            PathBuf::from("/data/gefs_input/cfs_2_sst/cfs.20201231/06/time_grib_01")
        );
    }

    #[test]
    fn test_sea_ice_fetch_day() {
        let config = test_config();
        let locator = Locator::new(Dataset::SeaIce, &config);

        let reqs = locator.locate(t("2021010112")).unwrap();
        assert_eq!(reqs.len(), 1);
        assert!(reqs[0].archive.ends_with("/rh2021/202101/20210101/gpfs_dell1_nco_ops_com_omb_prod_sice.20210101.tar"));
        assert_eq!(reqs[0].members, vec!["./seaice.t00z.5min.grb.grib2"]);
        assert_eq!(
            reqs[0].destination,
            PathBuf::from("/data/gefs_input/sea_ice/sice.20210101")
        );

        let reqs = locator.locate(t("2021010106")).unwrap();
        assert!(reqs[0].archive.ends_with("_sice.20201231.tar"));
        assert_eq!(
            reqs[0].destination,
            PathBuf::from("/data/gefs_input/sea_ice/sice.20201231")
        );
    }

    #[test]
    fn test_gfs_00z_groups() {
        let config = test_config();
        let reqs = Locator::new(Dataset::Gfs15, &config)
            .locate(t("2021010100"))
            .unwrap();

        // Members 1..=30 of the 18Z EnKF the day before: groups 1, 2, 3, then GFS and GDAS.
        assert_eq!(reqs.len(), 5);
        assert!(reqs[0]
            .archive
            .ends_with("/rh2020/202012/20201231/gpfs_dell1_nco_ops_com_gfs_prod_enkfgdas.20201231_18.enkfgdas_grp1.tar"));
        assert!(reqs[0].archive.starts_with("/NCEPPROD/5year/"));
        assert_eq!(reqs[0].members.len(), 10);
        assert_eq!(
            reqs[0].members[0],
            "./enkfgdas.20201231/18/mem001/gdas.t18z.atmf006.nemsio"
        );
        assert!(reqs[2].archive.ends_with("enkfgdas_grp3.tar"));
        assert_eq!(
            reqs[2].members[9],
            "./enkfgdas.20201231/18/mem030/gdas.t18z.atmf006.nemsio"
        );

        assert!(reqs[3].archive.ends_with("gfs_prod_gfs.20210101_00.gfs_nemsioa.tar"));
        assert_eq!(
            reqs[3].members,
            vec![
                "./gfs.20210101/00/gfs.t00z.sfcanl.nemsio",
                "./gfs.20210101/00/gfs.t00z.atmanl.nemsio",
            ]
        );
        assert!(reqs[4].archive.ends_with("gfs_prod_gdas.20210101_00.gdas_nemsioa.tar"));
        assert_eq!(reqs[4].members, vec!["./gdas.20210101/00/gdas.t00z.atmanl.nemsio"]);

        assert!(reqs
            .iter()
            .all(|r| r.destination == PathBuf::from("/data/gefs_input/gfs_15")));
    }

    #[test]
    fn test_gfs_18z_wraps_to_first_group() {
        let config = test_config();
        let reqs = Locator::new(Dataset::Gfs15, &config)
            .locate(t("2021010118"))
            .unwrap();

        let enkf: Vec<&ArchiveRequest> = reqs
            .iter()
            .filter(|r| r.archive.contains("enkfgdas_grp"))
            .collect();
        let groups: Vec<&str> = enkf
            .iter()
            .map(|r| r.archive.rsplit("grp").next().unwrap())
            .collect();
        assert_eq!(groups, vec!["7.tar", "8.tar", "1.tar"]);

        // Previous cycle is 12Z the same day.
        assert!(enkf.iter().all(|r| r.archive.contains("enkfgdas.20210101_12")));

        assert_eq!(
            enkf[2].members.first().unwrap(),
            "./enkfgdas.20210101/12/mem001/gdas.t12z.atmf006.nemsio"
        );
        assert_eq!(enkf.iter().map(|r| r.members.len()).sum::<usize>(), 30);
    }

    #[test]
    fn test_no_duplicate_archives_per_cycle() {
        let config = test_config();
        for hour in &["00", "06", "12", "18"] {
            let reqs = Locator::new(Dataset::Gfs15, &config)
                .locate(t(&format!("20210101{}", hour)))
                .unwrap();
            assert!(reqs.iter().map(|r| &r.archive).all_unique());

            for r in &reqs {
                assert!(r.members.iter().all_unique());
            }
        }
    }

    #[test]
    fn test_large_ensemble_groups_stay_merged() {
        // More members per cycle than the ensemble holds, so groups 1 and 2 come around twice.
        let mut config = test_config();
        config.ensemble.member_count = 100;
        let reqs = Locator::new(Dataset::Gfs15, &config)
            .locate(t("2021010100"))
            .unwrap();

        let enkf: Vec<&ArchiveRequest> = reqs
            .iter()
            .filter(|r| r.archive.contains("enkfgdas_grp"))
            .collect();
        assert_eq!(enkf.len(), 8);
        assert_eq!(enkf[0].members.len(), 10);
        assert!(enkf[0].members.iter().all_unique());
    }

    #[test]
    fn test_bad_template_is_error() {
        let mut config = test_config();
        config.templates.enkf_archive = "grp{member}.tar".to_owned();
        let res = Locator::new(Dataset::Gfs15, &config).locate(t("2021010100"));
        assert!(matches!(res, Err(FetchErr::LocatorTemplateError { .. })));
    }

    #[test]
    fn test_merge_by_archive() {
        let dest = PathBuf::from("/tmp/x");
        let req = |archive: &str, members: &[&str]| ArchiveRequest {
            archive: archive.to_owned(),
            members: members.iter().map(|m| m.to_string()).collect(),
            destination: dest.clone(),
        };

        let merged = ArchiveRequest::merge_by_archive(vec![
            req("a.tar", &["m1"]),
            req("b.tar", &["m2"]),
            req("a.tar", &["m3", "m1"]),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].archive, "a.tar");
        assert_eq!(merged[0].members, vec!["m1", "m3"]);
        assert_eq!(merged[1].members, vec!["m2"]);
    }
}
