//! Where ensemble members live: which members a cycle needs and which tar group holds each.

use std::ops::Range;

use crate::{config::EnsembleLayout, cycle::CycleTime, cycle::HOURS_BETWEEN_CYCLES};

/// First member needed for a cycle; each cycle of the day starts `member_shift` further on.
pub fn first_member(cycle: CycleTime, layout: &EnsembleLayout) -> u32 {
    (cycle.hour() / HOURS_BETWEEN_CYCLES as u32) * layout.member_shift + 1
}

/// The contiguous, 1-based member numbers needed for a cycle. May run past `total_members`.
pub fn members_for(cycle: CycleTime, layout: &EnsembleLayout) -> Range<u32> {
    let first = first_member(cycle, layout);
    first..first + layout.member_count
}

/// Tar group holding a 1-based member, wrapping past the end of the ensemble.
pub fn tar_group(member: u32, layout: &EnsembleLayout) -> u32 {
    debug_assert!(member >= 1);

    ((member - 1) % layout.total_members) / layout.members_per_group + 1
}

/// The archived member number, wrapped into `1..=total_members` the same way as its group.
pub fn archived_member(member: u32, layout: &EnsembleLayout) -> u32 {
    debug_assert!(member >= 1);

    (member - 1) % layout.total_members + 1
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_tar_group() {
        let layout = EnsembleLayout::default();
        assert_eq!(layout.total_members, 80);
        assert_eq!(layout.members_per_group, 10);

        assert_eq!(tar_group(1, &layout), 1);
        assert_eq!(tar_group(10, &layout), 1);
        assert_eq!(tar_group(11, &layout), 2);
        assert_eq!(tar_group(80, &layout), 8);
        assert_eq!(tar_group(81, &layout), 1);
        assert_eq!(tar_group(90, &layout), 1);
        assert_eq!(tar_group(91, &layout), 2);
    }

    #[test]
    fn test_members_by_cycle_hour() {
        let layout = EnsembleLayout::default();
        let cycle = |s: &str| CycleTime::parse(s).unwrap();

        assert_eq!(members_for(cycle("2021010100"), &layout), 1..31);
        assert_eq!(members_for(cycle("2021010106"), &layout), 21..51);
        assert_eq!(members_for(cycle("2021010112"), &layout), 41..71);
        assert_eq!(members_for(cycle("2021010118"), &layout), 61..91);
    }

    #[test]
    fn test_archived_member_wraps() {
        let layout = EnsembleLayout::default();
        assert_eq!(archived_member(1, &layout), 1);
        assert_eq!(archived_member(80, &layout), 80);
        assert_eq!(archived_member(81, &layout), 1);
        assert_eq!(archived_member(90, &layout), 10);
    }
}
