//! Turn command line time arguments into the ordered set of cycle times to retrieve.

use itertools::Itertools;

use crate::{cycle::CycleTime, cycle::HOURS_BETWEEN_CYCLES, errors::FetchErr};

/// Interval used when none is given on the command line.
pub const DEFAULT_INTERVAL_HOURS: i64 = 24;

/// A validated start, end and step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    start: CycleTime,
    end: CycleTime,
    interval: i64,
}

impl TimeRange {
    /// Validate the raw arguments.
    ///
    /// Checks run in a fixed order so that an invalid interval is reported as such no matter
    /// what the time strings look like: interval, then time formats, then the start's cycle hour,
    /// then the ordering of start and end.
    pub fn parse(start: &str, end: Option<&str>, interval: Option<&str>) -> Result<Self, FetchErr> {
        let interval = match interval {
            Some(text) => parse_interval(text)?,
            None => DEFAULT_INTERVAL_HOURS,
        };

        let start_time = CycleTime::parse(start)?;
        let end_time = match end {
            Some(text) => CycleTime::parse(text)?,
            None => start_time,
        };

        Self::new(start_time, end_time, interval)
    }

    /// Build a range from already parsed times.
    pub fn new(start: CycleTime, end: CycleTime, interval: i64) -> Result<Self, FetchErr> {
        if interval <= 0 || interval % HOURS_BETWEEN_CYCLES != 0 {
            return Err(FetchErr::InvalidInterval(interval.to_string()));
        }

        start.require_synoptic()?;

        if end < start {
            return Err(FetchErr::EndBeforeStart {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        Ok(TimeRange {
            start,
            end,
            interval,
        })
    }

    /// First requested time.
    pub fn start(&self) -> CycleTime {
        self.start
    }

    /// Last requested time. Not necessarily a member of the expanded series.
    pub fn end(&self) -> CycleTime {
        self.end
    }

    /// Step between cycles, in hours.
    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// Number of cycle times the range expands to, computed without expanding it.
    pub fn count(&self) -> usize {
        (self.start.hours_until(self.end) / self.interval) as usize + 1
    }

    /// Step from start through end inclusive, refusing ranges longer than `max_times`.
    pub fn expand(&self, max_times: usize) -> Result<TimeSeries, FetchErr> {
        let count = self.count();
        if count > max_times {
            return Err(FetchErr::RangeTooLarge {
                count,
                max: max_times,
            });
        }

        let start = self.start;
        let interval = self.interval;
        let times = (0..count as i64).map(|step| start.shifted(step * interval));

        Ok(TimeSeries { times: times.collect() })
    }
}

fn parse_interval(text: &str) -> Result<i64, FetchErr> {
    match text.trim().parse::<i64>() {
        Ok(hours) if hours > 0 && hours % HOURS_BETWEEN_CYCLES == 0 => Ok(hours),
        _ => Err(FetchErr::InvalidInterval(text.to_owned())),
    }
}

/// Strictly increasing, non-empty sequence of cycle times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeSeries {
    times: Vec<CycleTime>,
}

impl TimeSeries {
    /// A series holding one time.
    pub fn single(time: CycleTime) -> Self {
        TimeSeries { times: vec![time] }
    }

    /// Sort and de-duplicate arbitrary times. Returns `None` if there are none.
    pub fn from_times(times: impl IntoIterator<Item = CycleTime>) -> Option<Self> {
        let times: Vec<CycleTime> = times.into_iter().sorted().dedup().collect();
        if times.is_empty() {
            None
        } else {
            Some(TimeSeries { times })
        }
    }

    /// Worker entry: pick one element of a serialized time array.
    ///
    /// `index` is the scheduler's array index as text and `index_base` the index of the first
    /// element, 0 or 1 depending on the scheduler. The array is checked only as far as needed to
    /// select and validate one element, so a worker never fails on a neighbour's entry.
    pub fn from_array(list: Option<&str>, index: &str, index_base: usize) -> Result<Self, FetchErr> {
        let list = list
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(FetchErr::MissingTimeArray)?;

        let elements: Vec<&str> = list.split(',').map(str::trim).collect();
        let out_of_range = || FetchErr::IndexOutOfRange {
            index: index.to_owned(),
            len: elements.len(),
        };

        let selected = index
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|raw| raw.checked_sub(index_base))
            .and_then(|idx| elements.get(idx))
            .ok_or_else(out_of_range)?;

        if selected.len() != 10 {
            return Err(FetchErr::InvalidTimeFormat((*selected).to_owned()));
        }
        let time = CycleTime::parse(selected)?.require_synoptic()?;

        Ok(TimeSeries::single(time))
    }

    /// Number of times.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Never true, a series always has at least one element. Present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Earliest time.
    pub fn first(&self) -> CycleTime {
        self.times[0]
    }

    /// Latest time.
    pub fn last(&self) -> CycleTime {
        self.times[self.times.len() - 1]
    }

    /// Iterate in order.
    pub fn iter(&self) -> impl Iterator<Item = CycleTime> + '_ {
        self.times.iter().copied()
    }

    /// Comma separated 10-digit times, the form handed to array job workers.
    pub fn serialize(&self) -> String {
        self.times.iter().join(",")
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    fn t(s: &str) -> CycleTime {
        CycleTime::parse(s).unwrap()
    }

    #[test]
    fn test_defaults() {
        let range = TimeRange::parse("20210101", None, None).unwrap();
        assert_eq!(range.interval(), DEFAULT_INTERVAL_HOURS);
        assert_eq!(range.start(), range.end());

        let series = range.expand(1000).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.first(), t("2021010100"));
    }

    #[test]
    fn test_expand_strictly_increasing() {
        let series = TimeRange::parse("2021010100", Some("2021011018"), Some("6"))
            .unwrap()
            .expand(1000)
            .unwrap();

        assert_eq!(series.len(), 40);
        assert_eq!(series.first(), t("2021010100"));
        assert_eq!(series.last(), t("2021011018"));
        assert!(series.iter().tuple_windows().all(|(a, b)| a < b));
        assert!(series.iter().all(|c| c.is_synoptic()));
    }

    #[test]
    fn test_expand_end_not_on_step() {
        let series = TimeRange::parse("2021010100", Some("2021010312"), Some("24"))
            .unwrap()
            .expand(1000)
            .unwrap();

        assert_eq!(series.serialize(), "2021010100,2021010200,2021010300");
    }

    #[test]
    fn test_invalid_interval_wins_over_bad_times() {
        for interval in &["7", "0", "-6", "abc", "12.0"] {
            match TimeRange::parse("garbage", Some("2021010103"), Some(interval)) {
                Err(FetchErr::InvalidInterval(_)) => {}
                other => panic!("interval {} gave {:?}", interval, other),
            }
        }
    }

    #[test]
    fn test_invalid_cycle_hour() {
        for start in &["2021010101", "2021010103", "2021010109", "2021010123"] {
            match TimeRange::parse(start, Some("2021010200"), Some("24")) {
                Err(FetchErr::InvalidCycleHour(_)) => {}
                other => panic!("start {} gave {:?}", start, other),
            }
        }
    }

    #[test]
    fn test_invalid_format() {
        assert!(matches!(
            TimeRange::parse("202101010", None, None),
            Err(FetchErr::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            TimeRange::parse("2021010100", Some("2021-01-02"), None),
            Err(FetchErr::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn test_end_before_start() {
        assert!(matches!(
            TimeRange::parse("2021010200", Some("2021010100"), None),
            Err(FetchErr::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_range_guard() {
        // 1001 six-hourly cycles: 1000 steps of 6 hours.
        let start = t("2021010100");
        let end = start.shifted(6000);
        let range = TimeRange::new(start, end, 6).unwrap();
        assert_eq!(range.count(), 1001);

        match range.expand(1000) {
            Err(FetchErr::RangeTooLarge { count, max }) => {
                assert_eq!(count, 1001);
                assert_eq!(max, 1000);
            }
            other => panic!("unexpected {:?}", other),
        }

        let range = TimeRange::new(start, start.shifted(5994), 6).unwrap();
        assert_eq!(range.expand(1000).unwrap().len(), 1000);
    }

    #[test]
    fn test_from_array() {
        let list = "2021010100,2021010200,2021010300";

        let series = TimeSeries::from_array(Some(list), "1", 0).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.first(), t("2021010200"));

        assert!(matches!(
            TimeSeries::from_array(Some(list), "3", 0),
            Err(FetchErr::IndexOutOfRange { len: 3, .. })
        ));
        assert!(matches!(
            TimeSeries::from_array(Some(list), "-1", 0),
            Err(FetchErr::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            TimeSeries::from_array(None, "0", 0),
            Err(FetchErr::MissingTimeArray)
        ));
        assert!(matches!(
            TimeSeries::from_array(Some("  "), "0", 0),
            Err(FetchErr::MissingTimeArray)
        ));
        assert!(matches!(
            TimeSeries::from_array(Some("20210101,2021010200"), "0", 0),
            Err(FetchErr::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            TimeSeries::from_array(Some("2021010103"), "0", 0),
            Err(FetchErr::InvalidCycleHour(3))
        ));
    }

    #[test]
    fn test_from_array_one_based() {
        let list = "2021010100,2021010200";

        let series = TimeSeries::from_array(Some(list), "2", 1).unwrap();
        assert_eq!(series.first(), t("2021010200"));

        assert!(matches!(
            TimeSeries::from_array(Some(list), "0", 1),
            Err(FetchErr::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            TimeSeries::from_array(Some(list), "3", 1),
            Err(FetchErr::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_from_times_sorts_and_dedups() {
        let series = TimeSeries::from_times(vec![
            t("2021010200"),
            t("2021010100"),
            t("2021010200"),
        ])
        .unwrap();
        assert_eq!(series.serialize(), "2021010100,2021010200");
        assert!(TimeSeries::from_times(vec![]).is_none());
    }
}
