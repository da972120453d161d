//! Forecast cycle times.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::errors::FetchErr;

/// Hours between synoptic cycles.
pub const HOURS_BETWEEN_CYCLES: i64 = 6;

/// A forecast initialization time, truncated to the whole hour.
///
/// Constructed only through [`CycleTime::parse`] or [`CycleTime::from_datetime`], so the minutes
/// and seconds are always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleTime(NaiveDateTime);

impl CycleTime {
    /// Parse an 8-digit `YYYYMMDD` (hour 00) or 10-digit `YYYYMMDDHH` string.
    pub fn parse(text: &str) -> Result<Self, FetchErr> {
        let bad = || FetchErr::InvalidTimeFormat(text.to_owned());

        if !(text.len() == 8 || text.len() == 10) || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }

        // All ASCII digits, so slicing on byte offsets is safe.
        let year: i32 = text[0..4].parse().map_err(|_| bad())?;
        let month: u32 = text[4..6].parse().map_err(|_| bad())?;
        let day: u32 = text[6..8].parse().map_err(|_| bad())?;
        let hour: u32 = if text.len() == 10 {
            text[8..10].parse().map_err(|_| bad())?
        } else {
            0
        };

        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .map(CycleTime)
            .ok_or_else(bad)
    }

    /// Truncate a date time to the hour.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        let truncated = dt
            .date()
            .and_hms_opt(dt.hour(), 0, 0)
            .unwrap_or_else(|| dt.date().and_time(chrono::NaiveTime::MIN));
        CycleTime(truncated)
    }

    /// Hour of the day.
    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    /// True if this is one of the 00, 06, 12, 18 synoptic hours.
    pub fn is_synoptic(self) -> bool {
        i64::from(self.hour()) % HOURS_BETWEEN_CYCLES == 0
    }

    /// Fail with `InvalidCycleHour` unless this is a synoptic hour.
    pub fn require_synoptic(self) -> Result<Self, FetchErr> {
        if self.is_synoptic() {
            Ok(self)
        } else {
            Err(FetchErr::InvalidCycleHour(self.hour()))
        }
    }

    /// Shift by a (possibly negative) number of hours.
    pub fn shifted(self, hours: i64) -> Self {
        CycleTime(self.0 + Duration::hours(hours))
    }

    /// The same day at 00Z.
    pub fn truncated_to_day(self) -> Self {
        CycleTime(self.0.date().and_time(chrono::NaiveTime::MIN))
    }

    /// The underlying date time, for formatting.
    pub fn datetime(self) -> NaiveDateTime {
        self.0
    }

    /// Whole hours from `self` until `later`.
    pub fn hours_until(self, later: CycleTime) -> i64 {
        (later.0 - self.0).num_hours()
    }
}

impl fmt::Display for CycleTime {
    /// Always the 10-digit `YYYYMMDDHH` form, the form used in serialized time arrays.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d%H"))
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_parse_ten_digits() {
        let t = CycleTime::parse("2021010118").unwrap();
        assert_eq!(t.hour(), 18);
        assert_eq!(t.to_string(), "2021010118");
    }

    #[test]
    fn test_parse_eight_digits_defaults_to_00z() {
        let t = CycleTime::parse("20210101").unwrap();
        assert_eq!(t.hour(), 0);
        assert_eq!(t.to_string(), "2021010100");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in &[
            "",
            "2021",
            "202101010",
            "20210101000",
            "2021O10100",
            "2021133100",
            "2021023000",
            "2021010124",
            "+021010100",
        ] {
            match CycleTime::parse(bad) {
                Err(FetchErr::InvalidTimeFormat(s)) => assert_eq!(&s, bad),
                other => panic!("{:?} parsed to {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_synoptic_hours() {
        for (text, ok) in &[
            ("2021010100", true),
            ("2021010106", true),
            ("2021010112", true),
            ("2021010118", true),
            ("2021010103", false),
            ("2021010121", false),
        ] {
            let t = CycleTime::parse(text).unwrap();
            assert_eq!(t.is_synoptic(), *ok, "{}", text);
        }

        match CycleTime::parse("2021010103").unwrap().require_synoptic() {
            Err(FetchErr::InvalidCycleHour(3)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shift_and_truncate() {
        let t = CycleTime::parse("2021010106").unwrap();
        assert_eq!(t.shifted(-12).to_string(), "2020123118");
        assert_eq!(t.shifted(-12).truncated_to_day().to_string(), "2020123100");
        assert_eq!(t.shifted(-24).to_string(), "2020123106");
        assert_eq!(t.hours_until(t.shifted(48)), 48);
    }
}
