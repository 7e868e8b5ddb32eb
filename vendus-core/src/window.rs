//! Calendar-month date windows.
//!
//! A window always spans one whole month in UTC: the start is day 1 and the
//! end is the last day, found by stepping one month forward from the start
//! and one day back, so month lengths and leap years need no tables.

use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window for the 1-based `month` of the year of `now`.
    ///
    /// Months outside 1..=12 roll into neighbouring years the way a 0-based
    /// month field does: 13 is January of the next year, 0 is December of
    /// the previous one. Returns `None` only when the year leaves chrono's
    /// representable range.
    pub fn for_month(month: i32, now: DateTime<Utc>) -> Option<Self> {
        let zero_based = month.checked_sub(1)?;
        let year = now.year().checked_add(zero_based.div_euclid(12))?;
        let month = zero_based.rem_euclid(12) as u32 + 1;
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
        Some(Self { start, end })
    }

    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    pub fn end_instant(&self) -> DateTime<Utc> {
        self.end.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// `YYYY/M/D`, the format typed into the list filter.
    pub fn start_param(&self) -> String {
        slash_date(self.start)
    }

    pub fn end_param(&self) -> String {
        slash_date(self.end)
    }

    pub fn days(&self) -> u32 {
        self.end.day()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "From {} to {}",
            utc_string(self.start_instant()),
            utc_string(self.end_instant())
        )
    }
}

pub fn slash_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}

fn utc_string(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 15, 42, 7).unwrap()
    }

    #[test]
    fn february_of_a_leap_year() {
        let window = DateWindow::for_month(2, reference(2024, 10, 16)).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(window.start_param(), "2024/2/1");
        assert_eq!(window.end_param(), "2024/2/29");
    }

    #[test]
    fn last_day_matches_every_month() {
        let common = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (year, leap) in [(2023, false), (2024, true), (2100, false), (2000, true)] {
            for month in 1..=12u32 {
                let window = DateWindow::for_month(month as i32, reference(year, 6, 1)).unwrap();
                let expected = if month == 2 && leap {
                    29
                } else {
                    common[month as usize - 1]
                };
                assert_eq!(window.start.day(), 1);
                assert_eq!(window.start.month(), month);
                assert_eq!(window.end.month(), month);
                assert_eq!(window.days(), expected, "{year}-{month}");
            }
        }
    }

    #[test]
    fn reference_day_31_does_not_skip_a_month() {
        let window = DateWindow::for_month(4, reference(2024, 1, 31)).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
    }

    #[test]
    fn months_outside_the_year_roll_over() {
        let now = reference(2024, 3, 10);
        let next = DateWindow::for_month(13, now).unwrap();
        assert_eq!(next.start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let previous = DateWindow::for_month(0, now).unwrap();
        assert_eq!(previous.start, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(previous.end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn unrepresentable_year_yields_none() {
        assert!(DateWindow::for_month(i32::MIN, reference(2024, 1, 1)).is_none());
        assert!(DateWindow::for_month(i32::MAX, reference(2024, 1, 1)).is_none());
    }

    #[test]
    fn display_uses_utc_strings() {
        let window = DateWindow::for_month(2, reference(2024, 5, 5)).unwrap();
        assert_eq!(
            window.to_string(),
            "From Thu, 01 Feb 2024 00:00:00 GMT to Thu, 29 Feb 2024 00:00:00 GMT"
        );
    }
}
