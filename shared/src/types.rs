//! Common types used across the platform

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// ISO 8601 week, the planning unit of the cooperative
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    pub fn new(year: i32, week: u32) -> Option<Self> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).map(|_| Self { year, week })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday of the week
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }

    /// Sunday of the week
    pub fn last_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Sun)
    }
}

impl std::fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Widen optional bounds outward to the Monday and Sunday of their ISO weeks
pub fn widen_to_iso_weeks(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    (
        from.and_then(|d| IsoWeek::from_date(d).first_day()),
        to.and_then(|d| IsoWeek::from_date(d).last_day()),
    )
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub const MAX_PER_PAGE: u32 = 500;

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, Self::MAX_PER_PAGE))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

/// Inclusive date range for queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_week_crosses_year_boundary() {
        // 2024-12-30 is Monday of 2025-W01
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(IsoWeek::from_date(date), IsoWeek { year: 2025, week: 1 });
    }

    #[test]
    fn week_53_only_exists_in_long_years() {
        assert!(IsoWeek::new(2020, 53).is_some());
        assert!(IsoWeek::new(2021, 53).is_none());
    }

    #[test]
    fn widened_bounds_cover_whole_weeks() {
        // Wednesday 2024-06-12 and Tuesday 2024-06-18
        let from = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 18).unwrap();
        let (start, end) = widen_to_iso_weeks(Some(from), Some(to));
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 6, 23));
        assert_eq!(widen_to_iso_weeks(None, None), (None, None));
    }

    #[test]
    fn pagination_offset() {
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }
}
