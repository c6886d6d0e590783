//! Temporal filtering of archive dates.
//!
//! Date directories in the archive are named `YYYYDDD` (year + zero-padded day of year).
//! A [`DateRangeFilter`] combines an absolute date interval with a day-of-year interval;
//! a date is kept only when both hold. The day-of-year interval is a plain numeric
//! range: `350,10` is rejected rather than wrapped across the new year.
use crate::error::{ArchiveError, Result};
use chrono::{Datelike, NaiveDate};

pub const FIRST_DAY: u32 = 1;
pub const LAST_DAY: u32 = 366;

/// Parse a `YYYYDDD` date directory name.
pub fn parse_date_dir(name: &str) -> Option<NaiveDate> {
    if name.len() != 7 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = name[..4].parse().ok()?;
    let ordinal: u32 = name[4..].parse().ok()?;
    NaiveDate::from_yo_opt(year, ordinal)
}

/// Format a date as its `YYYYDDD` directory name.
pub fn format_date_dir(date: NaiveDate) -> String {
    date.format("%Y%j").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_day: u32,
    pub end_day: u32,
}

impl Default for DateRangeFilter {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::MIN,
            end_date: NaiveDate::MAX,
            start_day: FIRST_DAY,
            end_day: LAST_DAY,
        }
    }
}

impl DateRangeFilter {
    /// Build a filter from the optional `start,end` date and day-of-year strings.
    ///
    /// Dates may be written `YYYY-MM-DD`, `YYYYDDD` or `YYYY`; a bare year covers the
    /// whole year. A single value without a comma is used for both bounds.
    pub fn parse(dates: Option<&str>, days: Option<&str>) -> Result<Self> {
        let mut filter = Self::default();
        if let Some(dates) = dates {
            let (start, end) = parse_date_range(dates)?;
            filter.start_date = start;
            filter.end_date = end;
        }
        if let Some(days) = days {
            let (start, end) = parse_day_range(days)?;
            filter.start_day = start;
            filter.end_day = end;
        }
        Ok(filter)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let day = date.ordinal();
        (self.start_date <= date && date <= self.end_date)
            && (self.start_day <= day && day <= self.end_day)
    }
}

enum Bound {
    Start,
    End,
}

fn parse_date_range(text: &str) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || ArchiveError::InvalidDateRange(text.to_string());
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let (start, end) = match parts.as_slice() {
        [single] => (*single, *single),
        [start, end] => (*start, *end),
        _ => return Err(invalid()),
    };
    let start = parse_date(start, Bound::Start).ok_or_else(invalid)?;
    let end = parse_date(end, Bound::End).ok_or_else(invalid)?;
    if start > end {
        return Err(invalid());
    }
    Ok((start, end))
}

fn parse_date(token: &str, bound: Bound) -> Option<NaiveDate> {
    let all_digits = !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit());
    match token.len() {
        4 if all_digits => {
            let year: i32 = token.parse().ok()?;
            match bound {
                Bound::Start => NaiveDate::from_ymd_opt(year, 1, 1),
                Bound::End => NaiveDate::from_ymd_opt(year, 12, 31),
            }
        }
        7 if all_digits => parse_date_dir(token),
        _ => NaiveDate::parse_from_str(token, "%Y-%m-%d").ok(),
    }
}

fn parse_day_range(text: &str) -> Result<(u32, u32)> {
    let invalid = || ArchiveError::InvalidDayRange(text.to_string());
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [start, end] = parts.as_slice() else {
        return Err(invalid());
    };
    let start: u32 = start.parse().map_err(|_| invalid())?;
    let end: u32 = end.parse().map_err(|_| invalid())?;
    let valid = |day: u32| (FIRST_DAY..=LAST_DAY).contains(&day);
    if !valid(start) || !valid(end) || start > end {
        return Err(invalid());
    }
    Ok((start, end))
}
