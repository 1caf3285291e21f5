//! Weekly periods: each period is named by the Sunday that closes it.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// The Sunday on or after `today`.
pub fn period_end(today: NaiveDate) -> NaiveDate {
    let ahead = (7 - today.weekday().num_days_from_sunday()) % 7;
    today + Days::new(u64::from(ahead))
}

/// Whole weeks between `epoch` and `period_end`, floored. Dates before the
/// epoch give negative indices.
pub fn period_index(period_end: NaiveDate, epoch: NaiveDate) -> i64 {
    (period_end - epoch).num_days().div_euclid(7)
}

/// Every Sunday in `[from, to]`, ascending.
pub fn enumerate_periods(from: NaiveDate, to: NaiveDate) -> Periods {
    Periods { next: period_end(from), to }
}

/// Iterator returned by [`enumerate_periods`]. Cloning restarts from the
/// same position.
#[derive(Debug, Clone)]
pub struct Periods {
    next: NaiveDate,
    to: NaiveDate,
}

impl Iterator for Periods {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.next > self.to {
            return None;
        }
        let current = self.next;
        self.next = current + Days::new(7);
        Some(current)
    }
}

pub fn is_period_end(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse `YYYY-MM-DD`, tolerating a trailing time component.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
