//! Trading-calendar helpers. Only weekends are treated as closed days.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The next weekday strictly after `date`.
pub fn next_trading_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while is_weekend(next) {
        next += Duration::days(1);
    }
    next
}

/// `end`, `end - 1`, ... going back `days` calendar days (newest first).
pub fn days_back(end: NaiveDate, days: i64) -> Vec<NaiveDate> {
    (0..days.max(0)).map(|offset| end - Duration::days(offset)).collect()
}

/// Every calendar day in `[start, end]`, ascending. Empty when `start > end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}
