//! Calendar-math helpers: leap-year test, days-in-month, day-of-week.
//!
//! Kept deliberately small; `day_of_week` leans on `chrono`, already a
//! dependency, rather than reimplementing Zeller's congruence by hand.

use chrono::{Datelike, NaiveDate, Weekday};

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn days_in_month(month: u8, leap: bool) -> u16 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if leap {
                29
            } else {
                28
            }
        }
        _ => panic!("month out of range: {month}"),
    }
}

/// Panics if `(year, month, day)` isn't a valid calendar date; callers in
/// this crate only ever call it after `day_of_year_to_month_day` has
/// already validated the components.
pub fn day_of_week(year: i32, month: u8, day: u8) -> Weekday {
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .expect("caller must validate date components first")
        .weekday()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_year_rules() {
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2000));
    }

    #[test]
    fn days_in_month_handles_february() {
        assert_eq!(days_in_month(2, true), 29);
        assert_eq!(days_in_month(2, false), 28);
    }
}
