//! Calendar arithmetic shared by the usage accounting and digest jobs.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};

/// Number of trailing calendar days the entry-form frequency window covers.
pub const TRAILING_WINDOW_DAYS: u64 = 30;

/// First instant of the month following `now`. Used as the reset point for
/// monthly export windows.
pub fn start_of_next_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    // The first of a month always exists, so the unwraps below cannot fire.
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

/// First instant of the month containing `now`.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap();
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

/// Oldest date still inside the trailing activity window, inclusive.
pub fn trailing_window_start(today: NaiveDate) -> NaiveDate {
    today - Days::new(TRAILING_WINDOW_DAYS)
}

/// Inclusive first and last day of the calendar month before `now`.
pub fn previous_month_range(now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let last_day = start_of_month(now).date_naive() - Days::new(1);
    let first_day = NaiveDate::from_ymd_opt(last_day.year(), last_day.month(), 1).unwrap();
    (first_day, last_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_month_mid_year() {
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 13, 45, 0).unwrap();
        assert_eq!(
            start_of_next_month(now),
            Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_month_december_rolls_year() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            start_of_next_month(now),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn previous_month_spans_the_whole_month() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        let (first, last) = previous_month_range(now);
        assert_eq!(first, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());

        let january = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (first, last) = previous_month_range(january);
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn window_start_is_inclusive_30_days_back() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        assert_eq!(
            trailing_window_start(today),
            NaiveDate::from_ymd_opt(2026, 7, 9).unwrap()
        );
    }
}
