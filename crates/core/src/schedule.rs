//! Daily schedule gate for the expiry scanner.
//!
//! The worker polls on a short interval; [`is_scan_due`] turns that poll
//! into a once-per-local-calendar-day run at (or after) the configured
//! hour. A run that is late — process restart, machine asleep at 08:00 —
//! still happens the same day on the next poll.

use chrono::{DateTime, Local, NaiveDate, Timelike};

/// Hour of day (local time) the daily scan fires at by default.
pub const DEFAULT_SCAN_HOUR: u32 = 8;

/// Whether a scan should run now.
///
/// True when the local clock has reached `run_hour` and no run has been
/// recorded for today's local date yet. The caller records `last_run` after
/// a successful run; a failed run leaves it unset so the next poll retries.
pub fn is_scan_due(now: DateTime<Local>, last_run: Option<NaiveDate>, run_hour: u32) -> bool {
    if now.hour() < run_hour {
        return false;
    }
    last_run != Some(now.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, h, 15, 0).unwrap()
    }

    #[test]
    fn not_due_before_run_hour() {
        assert!(!is_scan_due(local(7), None, DEFAULT_SCAN_HOUR));
    }

    #[test]
    fn due_at_run_hour_when_not_yet_run() {
        assert!(is_scan_due(local(8), None, DEFAULT_SCAN_HOUR));
        assert!(is_scan_due(local(23), None, DEFAULT_SCAN_HOUR));
    }

    #[test]
    fn not_due_twice_on_the_same_day() {
        let today = local(9).date_naive();
        assert!(!is_scan_due(local(9), Some(today), DEFAULT_SCAN_HOUR));
    }

    #[test]
    fn due_again_the_next_day() {
        let yesterday = local(9).date_naive().pred_opt().unwrap();
        assert!(is_scan_due(local(8), Some(yesterday), DEFAULT_SCAN_HOUR));
    }
}
