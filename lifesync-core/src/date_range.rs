//! Sync window used to bound recurrence expansion.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Absolute-time bounds for expansion. Both ends are inclusive.
///
/// Independent of whatever range is later used to read events back for
/// display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        SyncWindow { start, end }
    }

    /// Window from the start of the UTC day `days_back` days ago to the end
    /// of the UTC day `days_forward` days ahead, plus one day of cutoff so
    /// events starting on the last day are still picked up.
    pub fn from_days(now: DateTime<Utc>, days_back: i64, days_forward: i64) -> Self {
        let today = now.date_naive();
        let start = (today - Duration::days(days_back))
            .and_time(NaiveTime::MIN)
            .and_utc();
        let end = (today + Duration::days(days_forward + 1))
            .and_time(end_of_day())
            .and_utc();

        SyncWindow { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn from_days_adds_a_cutoff_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 30, 0).unwrap();
        let window = SyncWindow::from_days(now, 0, 30);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 4, 10, 23, 59, 59).unwrap());
    }

    #[test]
    fn bounds_are_inclusive() {
        let window = SyncWindow::from_days(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(), 0, 30);

        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + Duration::seconds(1)));
    }
}
