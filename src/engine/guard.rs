//! Replication cursor and ordering checks

use crate::streams::days_to_look_back;
use chrono::{DateTime, Utc};

/// Where incremental replication of one partition starts
///
/// Fixed for the whole partition sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationCursor {
    starting_value: Option<DateTime<Utc>>,
}

impl ReplicationCursor {
    /// Cursor starting at `starting_value`
    pub fn new(starting_value: Option<DateTime<Utc>>) -> Self {
        Self { starting_value }
    }

    /// Cursor for a full sync
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Prior bookmark, if any
    pub fn starting_value(&self) -> Option<DateTime<Utc>> {
        self.starting_value
    }

    /// Whole days between the starting value and `now`
    pub fn lookback_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.starting_value
            .map(|starting| days_to_look_back(starting, now))
    }

    /// Ordering guard seeded with this cursor
    pub fn guard(&self) -> SortednessGuard<DateTime<Utc>> {
        SortednessGuard::new(self.starting_value)
    }
}

/// Latched check that replication values never decrease
///
/// Day-granularity lookback can return older records ahead of the bookmark,
/// so nothing is compared until a value at or past the starting value shows
/// up. From then on each value must be `>=` the previous one; the first
/// violation flips the guard to unsorted for good.
#[derive(Debug, Clone)]
pub struct SortednessGuard<T> {
    starting: Option<T>,
    previous: Option<T>,
    checking: bool,
    sorted: bool,
}

impl<T: PartialOrd + Clone> SortednessGuard<T> {
    /// Create a guard; without a starting value every record is checked
    pub fn new(starting: Option<T>) -> Self {
        let checking = starting.is_none();
        Self {
            starting,
            previous: None,
            checking,
            sorted: true,
        }
    }

    /// Feed the next value and return whether the sequence is still sorted
    pub fn observe(&mut self, value: T) -> bool {
        if !self.checking {
            match &self.starting {
                Some(starting) if value < *starting => return self.sorted,
                _ => self.checking = true,
            }
        }

        if let Some(previous) = &self.previous {
            if value < *previous {
                self.sorted = false;
            }
        }
        self.previous = Some(value);
        self.sorted
    }

    /// Whether every checked value so far was in order
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Whether the starting value has been reached
    pub fn is_checking(&self) -> bool {
        self.checking
    }
}

#[cfg(test)]
mod guard_tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_latches_on_first_decrease() {
        let mut guard = SortednessGuard::new(Some(5));
        let seen: Vec<bool> = [5, 7, 7, 6, 9].into_iter().map(|v| guard.observe(v)).collect();

        assert_eq!(seen, vec![true, true, true, false, false]);
        assert!(!guard.is_sorted());
    }

    #[test]
    fn test_ignores_records_before_cursor() {
        let mut guard = SortednessGuard::new(Some(10));

        assert!(guard.observe(8));
        assert!(guard.observe(3));
        assert!(!guard.is_checking());

        assert!(guard.observe(10));
        assert!(guard.is_checking());
        assert!(guard.observe(12));
        assert!(!guard.observe(4));
    }

    #[test]
    fn test_without_cursor_checks_from_first_record() {
        let mut guard = SortednessGuard::new(None);
        assert!(guard.is_checking());
        assert!(guard.observe(3));
        assert!(!guard.observe(1));
    }

    #[test]
    fn test_cursor_lookback() {
        let now = Utc::now();
        let cursor = ReplicationCursor::new(Some(now - Duration::hours(84)));
        assert_eq!(cursor.lookback_days(now), Some(3));
        assert_eq!(ReplicationCursor::unbounded().lookback_days(now), None);
    }

    #[test]
    fn test_cursor_seeds_guard() {
        let now = Utc::now();
        let cursor = ReplicationCursor::new(Some(now));
        let mut guard = cursor.guard();

        assert!(guard.observe(now - Duration::days(2)));
        assert!(!guard.is_checking());
        assert!(guard.observe(now));
        assert!(guard.is_checking());
    }
}
