use std::{cell::Cell, collections::BTreeSet};

use chrono::NaiveDate;

/// Creation timestamp in milliseconds since the Unix epoch.
pub type HabitId = i64;

/// Memoized longest streak. The value is trusted only while `computed_at` equals the current
/// number of completed dates; `None` marks it as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakCache {
    pub longest: u32,
    pub computed_at: Option<usize>,
}

impl StreakCache {
    pub const INVALID: StreakCache = StreakCache {
        longest: 0,
        computed_at: None,
    };

    pub fn get(&self, completed_count: usize) -> Option<u32> {
        (self.computed_at == Some(completed_count)).then_some(self.longest)
    }
}

/// A tracked activity. Visible and completable from `creation_date` until `stopped_date`
/// (inclusive) if one is set.
#[derive(Debug, Clone)]
pub struct Habit {
    pub(crate) id: HabitId,
    pub(crate) name: String,
    pub(crate) creation_date: NaiveDate,
    pub(crate) stopped_date: Option<NaiveDate>,
    pub(crate) active: bool,
    pub(crate) completed_dates: BTreeSet<NaiveDate>,
    pub(crate) streak_cache: Cell<StreakCache>,
}

impl Habit {
    pub fn new(id: HabitId, name: String, creation_date: NaiveDate) -> Self {
        Self {
            id,
            name,
            creation_date,
            stopped_date: None,
            active: true,
            completed_dates: BTreeSet::new(),
            streak_cache: Cell::new(StreakCache {
                longest: 0,
                computed_at: Some(0),
            }),
        }
    }

    pub fn id(&self) -> HabitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn creation_date(&self) -> NaiveDate {
        self.creation_date
    }

    pub fn stopped_date(&self) -> Option<NaiveDate> {
        self.stopped_date
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn completed_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.completed_dates
    }

    pub fn streak_cache(&self) -> StreakCache {
        self.streak_cache.get()
    }

    pub fn is_completed(&self, date: NaiveDate) -> bool {
        self.completed_dates.contains(&date)
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn stop(&mut self, date: NaiveDate) {
        self.stopped_date = Some(date);
        self.active = false;
    }

    /// Adds or removes `date`. The streak cache is dropped even if membership didn't change.
    ///
    /// Dates outside of the visibility window are accepted as is.
    pub(crate) fn set_completed(&mut self, date: NaiveDate, completed: bool) {
        if completed {
            self.completed_dates.insert(date);
        } else {
            self.completed_dates.remove(&date);
        }
        self.streak_cache.set(StreakCache::INVALID);
    }

    pub(crate) fn cache_longest(&self, longest: u32) {
        self.streak_cache.set(StreakCache {
            longest,
            computed_at: Some(self.completed_dates.len()),
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Habit, StreakCache};

    #[test]
    fn test_set_completed_is_idempotent() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let mut habit = Habit::new(1, "Test".into(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

        habit.set_completed(date, true);
        habit.set_completed(date, true);
        assert_eq!(habit.completed_dates().len(), 1);

        habit.set_completed(date, false);
        habit.set_completed(date, false);
        assert!(habit.completed_dates().is_empty());
    }

    #[test]
    fn test_set_completed_invalidates_cache() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let mut habit = Habit::new(1, "Test".into(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(habit.streak_cache().get(0), Some(0));

        // Removing an absent date still drops the cache.
        habit.set_completed(date, false);
        assert_eq!(habit.streak_cache(), StreakCache::INVALID);
        assert_eq!(habit.streak_cache().get(0), None);
    }

    #[test]
    fn test_stop() {
        let mut habit = Habit::new(1, "Test".into(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        habit.stop(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert!(!habit.is_active());
        assert_eq!(habit.stopped_date(), NaiveDate::from_ymd_opt(2025, 1, 3));
    }
}
