//! Derived streak values. All functions are pure over a [Habit] except for the longest streak
//! memoization kept inside the habit itself.

use chrono::NaiveDate;
use tracing::trace;

use crate::utils::{
    percentage::{ratio_percentage, Percentage},
    time::days_inclusive,
};

use super::habit::Habit;

/// Current streak below which a personal best isn't highlighted.
pub const HIGHLIGHT_MIN_STREAK: u32 = 3;

/// Number of consecutive completed days directly before `as_of`, provided `as_of` itself is
/// completed. The walk never goes past the creation date.
///
/// For completions on 01-01..01-04 and 01-07..01-09 this yields 3 for 01-04, 2 for 01-09 and 0
/// for 01-07.
pub fn current_streak(habit: &Habit, as_of: NaiveDate) -> u32 {
    if habit.completed_dates().is_empty() || !habit.is_completed(as_of) {
        return 0;
    }

    let mut streak = 0;
    let mut day = as_of.pred_opt();
    while let Some(current) = day {
        if current < habit.creation_date() || !habit.is_completed(current) {
            break;
        }
        streak += 1;
        day = current.pred_opt();
    }
    streak
}

/// Longest run of consecutive completed days over the whole history. The result is memoized in
/// the habit until its completion set changes size or gets invalidated.
pub fn longest_streak(habit: &Habit) -> u32 {
    let completed = habit.completed_dates();
    if completed.is_empty() {
        return 0;
    }

    if let Some(cached) = habit.streak_cache().get(completed.len()) {
        return cached;
    }

    let longest = longest_run(completed.iter().copied());
    trace!("Computed longest streak {longest} for habit {}", habit.id());
    habit.cache_longest(longest);
    longest
}

/// `days` has to be sorted in ascending order.
fn longest_run(days: impl IntoIterator<Item = NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    for day in days {
        current = match previous {
            Some(previous) if (day - previous).num_days() == 1 => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(day);
    }
    longest
}

/// Signals a personal best that is still going on `as_of`.
pub fn is_longest_streak_now(habit: &Habit, as_of: NaiveDate) -> bool {
    let current = current_streak(habit, as_of);
    current >= HIGHLIGHT_MIN_STREAK && current == longest_streak(habit)
}

/// Share of days from creation up to `as_of` (capped at the stop date) that were completed.
/// `None` if the habit didn't exist yet on `as_of`.
pub fn completion_rate(habit: &Habit, as_of: NaiveDate) -> Option<Percentage> {
    let end = habit.stopped_date().map_or(as_of, |stop| stop.min(as_of));
    if end < habit.creation_date() {
        return None;
    }
    let days = days_inclusive(habit.creation_date(), end);
    let completed = habit
        .completed_dates()
        .range(habit.creation_date()..=end)
        .count();
    ratio_percentage(completed as u32, days)
}
