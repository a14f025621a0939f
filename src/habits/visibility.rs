use chrono::NaiveDate;

use super::habit::Habit;

/// A habit is shown for every day in `[creation_date, stopped_date]`, or from `creation_date` on
/// if it was never stopped.
pub fn is_visible_on(habit: &Habit, date: NaiveDate) -> bool {
    habit.creation_date() <= date && habit.stopped_date().map_or(true, |stop| date <= stop)
}

/// Keeps collection order.
pub fn habits_for_date<'a>(
    habits: impl IntoIterator<Item = &'a Habit>,
    date: NaiveDate,
) -> impl Iterator<Item = &'a Habit> {
    habits.into_iter().filter(move |h| is_visible_on(h, date))
}
