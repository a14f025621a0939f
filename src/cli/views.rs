use std::fmt::Write;

use ansi_term::Colour;
use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveTime};
use now::DateTimeNow;

use crate::{
    habits::{habit::Habit, visibility::is_visible_on, HabitStore},
    storage::kv::KeyValueStore,
    utils::{percentage::Percentage, time::date_to_key},
};

const DAYS_IN_WEEK: i64 = 7;

/// Habits visible on `date`, with completion and streak information.
///
/// The personal best marker never shows for a consistent cache, since `current_streak` excludes
/// `date` itself while the longest streak counts whole runs.
pub fn render_day<S: KeyValueStore>(store: &HabitStore<S>, date: NaiveDate) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{}", date.format("%a %Y-%m-%d"))?;

    let habits = store.habits_for_date(date);
    if habits.is_empty() {
        writeln!(out, "  No habits for this day")?;
        return Ok(out);
    }

    for habit in habits {
        let id = habit.id();
        let mark = if store.is_completed(id, date) {
            Colour::Green.paint("[x]").to_string()
        } else {
            "[ ]".to_string()
        };
        let current = store.current_streak(id, date);
        let longest = store.longest_streak(id);
        let best = if store.is_longest_streak_now(id, date) {
            Colour::Yellow.bold().paint(" personal best").to_string()
        } else {
            String::new()
        };
        writeln!(
            out,
            "  {mark} {id}\t{}\tstreak {current}\tlongest {longest}{best}",
            habit.name()
        )?;
    }
    Ok(out)
}

/// Seven day grid for the week containing `date`.
pub fn render_week<S: KeyValueStore>(store: &HabitStore<S>, date: NaiveDate) -> Result<String> {
    let start = week_start(date);
    let days = (0..DAYS_IN_WEEK)
        .map(|v| start + Duration::days(v))
        .collect::<Vec<_>>();

    let mut out = String::new();
    write!(out, "{:<24}", format!("Week of {}", date_to_key(start)))?;
    for day in &days {
        write!(out, " {}", day.format("%a"))?;
    }
    writeln!(out)?;

    for habit in store.habits() {
        if !days.iter().any(|d| is_visible_on(habit, *d)) {
            continue;
        }
        write!(out, "{:<24}", truncate(habit.name(), 23))?;
        for day in &days {
            write!(out, " {}", week_cell(habit, *day))?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

fn week_cell(habit: &Habit, day: NaiveDate) -> String {
    if !is_visible_on(habit, day) {
        "   ".to_string()
    } else if habit.is_completed(day) {
        Colour::Green.paint(" x ").to_string()
    } else {
        " . ".to_string()
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .beginning_of_week()
        .date_naive()
}

/// Current and longest streaks plus completion rate for every habit that existed on `date`.
pub fn render_streaks<S: KeyValueStore>(
    store: &HabitStore<S>,
    date: NaiveDate,
    min_rate: Percentage,
) -> Result<String> {
    let mut out = String::new();
    for habit in store.habits() {
        let id = habit.id();
        let Some(rate) = store.completion_rate(id, date) else {
            continue;
        };
        if rate < min_rate {
            continue;
        }
        let state = match habit.stopped_date() {
            Some(stop) => format!("stopped {}", date_to_key(stop)),
            None => "active".to_string(),
        };
        writeln!(
            out,
            "{id}\t{}\tcurrent {}\tlongest {}\t{rate}\t{state}",
            habit.name(),
            store.current_streak(id, date),
            store.longest_streak(id),
        )?;
    }
    Ok(out)
}

/// Every habit ever created, including stopped ones.
pub fn render_list<S: KeyValueStore>(store: &HabitStore<S>) -> Result<String> {
    let mut out = String::new();
    for habit in store.habits() {
        let state = match habit.stopped_date() {
            Some(stop) => format!("stopped {}", date_to_key(stop)),
            None if habit.is_active() => "active".to_string(),
            None => "inactive".to_string(),
        };
        writeln!(
            out,
            "{}\t{}\tsince {}\t{state}",
            habit.id(),
            habit.name(),
            date_to_key(habit.creation_date())
        )?;
    }
    Ok(out)
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut v = value.chars().take(max.saturating_sub(1)).collect::<String>();
        v.push('~');
        v
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;

    use crate::{
        habits::HabitStore,
        storage::kv::MemoryStore,
        utils::{clock::FixedClock, percentage::Percentage},
    };

    use super::{render_day, render_list, render_streaks, render_week, truncate, week_start};

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn sample_store() -> Result<HabitStore<MemoryStore>> {
        let mut store = HabitStore::new(
            MemoryStore::new(),
            Box::new(FixedClock::at_day(day("2025-04-20"))),
        );
        let read = store.add("Read a book")?;
        let walk = store.add("Walk")?;
        store.set_completion(read, day("2025-04-20"), true)?;
        store.set_completion(read, day("2025-04-21"), true)?;
        store.stop(walk, day("2025-04-21"))?;
        Ok(store)
    }

    #[test]
    fn test_render_day() -> Result<()> {
        let store = sample_store()?;
        let out = render_day(&store, day("2025-04-21"))?;
        assert!(out.starts_with("Mon 2025-04-21"));
        assert!(out.contains("Read a book"));
        assert!(out.contains("streak 1"));
        assert!(out.contains("Walk"));

        let out = render_day(&store, day("2025-04-22"))?;
        assert!(!out.contains("Walk"));

        let out = render_day(&store, day("2025-04-19"))?;
        assert!(out.contains("No habits for this day"));
        Ok(())
    }

    #[test]
    fn test_render_day_without_personal_best() -> Result<()> {
        let mut store = HabitStore::new(
            MemoryStore::new(),
            Box::new(FixedClock::at_day(day("2025-04-01"))),
        );
        let id = store.add("Run")?;
        for d in ["2025-04-01", "2025-04-02", "2025-04-03", "2025-04-04", "2025-04-05"] {
            store.set_completion(id, day(d), true)?;
        }

        // Four days precede 04-05 while the whole run is five long.
        let out = render_day(&store, day("2025-04-05"))?;
        assert!(out.contains("streak 4"));
        assert!(out.contains("longest 5"));
        assert!(!out.contains("personal best"));
        Ok(())
    }

    #[test]
    fn test_render_week() -> Result<()> {
        let store = sample_store()?;
        let out = render_week(&store, day("2025-04-23"))?;
        assert_eq!(out.lines().count(), 3);
        assert!(out.contains("Read a book"));

        let out = render_week(&store, day("2025-05-14"))?;
        assert!(!out.contains("Walk"));
        Ok(())
    }

    #[test]
    fn test_week_start_contains_date() {
        let date = day("2025-04-23");
        let start = week_start(date);
        assert!(start <= date);
        assert!((date - start).num_days() < 7);
    }

    #[test]
    fn test_render_streaks_and_list() -> Result<()> {
        let store = sample_store()?;
        let out = render_streaks(&store, day("2025-04-21"), Percentage::ZERO)?;
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("longest 2"));
        assert!(out.contains("100%"));

        let out = render_streaks(&store, day("2025-04-21"), Percentage::new_opt(50.).unwrap())?;
        assert_eq!(out.lines().count(), 1);

        let out = render_list(&store)?;
        assert!(out.contains("stopped 2025-04-21"));
        assert!(out.contains("since 2025-04-20"));
        Ok(())
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Walk", 10), "Walk");
        assert_eq!(truncate("Read a very long book", 8), "Read a ~");
    }
}
