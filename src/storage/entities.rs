use std::{cell::Cell, collections::BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    habits::habit::{Habit, HabitId, StreakCache},
    utils::time::{millis_to_date, parse_date_key},
};

/// The struct used for storing a habit inside the `habits` blob. Field names follow the
/// persisted layout, so blobs written by older versions stay readable.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HabitEntity {
    pub id: HabitId,
    pub name: String,
    pub date: NaiveDate,
    pub stopped_date: Option<NaiveDate>,
    pub completed_dates: Vec<NaiveDate>,
    pub active: bool,
    pub longest_streak: u32,
    pub last_streak_calculation: Option<usize>,
}

impl From<&Habit> for HabitEntity {
    fn from(habit: &Habit) -> Self {
        let cache = habit.streak_cache();
        HabitEntity {
            id: habit.id(),
            name: habit.name().to_owned(),
            date: habit.creation_date(),
            stopped_date: habit.stopped_date(),
            completed_dates: habit.completed_dates().iter().copied().collect(),
            active: habit.is_active(),
            longest_streak: cache.longest,
            last_streak_calculation: cache.computed_at,
        }
    }
}

/// Any record shape that was ever written under the `habits` key. Everything except `id` and
/// `name` may be missing, and dates are kept as raw strings until [upgrade] validates them.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawHabitRecord {
    pub id: HabitId,
    pub name: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub stopped_date: Option<String>,
    #[serde(default)]
    pub completed_dates: Option<Vec<String>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub longest_streak: Option<u32>,
    #[serde(default)]
    pub last_streak_calculation: Option<usize>,
    /// Single completion flag from before per-date tracking existed.
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Converts a stored record of any historical shape into the current [Habit].
///
/// `selected_date` is the day a legacy `completed: true` flag is attributed to, and the creation
/// date of last resort.
pub fn upgrade(raw: RawHabitRecord, selected_date: NaiveDate) -> Habit {
    let id = raw.id;

    let creation_date = raw
        .date
        .as_deref()
        .and_then(|v| parse_stored_date(id, "date", v))
        .or_else(|| millis_to_date(id))
        .unwrap_or(selected_date);

    let stopped_date = raw
        .stopped_date
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| parse_stored_date(id, "stoppedDate", v));

    let mut completed_dates = BTreeSet::new();
    match raw.completed_dates {
        Some(dates) => completed_dates.extend(
            dates
                .iter()
                .filter_map(|v| parse_stored_date(id, "completedDates", v)),
        ),
        None => {
            if raw.completed == Some(true) {
                completed_dates.insert(selected_date);
            }
        }
    }

    let streak_cache = match (raw.longest_streak, raw.last_streak_calculation) {
        (Some(longest), Some(count)) => StreakCache {
            longest,
            computed_at: Some(count),
        },
        (longest, _) => StreakCache {
            longest: longest.unwrap_or(0),
            computed_at: None,
        },
    };

    Habit {
        id,
        name: raw.name,
        creation_date,
        active: raw.active.unwrap_or(stopped_date.is_none()),
        stopped_date,
        completed_dates,
        streak_cache: Cell::new(streak_cache),
    }
}

/// Dates were always written as `YYYY-MM-DD`, but a full ISO timestamp is accepted as well.
fn parse_stored_date(id: HabitId, field: &str, value: &str) -> Option<NaiveDate> {
    let day = value.split('T').next().unwrap_or(value);
    match parse_date_key(day) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Habit {id} has illegal {field} value {value:?}: {e}");
            None
        }
    }
}
