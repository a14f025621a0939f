//! The habit state manager. [HabitStore] owns the ordered habit collection and writes the whole
//! collection through a [KeyValueStore] after every mutation.
//!
//! Lookups by an unknown id are silent no-ops, but mutating calls still persist.

pub mod habit;
pub mod streak;
pub mod visibility;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use habit::{Habit, HabitId};
use tracing::{debug, info, instrument, warn};

use crate::{
    storage::{
        entities::{upgrade, HabitEntity, RawHabitRecord},
        kv::KeyValueStore,
        stopped_key, HABITS_KEY,
    },
    utils::{
        clock::Clock,
        percentage::Percentage,
        time::{date_to_key, parse_date_key},
    },
};

pub struct HabitStore<S: KeyValueStore> {
    storage: S,
    clock: Box<dyn Clock>,
    habits: Vec<Habit>,
    selected_date: NaiveDate,
    read_failed: bool,
}

impl<S: KeyValueStore> HabitStore<S> {
    /// Creates an empty store. Nothing is read from `storage` until [HabitStore::load].
    pub fn new(storage: S, clock: Box<dyn Clock>) -> Self {
        let selected_date = clock.today();
        Self {
            storage,
            clock,
            habits: Vec::new(),
            selected_date,
            read_failed: false,
        }
    }

    /// Starts a session: loads the collection and overlays backup stop dates.
    pub fn open(storage: S, clock: Box<dyn Clock>) -> Result<Self> {
        let mut store = Self::new(storage, clock);
        store.load()?;
        store.load_stopped_state();
        Ok(store)
    }

    /// Ends a session with a final write and hands the storage back. The write is skipped when
    /// the session started from an unreadable store and nothing was changed since.
    pub fn close(mut self) -> Result<S> {
        if self.read_failed {
            warn!("Stored habits were never read, skipping final write");
        } else {
            self.save()?;
        }
        Ok(self.storage)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn habit(&self, id: HabitId) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id() == id)
    }

    fn habit_mut(&mut self, id: HabitId) -> Option<&mut Habit> {
        let habit = self.habits.iter_mut().find(|h| h.id() == id);
        if habit.is_none() {
            debug!("No habit with id {id}");
        }
        habit
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
    }

    /// Appends a new active habit created today. Duplicate names are allowed.
    #[instrument(skip(self, name))]
    pub fn add(&mut self, name: impl Into<String>) -> Result<HabitId> {
        let name = name.into();
        if name.trim().is_empty() {
            bail!("Habit name can't be empty");
        }

        let id = self.next_id();
        let habit = Habit::new(id, name, self.clock.today());
        info!("Adding habit {id} {:?}", habit.name());
        self.habits.push(habit);
        self.save()?;
        Ok(id)
    }

    /// Ids are creation timestamps, bumped past the newest id if the clock didn't move.
    fn next_id(&self) -> HabitId {
        let now = self.clock.time().timestamp_millis();
        match self.habits.iter().map(Habit::id).max() {
            Some(last) if last >= now => last + 1,
            _ => now,
        }
    }

    #[instrument(skip(self, name))]
    pub fn rename(&mut self, id: HabitId, name: impl Into<String>) -> Result<()> {
        if let Some(habit) = self.habit_mut(id) {
            habit.rename(name.into());
        }
        self.save()
    }

    /// Marks the habit stopped on `date`, the last day it is visible. The date is also written
    /// under its own backup key.
    ///
    /// `date` isn't checked against the creation date.
    #[instrument(skip(self))]
    pub fn stop(&mut self, id: HabitId, date: NaiveDate) -> Result<()> {
        if let Some(habit) = self.habit_mut(id) {
            if date < habit.creation_date() {
                warn!("Stopping habit {id} on {date} before its creation date");
            }
            habit.stop(date);
            info!("Stopped habit {id} on {date}");
        }
        self.save()?;
        self.storage
            .set(&stopped_key(id), date_to_key(date).as_bytes())
    }

    /// Deletes the habit for good.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: HabitId) -> Result<()> {
        let before = self.habits.len();
        self.habits.retain(|h| h.id() != id);
        if self.habits.len() != before {
            info!("Removed habit {id}");
        }
        self.save()
    }

    pub fn save(&mut self) -> Result<()> {
        self.read_failed = false;
        let entities = self.habits.iter().map(HabitEntity::from).collect::<Vec<_>>();
        let blob = serde_json::to_vec(&entities)?;
        self.storage.set(HABITS_KEY, &blob)
    }

    /// Replaces the collection with the stored one, upgrading old record shapes, and writes the
    /// upgraded blob back. Missing or invalid data means there are no habits yet.
    ///
    /// If the store can't be read at all the session starts empty, but nothing is written back
    /// so the stored blob survives.
    pub fn load(&mut self) -> Result<()> {
        let blob = match self.storage.get(HABITS_KEY) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to read stored habits, starting empty: {e:?}");
                self.habits = vec![];
                self.read_failed = true;
                return Ok(());
            }
        };

        self.habits = blob
            .map(|v| parse_collection(&v, self.selected_date))
            .unwrap_or_default();
        debug!("Loaded {} habits", self.habits.len());
        self.save()
    }

    /// Fills in stop dates from the per-habit backup keys for habits that have none. The stored
    /// collection wins whenever it has a stop date. Nothing is persisted.
    pub fn load_stopped_state(&mut self) {
        for habit in self.habits.iter_mut().filter(|h| h.stopped_date().is_none()) {
            let key = stopped_key(habit.id());
            let backup = match self.storage.get(&key) {
                Ok(Some(v)) => v,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read {key}: {e:?}");
                    continue;
                }
            };

            match std::str::from_utf8(&backup)
                .ok()
                .and_then(|v| parse_date_key(v).ok())
            {
                Some(date) => {
                    info!("Restoring stop date {date} of habit {} from backup", habit.id());
                    habit.stop(date);
                }
                None => warn!("Backup {key} doesn't hold a date"),
            }
        }
    }

    /// Makes the backup overlay durable.
    pub fn repair(&mut self) -> Result<()> {
        self.load_stopped_state();
        self.save()
    }

    pub fn habits_for_date(&self, date: NaiveDate) -> Vec<&Habit> {
        visibility::habits_for_date(&self.habits, date).collect()
    }

    pub fn is_completed(&self, id: HabitId, date: NaiveDate) -> bool {
        self.habit(id).is_some_and(|h| h.is_completed(date))
    }

    /// Adds `date` to or removes it from the completed set. Always persists, even when `id`
    /// doesn't exist.
    #[instrument(skip(self))]
    pub fn set_completion(&mut self, id: HabitId, date: NaiveDate, completed: bool) -> Result<()> {
        if let Some(habit) = self.habit_mut(id) {
            habit.set_completed(date, completed);
        }
        self.save()
    }

    pub fn set_completion_for_selected(&mut self, id: HabitId, completed: bool) -> Result<()> {
        self.set_completion(id, self.selected_date, completed)
    }

    pub fn current_streak(&self, id: HabitId, as_of: NaiveDate) -> u32 {
        self.habit(id)
            .map_or(0, |h| streak::current_streak(h, as_of))
    }

    pub fn longest_streak(&self, id: HabitId) -> u32 {
        self.habit(id).map_or(0, streak::longest_streak)
    }

    pub fn is_longest_streak_now(&self, id: HabitId, as_of: NaiveDate) -> bool {
        self.habit(id)
            .is_some_and(|h| streak::is_longest_streak_now(h, as_of))
    }

    pub fn completion_rate(&self, id: HabitId, as_of: NaiveDate) -> Option<Percentage> {
        self.habit(id)
            .and_then(|h| streak::completion_rate(h, as_of))
    }
}

/// Any record that can't be read is skipped, a blob that isn't an array is treated as empty.
fn parse_collection(blob: &[u8], selected_date: NaiveDate) -> Vec<Habit> {
    let records = match serde_json::from_slice::<Vec<serde_json::Value>>(blob) {
        Ok(v) => v,
        Err(e) => {
            warn!("Stored habits are not a valid collection: {e}");
            return vec![];
        }
    };

    records
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<RawHabitRecord>(v.clone()) {
            Ok(raw) => Some(upgrade(raw, selected_date)),
            Err(e) => {
                // ignore illegal values, the rest of the collection is still usable
                warn!("Skipping illegal habit record {v}: {e}");
                None
            }
        })
        .collect()
}
