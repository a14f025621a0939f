//!  Storage is organized through [kv::KeyValueStore].
//!  The basic idea is:
//!   - The whole habit collection lives under a single key as a JSON array.
//!   - Every stop action also writes a bare date under `habit-{id}-stopped`, a backup that
//!     [crate::habits::HabitStore::load_stopped_state] can overlay.
//!   - Records are upgraded from every historical shape on load, see [entities::upgrade].

pub mod entities;
pub mod file_store;
pub mod kv;

/// Key holding the serialized habit collection.
pub const HABITS_KEY: &str = "habits";

/// Key holding the backup stop date of a single habit.
pub fn stopped_key(id: i64) -> String {
    format!("habit-{id}-stopped")
}
