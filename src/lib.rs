//! Simple to use terminal habit tracker. Habits are added, marked done per day, and stopped
//! while keeping their history. Streaks are derived from the completion history.
//!
//! [habits::HabitStore] is the core; everything is persisted through a
//! [storage::kv::KeyValueStore].

pub mod cli;
pub mod habits;
pub mod storage;
pub mod utils;
