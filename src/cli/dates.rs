use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::utils::time::parse_date_key;

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Resolves a day argument. Accepts `YYYY-MM-DD` as well as anything [chrono_english]
/// understands, like "yesterday" or "3 days ago". Missing value means today.
pub fn parse_day(value: Option<&str>, now: DateTime<Local>, style: DateStyle) -> Result<NaiveDate> {
    let Some(value) = value else {
        return Ok(now.date_naive());
    };

    if let Ok(date) = parse_date_key(value) {
        return Ok(date);
    }

    match parse_date_string(value, now, style.into()) {
        Ok(v) => Ok(v.with_timezone(&Local).date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {value:?}: {e}"),
            )
            .into()),
    }
}

/// Moves a day by `offset` days. Used for previous/next day navigation.
pub fn shift_day(date: NaiveDate, offset: i64) -> NaiveDate {
    date + Duration::days(offset)
}
