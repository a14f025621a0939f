pub mod confirm;
pub mod dates;
pub mod views;

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use confirm::confirm;
use dates::{parse_day, shift_day, DateStyle};
use tracing::level_filters::LevelFilter;

use crate::{
    habits::{habit::HabitId, HabitStore},
    storage::{file_store::FileStore, kv::KeyValueStore},
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
        percentage::Percentage,
    },
};

#[derive(Parser, Debug)]
#[command(name = "habits", version, long_about = None)]
#[command(about = "Track daily habits and streaks from the terminal", long_about = None)]
pub(crate) struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value_t = DateStyle::Uk,
        help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
    )]
    date_style: DateStyle,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start tracking a new habit from today")]
    Add { name: String },
    #[command(about = "Change the name of a habit")]
    Rename { id: HabitId, name: String },
    #[command(about = "Stop tracking a habit. Its history stays visible up to the stop date")]
    Stop {
        id: HabitId,
        #[arg(long = "on", help = "Last day of the habit. Defaults to today")]
        date: Option<String>,
        #[arg(short, long, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Delete a habit together with its history")]
    Remove {
        id: HabitId,
        #[arg(short, long, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Mark a habit as done")]
    Done {
        id: HabitId,
        #[arg(long = "on", help = "Examples are \"yesterday\", \"2025-04-20\", \"15/03/2025\"")]
        date: Option<String>,
    },
    #[command(about = "Unmark a habit")]
    Undo {
        id: HabitId,
        #[arg(long = "on", help = "Examples are \"yesterday\", \"2025-04-20\", \"15/03/2025\"")]
        date: Option<String>,
    },
    #[command(about = "Show habits for a day")]
    Day {
        date: Option<String>,
        #[arg(long, help = "Show the day before")]
        prev: bool,
        #[arg(long, conflicts_with = "prev", help = "Show the day after")]
        next: bool,
    },
    #[command(about = "Show a week grid of completions")]
    Week { date: Option<String> },
    #[command(about = "Show streaks and completion rates")]
    Streaks {
        date: Option<String>,
        #[arg(
            short = 'p',
            long = "min-rate",
            help = "Only show habits completed at least this often",
            default_value_t = Percentage::ZERO
        )]
        min_rate: Percentage,
    },
    #[command(about = "List every habit, including stopped ones")]
    List {},
    #[command(about = "Restore stop dates from backups and save them")]
    Repair {},
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    let storage = FileStore::new(app_dir.join("store"))?;
    let mut store = HabitStore::open(storage, Box::new(DefaultClock))?;
    process_command(&mut store, args.commands, args.date_style)?;
    store.close()?;
    Ok(())
}

fn process_command<S: KeyValueStore>(
    store: &mut HabitStore<S>,
    command: Commands,
    style: DateStyle,
) -> Result<()> {
    let now = Local::now();
    let day = |value: Option<String>| parse_day(value.as_deref(), now, style);

    match command {
        Commands::Add { name } => {
            let id = store.add(name)?;
            println!("Added habit {id}");
        }
        Commands::Rename { id, name } => {
            require_habit(store, id)?;
            store.rename(id, name)?;
        }
        Commands::Stop { id, date, yes } => {
            let name = require_habit(store, id)?;
            let date = day(date)?;
            if yes || confirm(&format!("Stop tracking {name:?} after {date}?"))? {
                store.stop(id, date)?;
            }
        }
        Commands::Remove { id, yes } => {
            let name = require_habit(store, id)?;
            if yes || confirm(&format!("Remove {name:?} and all of its history?"))? {
                store.remove(id)?;
            }
        }
        Commands::Done { id, date } => {
            require_habit(store, id)?;
            store.select_date(day(date)?);
            store.set_completion_for_selected(id, true)?;
        }
        Commands::Undo { id, date } => {
            require_habit(store, id)?;
            store.select_date(day(date)?);
            store.set_completion_for_selected(id, false)?;
        }
        Commands::Day { date, prev, next } => {
            let mut date = day(date)?;
            if prev {
                date = shift_day(date, -1);
            } else if next {
                date = shift_day(date, 1);
            }
            print!("{}", views::render_day(store, date)?);
        }
        Commands::Week { date } => print!("{}", views::render_week(store, day(date)?)?),
        Commands::Streaks { date, min_rate } => {
            print!("{}", views::render_streaks(store, day(date)?, min_rate)?)
        }
        Commands::List {} => print!("{}", views::render_list(store)?),
        Commands::Repair {} => store.repair()?,
    }
    Ok(())
}

/// The store silently ignores unknown ids, the terminal user should hear about it though.
fn require_habit<S: KeyValueStore>(store: &HabitStore<S>, id: HabitId) -> Result<String> {
    use clap::CommandFactory;

    store
        .habit(id)
        .map(|h| h.name().to_owned())
        .ok_or_else(|| {
            Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("There is no habit with id {id}"),
                )
                .into()
        })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Local, NaiveDate};
    use clap::Parser;

    use crate::{
        habits::HabitStore,
        storage::kv::MemoryStore,
        utils::clock::FixedClock,
    };

    use super::{process_command, Args, Commands, DateStyle};

    fn store() -> HabitStore<MemoryStore> {
        HabitStore::new(
            MemoryStore::new(),
            Box::new(FixedClock::at_day(Local::now().date_naive())),
        )
    }

    fn command(args: &[&str]) -> Commands {
        Args::parse_from(std::iter::once("habits").chain(args.iter().copied())).commands
    }

    fn run(store: &mut HabitStore<MemoryStore>, args: &[&str]) -> Result<()> {
        process_command(store, command(args), DateStyle::Uk)
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "habits",
            "--date-style",
            "us",
            "done",
            "12",
            "--on",
            "yesterday",
        ]);
        assert!(matches!(args.date_style, DateStyle::Us));
        assert!(matches!(
            args.commands,
            Commands::Done { id: 12, date: Some(ref d) } if d == "yesterday"
        ));
        assert!(Args::try_parse_from(["habits", "day", "--prev", "--next"]).is_err());
    }

    #[test]
    fn test_done_and_undo() -> Result<()> {
        let mut store = store();
        let id = store.add("Read")?;
        let today = Local::now().date_naive();

        run(&mut store, &["done", &id.to_string(), "--on", "2025-04-20"])?;
        assert!(store.is_completed(id, "2025-04-20".parse::<NaiveDate>()?));
        assert_eq!(store.selected_date(), "2025-04-20".parse::<NaiveDate>()?);

        run(&mut store, &["done", &id.to_string()])?;
        assert!(store.is_completed(id, today));

        run(&mut store, &["undo", &id.to_string()])?;
        assert!(!store.is_completed(id, today));
        Ok(())
    }

    #[test]
    fn test_destructive_commands_with_yes() -> Result<()> {
        let mut store = store();
        let stopped = store.add("Walk")?;
        let removed = store.add("Read")?;

        run(&mut store, &["stop", &stopped.to_string(), "--on", "2030-01-01", "--yes"])?;
        assert_eq!(
            store.habit(stopped).unwrap().stopped_date(),
            Some("2030-01-01".parse::<NaiveDate>()?)
        );

        run(&mut store, &["remove", &removed.to_string(), "-y"])?;
        assert!(store.habit(removed).is_none());
        Ok(())
    }

    #[test]
    fn test_unknown_id_is_reported() {
        let mut store = store();
        assert!(run(&mut store, &["done", "5"]).is_err());
        assert!(run(&mut store, &["rename", "5", "New"]).is_err());
    }
}
