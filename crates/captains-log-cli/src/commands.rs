//! Command-line grammar.
//!
//! The same `Command` enum is used for one-shot invocations and for each
//! line typed into `captains-log shell`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use captains_log_core::models::{NewBoat, NoteKind, UnitSystem};

#[derive(Debug, Parser)]
#[command(name = "captains-log", version, about = "Boats, trips, notes and maintenance from the command line")]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Server base URL, e.g. http://localhost:3000/api
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// One line of interactive input.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and save the session
    Login {
        /// Defaults to the last email used
        email: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show the logged-in user
    Whoami,
    #[command(subcommand)]
    Boats(BoatCommand),
    #[command(subcommand)]
    Trips(TripCommand),
    #[command(subcommand)]
    Notes(NoteCommand),
    #[command(subcommand)]
    #[command(alias = "mx")]
    Maintenance(MaintenanceCommand),
    #[command(subcommand)]
    Todos(TodoCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// List cached entries and their age
    Cache,
    /// Read commands from stdin, sharing one cache
    Shell,
}

#[derive(Debug, Args)]
pub struct BoatFields {
    pub name: String,
    #[arg(long)]
    pub make: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long)]
    pub hull_id: Option<String>,
    #[arg(long)]
    pub home_port: Option<String>,
}

impl From<BoatFields> for NewBoat {
    fn from(fields: BoatFields) -> Self {
        NewBoat {
            name: fields.name,
            make: fields.make,
            model: fields.model,
            year: fields.year,
            hull_id: fields.hull_id,
            home_port: fields.home_port,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum BoatCommand {
    List,
    /// Boat details with its trips and maintenance
    Show { id: String },
    Toggle { id: String },
    Enable { id: String },
    Disable { id: String },
    Add(BoatFields),
    Edit {
        id: String,
        #[command(flatten)]
        fields: BoatFields,
    },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum TripCommand {
    List { boat_id: String },
    Show { id: String },
    Delete { boat_id: String, trip_id: String },
}

#[derive(Debug, Subcommand)]
pub enum NoteCommand {
    List {
        #[arg(long)]
        boat: Option<String>,
    },
    Add {
        content: String,
        #[arg(long)]
        boat: Option<String>,
        #[arg(long)]
        trip: Option<String>,
        #[arg(long, default_value = "general")]
        kind: NoteKind,
        #[arg(long)]
        title: Option<String>,
    },
    Edit {
        id: String,
        content: String,
        #[arg(long)]
        boat: Option<String>,
        #[arg(long, default_value = "general")]
        kind: NoteKind,
        #[arg(long)]
        title: Option<String>,
    },
    Delete {
        id: String,
        #[arg(long)]
        boat: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum MaintenanceCommand {
    List {
        boat_id: String,
        /// Only open tasks past their due date
        #[arg(long)]
        overdue: bool,
    },
    Add {
        boat_id: String,
        title: String,
        /// YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },
    Complete { boat_id: String, id: String },
    Delete { boat_id: String, id: String },
}

#[derive(Debug, Subcommand)]
pub enum TodoCommand {
    Show { list_id: String },
    Add { list_id: String, text: String },
    Done { list_id: String, item_id: String },
    Undone { list_id: String, item_id: String },
    Toggle { list_id: String, item_id: String },
    Remove { list_id: String, item_id: String },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Toggle { name: String },
    /// nautical, metric or imperial
    Units { units: UnitSystem },
}
