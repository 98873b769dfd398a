//! Application state and command execution.
//!
//! `App` owns the configuration, the saved session and the `Logbook`. In
//! shell mode one `App` runs every line, so the query cache is shared across
//! commands and mutations show up in later reads.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use captains_log_core::auth::SessionData;
use captains_log_core::models::{NewMaintenanceTask, NewNote};
use captains_log_core::{ApiClient, ApiError, Config, Logbook, QueryCache, Session};

use crate::commands::{
    BoatCommand, Command, MaintenanceCommand, NoteCommand, SettingsCommand, ShellLine, TodoCommand, TripCommand,
};
use crate::display;

/// Environment variable holding a bearer token, used instead of the saved session
const ENV_TOKEN: &str = "CAPTAINS_LOG_TOKEN";

/// Environment variable holding the login password
const ENV_PASSWORD: &str = "CAPTAINS_LOG_PASSWORD";

const SHELL_PROMPT: &str = "log> ";

pub struct App {
    config: Config,
    session: Session,
    logbook: Logbook,
    json: bool,
}

impl App {
    pub fn new(api_url: Option<String>, json: bool) -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        if let Some(url) = api_url {
            config.api_base_url = url;
        }
        debug!(api_base_url = %config.api_base_url, "Config loaded");

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        let mut session = Session::new(cache_dir);
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to load session");
        }

        let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout())
            .context("Failed to create API client")?;
        match std::env::var(ENV_TOKEN).ok().filter(|t| !t.is_empty()) {
            Some(token) => {
                debug!("Using token from environment");
                api.set_token(token);
            }
            None => {
                if let Some(token) = session.token() {
                    api.set_token(token);
                }
            }
        }

        let logbook = Logbook::new(api, Arc::new(QueryCache::new()), &config);

        Ok(Self {
            config,
            session,
            logbook,
            json,
        })
    }

    /// Run one command. A rejected token also drops the saved session.
    pub async fn run(&mut self, command: Command) -> Result<()> {
        let result = self.execute(command).await;
        if let Err(e) = &result {
            if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_unauthorized) && self.session.data.is_some() {
                warn!("Session rejected by server");
                self.session.clear().context("Failed to clear session")?;
                eprintln!("Session expired. Run `captains-log login` to sign in again.");
            }
        }
        result
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email } => self.login(email).await,
            Command::Logout => self.logout(),
            Command::Whoami => self.whoami().await,
            Command::Boats(cmd) => self.boats(cmd).await,
            Command::Trips(cmd) => self.trips(cmd).await,
            Command::Notes(cmd) => self.notes(cmd).await,
            Command::Maintenance(cmd) => self.maintenance(cmd).await,
            Command::Todos(cmd) => self.todos(cmd).await,
            Command::Settings(cmd) => self.settings(cmd).await,
            Command::Cache => {
                self.print_cache();
                Ok(())
            }
            Command::Shell => self.shell().await,
        }
    }

    fn emit<T: Serialize>(&self, value: &T, render: impl FnOnce(&T)) {
        if self.json {
            match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!(error = %e, "Failed to serialize output"),
            }
        } else {
            render(value);
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    fn prompt_email() -> Result<String> {
        print!("Email: ");
        std::io::stdout().flush()?;
        let mut email = String::new();
        std::io::stdin().read_line(&mut email)?;
        Ok(email.trim().to_string())
    }

    fn prompt_password() -> Result<String> {
        let password = rpassword::prompt_password("Password: ")?;
        Ok(password)
    }

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => Self::prompt_email()?,
        };
        if email.is_empty() {
            anyhow::bail!("Email required");
        }
        let password = match std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty()) {
            Some(password) => password,
            None => Self::prompt_password()?,
        };

        let login = self.logbook.login(&email, &password).await?;

        self.session
            .update(SessionData::new(login.token, login.user.id.clone(), login.user.email.clone()));
        self.session.save()?;

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        info!(user_id = %login.user.id, "Login successful");
        println!("Logged in as {}", login.user.email);
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        let user = self.logbook.api().current_user().await?;
        let signed_in = self
            .session
            .data
            .as_ref()
            .map(|data| display::age_display(data.age().num_minutes()));
        self.emit(&user, |u| match &signed_in {
            Some(age) => println!("{} ({}), signed in {}", u.email, u.id, age),
            None => println!("{} ({})", u.email, u.id),
        });
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        let email = self.session.email().map(str::to_string);
        self.session.clear()?;
        self.logbook.api().tokens().clear();
        self.logbook.invalidate_all();
        match email {
            Some(email) => println!("Logged out {}.", email),
            None => println!("Logged out."),
        }
        Ok(())
    }

    // =========================================================================
    // Resources
    // =========================================================================

    async fn boats(&self, cmd: BoatCommand) -> Result<()> {
        let logbook = &self.logbook;
        match cmd {
            BoatCommand::List => {
                let boats = logbook.load_boats().await?;
                self.emit(&boats, |b| display::print_boats(b));
            }
            BoatCommand::Show { id } => {
                let overview = logbook.load_boat_overview(&id).await?;
                let today = Utc::now().date_naive();
                self.emit(&overview, |o| display::print_boat_overview(o, today));
            }
            BoatCommand::Toggle { id } => {
                let boat = logbook.toggle_boat_enabled(&id).await?;
                self.emit(&boat, |b| println!("{}", display::boat_line(b)));
            }
            BoatCommand::Enable { id } => {
                let boat = logbook.set_boat_enabled(&id, true).await?;
                self.emit(&boat, |b| println!("{}", display::boat_line(b)));
            }
            BoatCommand::Disable { id } => {
                let boat = logbook.set_boat_enabled(&id, false).await?;
                self.emit(&boat, |b| println!("{}", display::boat_line(b)));
            }
            BoatCommand::Add(fields) => {
                let boat = logbook.create_boat(&fields.into()).await?;
                self.emit(&boat, |b| println!("Created {}", display::boat_line(b)));
            }
            BoatCommand::Edit { id, fields } => {
                let boat = logbook.update_boat(&id, &fields.into()).await?;
                self.emit(&boat, |b| display::print_boat(b));
            }
            BoatCommand::Delete { id } => {
                logbook.delete_boat(&id).await?;
                println!("Deleted boat {}", id);
            }
        }
        Ok(())
    }

    async fn trips(&self, cmd: TripCommand) -> Result<()> {
        match cmd {
            TripCommand::List { boat_id } => {
                let trips = self.logbook.load_trips(&boat_id).await?;
                let trips = captains_log_core::logbook::trips::newest_first(&trips);
                self.emit(&trips, |t| display::print_trips(t));
            }
            TripCommand::Show { id } => {
                let trip = self.logbook.load_trip(&id).await?;
                self.emit(&trip, |t| {
                    println!("{}", display::trip_line(t));
                    if !t.crew.is_empty() {
                        println!("  Crew: {}", t.crew.join(", "));
                    }
                });
            }
            TripCommand::Delete { boat_id, trip_id } => {
                self.logbook.delete_trip(&boat_id, &trip_id).await?;
                println!("Deleted trip {}", trip_id);
            }
        }
        Ok(())
    }

    async fn notes(&self, cmd: NoteCommand) -> Result<()> {
        match cmd {
            NoteCommand::List { boat } => {
                let notes = self.logbook.load_notes(boat.as_deref()).await?;
                self.emit(&notes, |n| display::print_notes(n));
            }
            NoteCommand::Add {
                content,
                boat,
                trip,
                kind,
                title,
            } => {
                let fields = NewNote {
                    boat_id: boat,
                    trip_id: trip,
                    kind,
                    title,
                    content,
                };
                let note = self.logbook.add_note(&fields).await?;
                self.emit(&note, |n| println!("Added note {}", n.id));
            }
            NoteCommand::Edit {
                id,
                content,
                boat,
                kind,
                title,
            } => {
                let fields = NewNote {
                    boat_id: boat,
                    trip_id: None,
                    kind,
                    title,
                    content,
                };
                let note = self.logbook.update_note(&id, &fields).await?;
                self.emit(&note, |n| println!("Updated note {}", n.id));
            }
            NoteCommand::Delete { id, boat } => {
                self.logbook.delete_note(boat.as_deref(), &id).await?;
                println!("Deleted note {}", id);
            }
        }
        Ok(())
    }

    async fn maintenance(&self, cmd: MaintenanceCommand) -> Result<()> {
        let today = Utc::now().date_naive();
        match cmd {
            MaintenanceCommand::List { boat_id, overdue } => {
                let tasks = self.logbook.load_maintenance(&boat_id).await?;
                let tasks = if overdue {
                    captains_log_core::logbook::maintenance::overdue(&tasks, today)
                        .into_iter()
                        .cloned()
                        .collect()
                } else {
                    tasks
                };
                self.emit(&tasks, |t| display::print_maintenance(t, today));
            }
            MaintenanceCommand::Add {
                boat_id,
                title,
                due,
                description,
            } => {
                let fields = NewMaintenanceTask {
                    boat_id,
                    title,
                    description,
                    due_date: due,
                };
                let task = self.logbook.add_maintenance(&fields).await?;
                self.emit(&task, |t| println!("{}", display::maintenance_line(t, today)));
            }
            MaintenanceCommand::Complete { boat_id, id } => {
                let task = self.logbook.complete_maintenance(&boat_id, &id).await?;
                self.emit(&task, |t| println!("{}", display::maintenance_line(t, today)));
            }
            MaintenanceCommand::Delete { boat_id, id } => {
                self.logbook.delete_maintenance(&boat_id, &id).await?;
                println!("Deleted task {}", id);
            }
        }
        Ok(())
    }

    async fn todos(&self, cmd: TodoCommand) -> Result<()> {
        let logbook = &self.logbook;
        let list = match cmd {
            TodoCommand::Show { list_id } => logbook.load_todo_list(&list_id).await?,
            TodoCommand::Add { list_id, text } => logbook.add_todo_item(&list_id, &text).await?,
            TodoCommand::Done { list_id, item_id } => logbook.set_todo_item_done(&list_id, &item_id, true).await?,
            TodoCommand::Undone { list_id, item_id } => logbook.set_todo_item_done(&list_id, &item_id, false).await?,
            TodoCommand::Toggle { list_id, item_id } => logbook.toggle_todo_item(&list_id, &item_id).await?,
            TodoCommand::Remove { list_id, item_id } => logbook.remove_todo_item(&list_id, &item_id).await?,
        };
        self.emit(&list, |l| display::print_todo_list(l));
        Ok(())
    }

    async fn settings(&self, cmd: SettingsCommand) -> Result<()> {
        let settings = match cmd {
            SettingsCommand::Show => self.logbook.load_settings().await?,
            SettingsCommand::Toggle { name } => self.logbook.toggle_setting(&name).await?,
            SettingsCommand::Units { units } => self.logbook.set_units(units).await?,
        };
        self.emit(&settings, |s| display::print_settings(s));
        Ok(())
    }

    fn print_cache(&self) {
        let cache = self.logbook.cache();
        let keys = cache.keys();
        if keys.is_empty() {
            println!("Cache is empty.");
            return;
        }
        let now = Utc::now();
        for key in keys {
            let age = cache
                .updated_at(&key)
                .map(|at| display::age_display((now - at).num_minutes()))
                .unwrap_or_default();
            let state = if cache.is_stale(&key).unwrap_or(false) { "stale" } else { "fresh" };
            println!("{:<40} {:<6} {}", key.to_string(), state, age);
        }
    }

    // =========================================================================
    // Interactive shell
    // =========================================================================

    /// Log cache traffic at debug level while the shell runs.
    fn spawn_cache_logger(&self) -> tokio::task::JoinHandle<()> {
        let mut events = self.logbook.cache().subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => debug!(key = %event.key, kind = ?event.kind, "Cache event"),
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "Cache event logger lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn shell(&mut self) -> Result<()> {
        let logger = self.spawn_cache_logger();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("Type a command (e.g. `boats list`), `help`, or `exit`.");
        loop {
            print!("{}", SHELL_PROMPT);
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            match line {
                "" => continue,
                "exit" | "quit" => break,
                _ => {}
            }

            let words = split_words(line);
            let command = match ShellLine::try_parse_from(&words) {
                Ok(parsed) => parsed.command,
                Err(e) => {
                    let _ = e.print();
                    continue;
                }
            };
            if matches!(command, Command::Shell) {
                println!("Already in the shell.");
                continue;
            }
            if let Err(e) = Box::pin(self.run(command)).await {
                eprintln!("Error: {:#}", e);
            }
        }

        logger.abort();
        Ok(())
    }
}

/// Split a shell line on whitespace, keeping double-quoted runs together.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_word = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }
    if has_word {
        words.push(current);
    }
    words
}
