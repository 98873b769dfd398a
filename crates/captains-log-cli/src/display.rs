//! Plain-text rendering for terminal output.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use captains_log_core::models::{Boat, MaintenanceTask, Note, TodoList, Trip, UserSettings};
use captains_log_core::BoatOverview;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%b %d, %Y %H:%M").to_string()
}

/// "3h 25m", "45m"
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}

/// Human-readable age of a cache entry
pub fn age_display(minutes: i64) -> String {
    if minutes < 1 {
        // Negative on clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

fn check(done: bool) -> &'static str {
    if done {
        "[x]"
    } else {
        "[ ]"
    }
}

pub fn boat_line(boat: &Boat) -> String {
    format!(
        "{:<24} {:<20} {:<8} {}",
        boat.id,
        truncate_string(&boat.name, 20),
        if boat.enabled { "on" } else { "off" },
        boat.description().unwrap_or_default()
    )
}

pub fn print_boats(boats: &[Boat]) {
    if boats.is_empty() {
        println!("No boats.");
        return;
    }
    println!("{:<24} {:<20} {:<8} {}", "ID", "NAME", "ENABLED", "DESCRIPTION");
    for boat in boats {
        println!("{}", boat_line(boat));
    }
}

pub fn print_boat(boat: &Boat) {
    println!("{} ({})", boat.name, boat.id);
    if let Some(description) = boat.description() {
        println!("  {}", description);
    }
    println!("  Hull ID:   {}", format_optional(boat.hull_id.as_deref(), "-"));
    println!("  Home port: {}", format_optional(boat.home_port.as_deref(), "-"));
    println!("  Enabled:   {}", if boat.enabled { "yes" } else { "no" });
}

pub fn print_boat_overview(overview: &BoatOverview, today: NaiveDate) {
    print_boat(&overview.boat);
    println!();
    println!("Trips:");
    print_trips(&overview.trips);
    println!();
    println!("Maintenance:");
    print_maintenance(&overview.maintenance, today);
}

pub fn trip_line(trip: &Trip) -> String {
    let duration = trip.duration().map(format_duration).unwrap_or_else(|| "-".to_string());
    let distance = trip
        .distance_nm
        .map(|nm| format!("{:.1} nm", nm))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<24} {:<18} {:<10} {:>8} {:>10}  {}",
        trip.id,
        format_timestamp(trip.started_at),
        trip.status,
        duration,
        distance,
        truncate_string(trip.title.as_deref().unwrap_or(""), 30)
    )
}

pub fn print_trips(trips: &[Trip]) {
    if trips.is_empty() {
        println!("  No trips.");
        return;
    }
    for trip in trips {
        println!("  {}", trip_line(trip));
    }
}

pub fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("No notes.");
        return;
    }
    for note in notes {
        let heading = note.title.as_deref().unwrap_or("");
        println!(
            "{:<24} {:<18} {:<12} {}",
            note.id,
            format_timestamp(note.created_at),
            format!("{:?}", note.kind).to_lowercase(),
            heading
        );
        println!("    {}", truncate_string(&note.content, 72));
    }
}

pub fn maintenance_line(task: &MaintenanceTask, today: NaiveDate) -> String {
    let due = task.due_date.map(format_date).unwrap_or_else(|| "-".to_string());
    let flag = if task.is_overdue(today) { " OVERDUE" } else { "" };
    format!("{} {:<24} {:<14} {}{}", check(task.is_complete()), task.id, due, task.title, flag)
}

pub fn print_maintenance(tasks: &[MaintenanceTask], today: NaiveDate) {
    if tasks.is_empty() {
        println!("  No maintenance tasks.");
        return;
    }
    for task in tasks {
        println!("  {}", maintenance_line(task, today));
    }
}

pub fn print_todo_list(list: &TodoList) {
    println!("{} ({} of {} left)", list.title, list.remaining(), list.items.len());
    for item in &list.items {
        println!("  {} {:<24} {}", check(item.done), item.id, item.text);
    }
}

pub fn print_settings(settings: &UserSettings) {
    println!("Units: {:?}", settings.units);
    if settings.toggles.is_empty() {
        println!("No toggles set.");
    }
    for (name, enabled) in &settings.toggles {
        println!("  {:<24} {}", name, if *enabled { "on" } else { "off" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Osprey", 10), "Osprey");
        assert_eq!(truncate_string("Osprey of the North", 10), "Osprey ...");
        assert_eq!(truncate_string("Osprey", 3), "Osp");
        assert_eq!(truncate_string("Ålesund harbour", 5), "Ål...");
    }

    #[test]
    fn test_age_display() {
        assert_eq!(age_display(-5), "just now");
        assert_eq!(age_display(0), "just now");
        assert_eq!(age_display(12), "12m ago");
        assert_eq!(age_display(89), "1h ago");
        assert_eq!(age_display(90), "2h ago");
        assert_eq!(age_display(1440 + 11 * 60), "1d ago");
        assert_eq!(age_display(1440 + 12 * 60), "2d ago");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::minutes(45)), "45m");
        assert_eq!(format_duration(Duration::minutes(205)), "3h 25m");
        assert_eq!(format_duration(Duration::minutes(-3)), "0m");
    }

    #[test]
    fn test_maintenance_line_flags_overdue() {
        let task = MaintenanceTask {
            id: "m1".into(),
            boat_id: "b1".into(),
            title: "Change impeller".into(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            completed_at: None,
        };
        let today = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let line = maintenance_line(&task, today);
        assert!(line.starts_with("[ ]"));
        assert!(line.ends_with("Change impeller OVERDUE"));
        assert!(line.contains("Jun 01, 2026"));
    }
}
