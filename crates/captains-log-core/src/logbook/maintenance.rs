use chrono::{DateTime, NaiveDate, Utc};

use crate::api::{ApiError, ApiResult};
use crate::cache::MaintenanceList;
use crate::models::{MaintenanceTask, NewMaintenanceTask};

use super::{pending_id, remove_by_id, update_by_id, Logbook};

/// Mark task `id` complete as of `at`. Completing twice is refused locally;
/// a task missing from the cached list is left for the server to judge.
pub fn mark_complete(tasks: &[MaintenanceTask], id: &str, at: DateTime<Utc>) -> ApiResult<Vec<MaintenanceTask>> {
    match tasks.iter().find(|t| t.id == id) {
        None => Ok(tasks.to_vec()),
        Some(task) if task.is_complete() => Err(ApiError::local(format!("Task \"{}\" is already complete", task.title))),
        Some(_) => Ok(update_by_id(tasks, id, |task| task.completed_at = Some(at)).unwrap_or_default()),
    }
}

pub fn placeholder_task(fields: &NewMaintenanceTask) -> MaintenanceTask {
    MaintenanceTask {
        id: pending_id(),
        boat_id: fields.boat_id.clone(),
        title: fields.title.clone(),
        description: fields.description.clone(),
        due_date: fields.due_date,
        completed_at: None,
    }
}

/// Open tasks past their due date.
pub fn overdue(tasks: &[MaintenanceTask], today: NaiveDate) -> Vec<&MaintenanceTask> {
    tasks.iter().filter(|t| t.is_overdue(today)).collect()
}

impl Logbook {
    pub async fn load_maintenance(&self, boat_id: &str) -> ApiResult<Vec<MaintenanceTask>> {
        self.loader
            .load(&MaintenanceList(boat_id.to_string()), || {
                self.retry.run(move || self.api.list_maintenance(boat_id))
            })
            .await
    }

    pub async fn add_maintenance(&self, fields: &NewMaintenanceTask) -> ApiResult<MaintenanceTask> {
        if fields.title.trim().is_empty() {
            return Err(ApiError::local("Task title is required"));
        }
        let placeholder = placeholder_task(fields);
        self.coordinator
            .mutate(
                &MaintenanceList(fields.boat_id.clone()),
                |tasks| {
                    let mut next = tasks.clone();
                    next.push(placeholder);
                    Ok(next)
                },
                || self.api.create_maintenance(fields),
            )
            .await
    }

    pub async fn complete_maintenance(&self, boat_id: &str, id: &str) -> ApiResult<MaintenanceTask> {
        let now = Utc::now();
        self.coordinator
            .mutate(
                &MaintenanceList(boat_id.to_string()),
                |tasks| mark_complete(tasks, id, now),
                || self.api.complete_maintenance(id),
            )
            .await
    }

    pub async fn delete_maintenance(&self, boat_id: &str, id: &str) -> ApiResult<()> {
        self.coordinator
            .mutate(
                &MaintenanceList(boat_id.to_string()),
                |tasks| Ok(remove_by_id(tasks, id)),
                || self.api.delete_maintenance(id),
            )
            .await
    }
}
