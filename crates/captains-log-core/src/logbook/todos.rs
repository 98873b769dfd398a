use chrono::Utc;
use tracing::debug;

use crate::api::{ApiError, ApiResult};
use crate::cache::TodoListKey;
use crate::models::{TodoItem, TodoList};

use super::{pending_id, update_by_id, Logbook};

/// Append a placeholder item carrying `text`.
pub fn append_item(list: &TodoList, text: &str) -> TodoList {
    let mut next = list.clone();
    next.items.push(TodoItem {
        id: pending_id(),
        text: text.to_string(),
        done: false,
        created_at: Some(Utc::now()),
    });
    next
}

/// Set `done` on one item. Items still waiting for a server id are refused.
/// An item the cached list doesn't know about leaves the list unchanged; the
/// server decides whether it exists.
pub fn with_item_done(list: &TodoList, item_id: &str, done: bool) -> ApiResult<TodoList> {
    match list.item(item_id) {
        None => Ok(list.clone()),
        Some(item) if item.is_pending() => Err(ApiError::local("Item is still being saved")),
        Some(_) => {
            let items = update_by_id(&list.items, item_id, |item| item.done = done).unwrap_or_default();
            Ok(TodoList {
                items,
                ..list.clone()
            })
        }
    }
}

pub fn without_item(list: &TodoList, item_id: &str) -> TodoList {
    TodoList {
        items: super::remove_by_id(&list.items, item_id),
        ..list.clone()
    }
}

impl Logbook {
    pub async fn load_todo_list(&self, list_id: &str) -> ApiResult<TodoList> {
        self.loader
            .load(&TodoListKey(list_id.to_string()), || {
                self.retry.run(move || self.api.get_todo_list(list_id))
            })
            .await
    }

    /// Works whether or not the list is cached: with nothing cached the
    /// placeholder is skipped and the server's list is stored on success.
    pub async fn add_todo_item(&self, list_id: &str, text: &str) -> ApiResult<TodoList> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::local("Item text is required"));
        }
        let list = self
            .coordinator
            .mutate_and_store(
                &TodoListKey(list_id.to_string()),
                |list| Ok(append_item(list, text)),
                || self.api.add_todo_item(list_id, text),
            )
            .await?;
        debug!(list_id, items = list.items.len(), "To-do item added");
        Ok(list)
    }

    pub async fn set_todo_item_done(&self, list_id: &str, item_id: &str, done: bool) -> ApiResult<TodoList> {
        self.coordinator
            .mutate_and_store(
                &TodoListKey(list_id.to_string()),
                |list| with_item_done(list, item_id, done),
                || self.api.set_todo_item_done(list_id, item_id, done),
            )
            .await
    }

    /// Flip an item. The list is read through the loader so a stale entry is
    /// refetched, and refetched once more if the item is missing from it.
    pub async fn toggle_todo_item(&self, list_id: &str, item_id: &str) -> ApiResult<TodoList> {
        let mut list = self.load_todo_list(list_id).await?;
        if list.item(item_id).is_none() {
            let key = TodoListKey(list_id.to_string());
            list = self
                .loader
                .refetch(&key, || self.retry.run(move || self.api.get_todo_list(list_id)))
                .await?;
        }
        let done = list
            .item(item_id)
            .map(|item| item.done)
            .ok_or_else(|| ApiError::local(format!("Item {} is not in the list", item_id)))?;
        self.set_todo_item_done(list_id, item_id, !done).await
    }

    pub async fn remove_todo_item(&self, list_id: &str, item_id: &str) -> ApiResult<TodoList> {
        self.coordinator
            .mutate_and_store(
                &TodoListKey(list_id.to_string()),
                |list| Ok(without_item(list, item_id)),
                || self.api.delete_todo_item(list_id, item_id),
            )
            .await
    }
}
