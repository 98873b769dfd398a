use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix for ids of items that exist only locally, pending the server's answer.
pub const PENDING_ID_PREFIX: &str = "pending-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TodoItem {
    pub fn is_pending(&self) -> bool {
        self.id.starts_with(PENDING_ID_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<TodoItem>,
}

impl TodoList {
    pub fn remaining(&self) -> usize {
        self.items.iter().filter(|i| !i.done).count()
    }

    pub fn item(&self, item_id: &str) -> Option<&TodoItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}
