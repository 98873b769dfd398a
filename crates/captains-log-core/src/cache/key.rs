//! Cache keys.
//!
//! A [`CacheKey`] is an ordered sequence of string segments such as
//! `["boats", "detail", "b1"]`. Code never builds one by hand: each resource
//! family has a small struct implementing [`QueryKey`], which also fixes the
//! Rust type stored under the key. Two families can't produce colliding keys
//! because each one starts with its own root segment.

use std::fmt;

/// Segment separating list keys from detail keys within a family.
const LIST: &str = "list";
const DETAIL: &str = "detail";

/// Scope segment for notes that aren't filtered by boat.
const ALL_NOTES: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// A new key with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Root segment of each resource family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Boats,
    Trips,
    Notes,
    Maintenance,
    Todos,
    Settings,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Boats => "boats",
            Resource::Trips => "trips",
            Resource::Notes => "notes",
            Resource::Maintenance => "maintenance",
            Resource::Todos => "todos",
            Resource::Settings => "settings",
        }
    }

    /// Prefix shared by every key of this family.
    pub fn root(&self) -> CacheKey {
        CacheKey::new([self.as_str()])
    }

    fn list(&self) -> CacheKey {
        self.root().child(LIST)
    }

    fn detail(&self, id: &str) -> CacheKey {
        self.root().child(DETAIL).child(id)
    }
}

/// A typed handle on one cache entry.
pub trait QueryKey {
    /// Type of the value stored under this key.
    type Value: Clone + Send + Sync + 'static;

    fn cache_key(&self) -> CacheKey;
}

/// All boats: `boats/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoatsList;

impl BoatsList {
    pub fn detail(&self, id: impl Into<String>) -> BoatDetail {
        BoatDetail(id.into())
    }
}

impl QueryKey for BoatsList {
    type Value = Vec<crate::models::Boat>;

    fn cache_key(&self) -> CacheKey {
        Resource::Boats.list()
    }
}

/// One boat: `boats/detail/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoatDetail(pub String);

impl QueryKey for BoatDetail {
    type Value = crate::models::Boat;

    fn cache_key(&self) -> CacheKey {
        Resource::Boats.detail(&self.0)
    }
}

/// Trips of one boat: `trips/list/{boat_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripsList(pub String);

impl TripsList {
    pub fn detail(&self, trip_id: impl Into<String>) -> TripDetail {
        TripDetail(trip_id.into())
    }
}

impl QueryKey for TripsList {
    type Value = Vec<crate::models::Trip>;

    fn cache_key(&self) -> CacheKey {
        Resource::Trips.list().child(&self.0)
    }
}

/// One trip: `trips/detail/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripDetail(pub String);

impl QueryKey for TripDetail {
    type Value = crate::models::Trip;

    fn cache_key(&self) -> CacheKey {
        Resource::Trips.detail(&self.0)
    }
}

/// Notes of one boat, or all notes: `notes/list/{boat_id|all}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesList(pub Option<String>);

impl NotesList {
    pub fn all() -> Self {
        Self(None)
    }

    pub fn for_boat(boat_id: impl Into<String>) -> Self {
        Self(Some(boat_id.into()))
    }

    pub fn boat_id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl QueryKey for NotesList {
    type Value = Vec<crate::models::Note>;

    fn cache_key(&self) -> CacheKey {
        Resource::Notes.list().child(self.0.as_deref().unwrap_or(ALL_NOTES))
    }
}

/// Maintenance tasks of one boat: `maintenance/list/{boat_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceList(pub String);

impl QueryKey for MaintenanceList {
    type Value = Vec<crate::models::MaintenanceTask>;

    fn cache_key(&self) -> CacheKey {
        Resource::Maintenance.list().child(&self.0)
    }
}

/// One to-do list with its items: `todos/list/{list_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoListKey(pub String);

impl QueryKey for TodoListKey {
    type Value = crate::models::TodoList;

    fn cache_key(&self) -> CacheKey {
        Resource::Todos.list().child(&self.0)
    }
}

/// The user's settings: `settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsKey;

impl QueryKey for SettingsKey {
    type Value = crate::models::UserSettings;

    fn cache_key(&self) -> CacheKey {
        Resource::Settings.root()
    }
}
