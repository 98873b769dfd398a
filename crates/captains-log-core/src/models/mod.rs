//! Data models for logbook entities.
//!
//! - `Boat`, `NewBoat`: vessels owned by the user
//! - `Trip`: a recorded passage
//! - `Note`, `NewNote`: free-form log entries
//! - `MaintenanceTask`: scheduled upkeep per boat
//! - `TodoList`, `TodoItem`: checklists
//! - `UserSettings`: unit system and feature toggles

pub mod boat;
pub mod maintenance;
pub mod note;
pub mod settings;
pub mod todo;
pub mod trip;
pub mod user;

pub use boat::{Boat, NewBoat};
pub use maintenance::{MaintenanceTask, NewMaintenanceTask};
pub use note::{NewNote, Note, NoteKind};
pub use settings::{UnitSystem, UserSettings};
pub use todo::{TodoItem, TodoList, PENDING_ID_PREFIX};
pub use trip::{Trip, TripStatus};
pub use user::{LoginResponse, User};

/// Entities addressed by a server-assigned string id.
pub trait Identified {
    fn id(&self) -> &str;
}

macro_rules! impl_identified {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

impl_identified!(Boat, Trip, Note, MaintenanceTask, TodoItem, TodoList);
