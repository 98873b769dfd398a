use chrono::Utc;

use crate::api::{ApiError, ApiResult};
use crate::cache::{NotesList, Resource};
use crate::models::{Note, NewNote};

use super::{pending_id, remove_by_id, update_by_id, Logbook};

/// Placeholder note shown until the server assigns an id.
pub fn placeholder_note(fields: &NewNote) -> Note {
    Note {
        id: pending_id(),
        boat_id: fields.boat_id.clone(),
        trip_id: fields.trip_id.clone(),
        kind: fields.kind,
        title: fields.title.clone(),
        content: fields.content.clone(),
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// Newest note first, matching the server's ordering.
pub fn prepend_note(notes: &[Note], note: Note) -> Vec<Note> {
    let mut next = Vec::with_capacity(notes.len() + 1);
    next.push(note);
    next.extend_from_slice(notes);
    next
}

/// A note missing from the cached list leaves it unchanged.
pub fn edit_note(notes: &[Note], id: &str, fields: &NewNote) -> ApiResult<Vec<Note>> {
    Ok(update_by_id(notes, id, |note| {
        note.kind = fields.kind;
        note.title = fields.title.clone();
        note.content = fields.content.clone();
        note.updated_at = Some(Utc::now());
    })
    .unwrap_or_else(|| notes.to_vec()))
}

impl Logbook {
    pub async fn load_notes(&self, boat_id: Option<&str>) -> ApiResult<Vec<Note>> {
        let key = NotesList(boat_id.map(str::to_string));
        self.loader
            .load(&key, || self.retry.run(move || self.api.list_notes(boat_id)))
            .await
    }

    /// The list a note is shown in: its boat's, or the global one.
    fn notes_key(boat_id: Option<&str>) -> NotesList {
        NotesList(boat_id.map(str::to_string))
    }

    /// The other note lists can hold the same note, so every mutation ends
    /// by marking the whole family stale.
    fn invalidate_notes(&self) {
        self.cache().invalidate_prefix(&Resource::Notes.root());
    }

    pub async fn add_note(&self, fields: &NewNote) -> ApiResult<Note> {
        if fields.content.trim().is_empty() {
            return Err(ApiError::local("Note content is required"));
        }
        let placeholder = placeholder_note(fields);
        let note = self
            .coordinator
            .mutate(
                &Self::notes_key(fields.boat_id.as_deref()),
                |notes| Ok(prepend_note(notes, placeholder)),
                || self.api.create_note(fields),
            )
            .await?;
        self.invalidate_notes();
        Ok(note)
    }

    pub async fn update_note(&self, id: &str, fields: &NewNote) -> ApiResult<Note> {
        let note = self
            .coordinator
            .mutate(
                &Self::notes_key(fields.boat_id.as_deref()),
                |notes| edit_note(notes, id, fields),
                || self.api.update_note(id, fields),
            )
            .await?;
        self.invalidate_notes();
        Ok(note)
    }

    pub async fn delete_note(&self, boat_id: Option<&str>, id: &str) -> ApiResult<()> {
        self.coordinator
            .mutate(
                &Self::notes_key(boat_id),
                |notes| Ok(remove_by_id(notes, id)),
                || self.api.delete_note(id),
            )
            .await?;
        self.invalidate_notes();
        Ok(())
    }
}
