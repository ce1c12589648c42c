use std::{
    cell::{
        Cell,
        RefCell,
    },
    collections::HashMap,
};

use super::NoteStore;
use crate::core::{
    NoteDetail,
    NoteId,
    StoreError,
};

struct StoredNote {
    deck: String,
    detail: NoteDetail,
}

/// In-memory note store for testing.
///
/// Uses `RefCell` for interior mutability since the updater is single-threaded,
/// which lets [`NoteStore`] keep `&self` receivers.
#[derive(Default)]
pub struct MemoryStore {
    notes: RefCell<Vec<StoredNote>>,
    models: RefCell<HashMap<String, Vec<String>>>,
    update_calls: RefCell<Vec<NoteId>>,
    offline: Cell<bool>,
    find_error: RefCell<Option<String>>,
    fetch_error: RefCell<Option<String>>,
    update_errors: RefCell<HashMap<NoteId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a note model and its templates, in card-ord order.
    pub fn add_model(&self, name: &str, templates: &[&str]) {
        self.models
            .borrow_mut()
            .insert(name.to_string(), templates.iter().map(|t| t.to_string()).collect());
    }

    pub fn add_note(&self, deck: &str, detail: NoteDetail) {
        self.notes.borrow_mut().push(StoredNote { deck: deck.to_string(), detail });
    }

    /// Current value of a field, as the host application would see it.
    pub fn field_value(&self, note_id: NoteId, field: &str) -> Option<String> {
        self.notes
            .borrow()
            .iter()
            .find(|n| n.detail.id == note_id)
            .and_then(|n| n.detail.field(field).map(str::to_string))
    }

    /// Ids passed to `update`, in call order, including failed calls.
    pub fn update_calls(&self) -> Vec<NoteId> {
        self.update_calls.borrow().clone()
    }

    /// Makes every call fail as if Anki were not running.
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn fail_find(&self, message: &str) {
        *self.find_error.borrow_mut() = Some(message.to_string());
    }

    pub fn fail_fetch(&self, message: &str) {
        *self.fetch_error.borrow_mut() = Some(message.to_string());
    }

    pub fn fail_update(&self, note_id: NoteId, message: &str) {
        self.update_errors.borrow_mut().insert(note_id, message.to_string());
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.get() {
            return Err(StoreError::Connection("memory store is offline".to_string()));
        }
        Ok(())
    }
}

/// Understands `deck:Name` and `deck:"Name"`; any other query matches everything.
fn deck_filter(query: &str) -> Option<String> {
    let name = query.trim().strip_prefix("deck:")?;
    let name = match name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
        Some(quoted) => quoted.replace("\\\"", "\""),
        None => name.to_string(),
    };
    Some(name)
}

impl NoteStore for MemoryStore {
    fn version(&self) -> Result<u32, StoreError> {
        self.check_online()?;
        Ok(6)
    }

    fn templates(&self, model_name: &str) -> Result<Vec<String>, StoreError> {
        self.check_online()?;
        self.models.borrow().get(model_name).cloned().ok_or_else(|| {
            StoreError::api("modelTemplates", format!("model was not found: {model_name}"))
        })
    }

    fn find(&self, query: &str) -> Result<Vec<NoteId>, StoreError> {
        self.check_online()?;
        if let Some(message) = self.find_error.borrow().as_ref() {
            return Err(StoreError::api("findNotes", message.clone()));
        }

        let deck = deck_filter(query);
        Ok(self
            .notes
            .borrow()
            .iter()
            .filter(|n| deck.as_ref().map_or(true, |d| &n.deck == d))
            .map(|n| n.detail.id)
            .collect())
    }

    fn fetch_details(&self, note_ids: &[NoteId]) -> Result<Vec<NoteDetail>, StoreError> {
        self.check_online()?;
        if let Some(message) = self.fetch_error.borrow().as_ref() {
            return Err(StoreError::api("notesInfo", message.clone()));
        }

        let notes = self.notes.borrow();
        Ok(note_ids
            .iter()
            .filter_map(|id| notes.iter().find(|n| n.detail.id == *id))
            .map(|n| n.detail.clone())
            .collect())
    }

    fn update(&self, note_id: NoteId, fields: &HashMap<String, String>) -> Result<(), StoreError> {
        self.check_online()?;
        self.update_calls.borrow_mut().push(note_id);

        if let Some(message) = self.update_errors.borrow().get(&note_id) {
            return Err(StoreError::api("updateNoteFields", message.clone()));
        }

        let mut notes = self.notes.borrow_mut();
        let note = notes
            .iter_mut()
            .find(|n| n.detail.id == note_id)
            .ok_or_else(|| StoreError::api("updateNoteFields", "note was not found"))?;

        for (name, value) in fields {
            if let Some(current) = note.detail.fields.get_mut(name) {
                *current = value.clone();
            }
        }
        Ok(())
    }
}
