use std::collections::HashMap;

use crate::core::{
    NoteDetail,
    NoteId,
    StoreError,
};

pub mod api;
pub mod memory;
pub mod types;

pub use api::AnkiConnect;
pub use memory::MemoryStore;

/// The slice of the AnkiConnect surface the updater depends on.
///
/// Calls block until the store answers or its timeout elapses.
pub trait NoteStore {
    /// API version reported by the store. Used as a reachability check.
    fn version(&self) -> Result<u32, StoreError>;

    /// Template names of a note model, in card-ord order.
    fn templates(&self, model_name: &str) -> Result<Vec<String>, StoreError>;

    /// Note ids matching an Anki search query, in the store's order.
    fn find(&self, query: &str) -> Result<Vec<NoteId>, StoreError>;

    /// Model, fields and cards of each requested note. Unknown ids are omitted.
    fn fetch_details(&self, note_ids: &[NoteId]) -> Result<Vec<NoteDetail>, StoreError>;

    /// Overwrites the given fields of one note; other fields are left alone.
    fn update(&self, note_id: NoteId, fields: &HashMap<String, String>) -> Result<(), StoreError>;
}
