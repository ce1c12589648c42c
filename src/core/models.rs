use std::{
    collections::HashMap,
    fmt,
};

use super::errors::UpdateError;

/// Opaque handle AnkiConnect uses to address a note.
pub type NoteId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct CardDetail {
    pub card_id: u64,
    pub template_name: String,
    pub interval_days: u32, // 0 while the card is still in learning
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteDetail {
    pub id: NoteId,
    pub model_name: String,
    pub fields: HashMap<String, String>,
    pub cards: Vec<CardDetail>,
}

impl NoteDetail {
    pub fn new(id: NoteId, model_name: impl Into<String>) -> Self {
        Self { id, model_name: model_name.into(), fields: HashMap::new(), cards: Vec::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_card(
        mut self,
        card_id: u64,
        template_name: impl Into<String>,
        interval_days: u32,
    ) -> Self {
        self.cards.push(CardDetail { card_id, template_name: template_name.into(), interval_days });
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Outcome of one pass over a deck.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub discovered: usize,
    pub selected: usize,
    pub updated: usize,
    pub failed: usize,
    pub missing_field: usize, // selected, but the note has no such field
    pub unchanged: usize,     // selected, field already held the value
    pub dry_run: bool,
    pub failures: Vec<UpdateError>,
}

impl Summary {
    pub fn record_failure(&mut self, failure: UpdateError) {
        self.failed += 1;
        self.failures.push(failure);
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Dry run: no notes were modified")?;
        }
        writeln!(f, "Notes examined: {}", self.discovered)?;
        writeln!(f, "Notes selected: {}", self.selected)?;
        if self.dry_run {
            writeln!(f, "Notes that would be updated: {}", self.updated)?;
        } else {
            writeln!(f, "Notes updated:  {}", self.updated)?;
        }
        writeln!(f, "Notes failed:   {}", self.failed)?;
        if self.missing_field > 0 {
            writeln!(f, "Skipped (field missing): {}", self.missing_field)?;
        }
        if self.unchanged > 0 {
            writeln!(f, "Skipped (already set):   {}", self.unchanged)?;
        }
        for failure in &self.failures {
            writeln!(f, "  failed {}", failure)?;
        }
        Ok(())
    }
}
