use std::{
    cell::RefCell,
    collections::HashMap,
};

use log::{
    debug,
    warn,
};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    types::{
        ApiResponse,
        CardInfo,
        NoteInfo,
    },
    NoteStore,
};
use crate::core::{
    http::http_client,
    AnkiflagError,
    CardDetail,
    ConnectionConfig,
    NoteDetail,
    NoteId,
    StoreError,
};

/// [`NoteStore`] backed by the AnkiConnect add-on's HTTP endpoint.
pub struct AnkiConnect {
    client: Client,
    url: String,
    version: u32,
    // model name -> template names, indexed by card ord
    templates: RefCell<HashMap<String, Vec<String>>>,
}

impl AnkiConnect {
    pub fn new(config: &ConnectionConfig) -> Result<Self, AnkiflagError> {
        Ok(Self {
            client: http_client(config)?,
            url: config.url().to_string(),
            version: config.version(),
            templates: RefCell::new(HashMap::new()),
        })
    }

    fn make_request<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<Option<T>, StoreError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), Value::String(action.to_string()));
        body.insert("version".to_string(), Value::Number(self.version.into()));

        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        debug!("AnkiConnect request: {}", action);
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| self.transport_error(action, e))?;

        if !response.status().is_success() {
            return Err(StoreError::api(action, format!("HTTP error {}", response.status())));
        }

        let envelope: ApiResponse<T> = response
            .json()
            .map_err(|e| StoreError::api(action, format!("unreadable response: {e}")))?;

        envelope.into_result(action)
    }

    /// Like `make_request`, but a null `result` is an error.
    fn request<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<T, StoreError> {
        self.make_request(action, params)?
            .ok_or_else(|| StoreError::api(action, "response carried no result"))
    }

    fn transport_error(&self, action: &str, error: reqwest::Error) -> StoreError {
        if error.is_connect() || error.is_timeout() || error.is_request() {
            StoreError::Connection(format!("{}: {}", self.url, error))
        } else {
            StoreError::api(action, error.to_string())
        }
    }

    fn notes_info(&self, note_ids: &[NoteId]) -> Result<Vec<NoteInfo>, StoreError> {
        let params = serde_json::json!({ "notes": note_ids });
        let entries: Vec<Value> = self.request("notesInfo", Some(params))?;
        Ok(decode_entries("notesInfo", entries))
    }

    fn cards_info(&self, card_ids: &[u64]) -> Result<Vec<CardInfo>, StoreError> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = serde_json::json!({ "cards": card_ids });
        let entries: Vec<Value> = self.request("cardsInfo", Some(params))?;
        Ok(decode_entries("cardsInfo", entries))
    }

    /// Template names of a model in card-ord order. Cached per model.
    fn template_names(&self, model_name: &str) -> Result<Vec<String>, StoreError> {
        if let Some(names) = self.templates.borrow().get(model_name) {
            return Ok(names.clone());
        }

        let params = serde_json::json!({ "modelName": model_name });
        let templates: serde_json::Map<String, Value> =
            self.request("modelTemplates", Some(params))?;
        let names: Vec<String> = templates.keys().cloned().collect();
        debug!("Templates of model '{}': {:?}", model_name, names);

        self.templates.borrow_mut().insert(model_name.to_string(), names.clone());
        Ok(names)
    }
}

impl NoteStore for AnkiConnect {
    fn version(&self) -> Result<u32, StoreError> {
        self.request("version", None)
    }

    fn templates(&self, model_name: &str) -> Result<Vec<String>, StoreError> {
        self.template_names(model_name)
    }

    fn find(&self, query: &str) -> Result<Vec<NoteId>, StoreError> {
        let params = serde_json::json!({ "query": query });
        self.request("findNotes", Some(params))
    }

    fn fetch_details(&self, note_ids: &[NoteId]) -> Result<Vec<NoteDetail>, StoreError> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let notes = self.notes_info(note_ids)?;
        let card_ids: Vec<u64> = notes.iter().flat_map(|n| n.cards.iter().copied()).collect();
        debug!("Fetching {} cards across {} notes", card_ids.len(), notes.len());

        let cards: HashMap<u64, CardInfo> =
            self.cards_info(&card_ids)?.into_iter().map(|c| (c.card_id, c)).collect();

        let mut details = Vec::with_capacity(notes.len());
        for note in notes {
            let templates = self.template_names(&note.model_name)?;
            details.push(to_note_detail(note, &cards, &templates));
        }
        Ok(details)
    }

    fn update(&self, note_id: NoteId, fields: &HashMap<String, String>) -> Result<(), StoreError> {
        let params = serde_json::json!({ "note": { "id": note_id, "fields": fields } });
        self.make_request::<Value>("updateNoteFields", Some(params))?;
        Ok(())
    }
}

/// AnkiConnect answers `{}` for ids it no longer knows; such entries are skipped.
fn decode_entries<T: DeserializeOwned>(action: &str, entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping unreadable {} entry: {}", action, e);
                None
            }
        })
        .collect()
}

fn to_note_detail(
    note: NoteInfo,
    cards: &HashMap<u64, CardInfo>,
    templates: &[String],
) -> NoteDetail {
    let card_details = note
        .cards
        .iter()
        .filter_map(|card_id| {
            let Some(card) = cards.get(card_id) else {
                warn!("Card {} of note {} was not returned by cardsInfo", card_id, note.note_id);
                return None;
            };
            let Some(template_name) = templates.get(card.ord) else {
                warn!(
                    "Card {} has ord {} but model '{}' only has {} templates",
                    card.card_id,
                    card.ord,
                    note.model_name,
                    templates.len()
                );
                return None;
            };
            Some(CardDetail {
                card_id: card.card_id,
                template_name: template_name.clone(),
                interval_days: card.interval_days(),
            })
        })
        .collect();

    NoteDetail {
        id: note.note_id,
        fields: note.fields.into_iter().map(|(name, field)| (name, field.value)).collect(),
        model_name: note.model_name,
        cards: card_details,
    }
}
