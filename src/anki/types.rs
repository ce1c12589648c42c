use std::collections::HashMap;

use serde::{
    Deserialize,
    Serialize,
};

use crate::core::StoreError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Field {
    pub value: String,
}

/// One entry of a `notesInfo` response.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteInfo {
    pub note_id: u64,
    pub model_name: String,
    pub fields: HashMap<String, Field>,
    pub cards: Vec<u64>,
}

/// One entry of a `cardsInfo` response.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub card_id: u64,
    pub ord: usize,
    pub interval: i64, // days, or negative seconds while in learning
}

impl CardInfo {
    /// Whole days of the current interval; learning steps count as 0.
    pub fn interval_days(&self) -> u32 {
        if self.interval <= 0 {
            0
        } else {
            u32::try_from(self.interval).unwrap_or(u32::MAX)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Surfaces the envelope's `error` string. `result` may legitimately be null.
    pub fn into_result(self, action: &str) -> Result<Option<T>, StoreError> {
        match self.error {
            Some(message) => Err(StoreError::api(action, message)),
            None => Ok(self.result),
        }
    }
}
