use thiserror::Error;

use super::models::NoteId;

/// Failures raised by a [`crate::anki::NoteStore`] implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The endpoint could not be reached at all (refused, timed out, ...).
    #[error("{0}")]
    Connection(String),

    /// The endpoint answered, but the action itself failed.
    #[error("{action}: {message}")]
    Api { action: String, message: String },
}

impl StoreError {
    pub fn api(action: &str, message: impl Into<String>) -> Self {
        StoreError::Api { action: action.to_string(), message: message.into() }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

#[derive(Error, Debug)]
pub enum AnkiflagError {
    #[error(
        "Could not connect to AnkiConnect ({0}). Is Anki running with the AnkiConnect add-on installed?"
    )]
    Connection(String),

    #[error("{step} failed: {message}")]
    Query { step: &'static str, message: String },

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Failed to load profile: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Reqwest(Box<reqwest::Error>),
}

impl AnkiflagError {
    /// Maps a store failure during a step the run cannot continue without.
    pub fn from_query(step: &'static str, error: StoreError) -> Self {
        match error {
            StoreError::Connection(reason) => AnkiflagError::Connection(reason),
            other => AnkiflagError::Query { step, message: other.to_string() },
        }
    }

    /// Process exit status for a run that aborted with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AnkiflagError::Connection(_)
            | AnkiflagError::Query { .. }
            | AnkiflagError::Reqwest(_) => 1,
            AnkiflagError::Validation(_) | AnkiflagError::Config(_) => 2,
        }
    }
}

impl From<reqwest::Error> for AnkiflagError {
    fn from(error: reqwest::Error) -> Self {
        AnkiflagError::Reqwest(Box::new(error))
    }
}

/// A single note whose field update was rejected. Never aborts a run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("note {note_id}: {message}")]
pub struct UpdateError {
    pub note_id: NoteId,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_not_configuration_errors() {
        let builder_error =
            reqwest::blocking::Client::new().get("not a url").build().unwrap_err();

        let error = AnkiflagError::from(builder_error);
        assert!(matches!(error, AnkiflagError::Reqwest(_)));
        assert!(error.to_string().starts_with("HTTP client error"));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_query_errors_keep_connection_failures() {
        let refused = StoreError::Connection("refused".into());
        let lost = AnkiflagError::from_query("Note discovery", refused);
        assert!(matches!(lost, AnkiflagError::Connection(_)));

        let rejected = StoreError::api("findNotes", "boom");
        let failed = AnkiflagError::from_query("Note discovery", rejected);
        match failed {
            AnkiflagError::Query { step, message } => {
                assert_eq!(step, "Note discovery");
                assert_eq!(message, "findNotes: boom");
            }
            other => panic!("Expected query error, got {:?}", other),
        }
    }
}
