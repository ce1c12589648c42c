pub mod anki;
pub mod core;
pub mod persistence;

pub use crate::anki::{
    AnkiConnect,
    MemoryStore,
    NoteStore,
};
pub use crate::core::{
    run,
    run_with_config,
    AnkiflagError,
    ConnectionConfig,
    CriteriaOverrides,
    FilterCriteria,
    Preset,
    Summary,
};
