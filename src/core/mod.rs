pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod pipeline;

pub use config::{
    ConnectionConfig,
    CriteriaOverrides,
    FilterCriteria,
    Preset,
};
pub use errors::{
    AnkiflagError,
    StoreError,
    UpdateError,
};
pub use models::{
    CardDetail,
    NoteDetail,
    NoteId,
    Summary,
};
pub use pipeline::{
    deck_query,
    is_selected,
    run,
    run_with_config,
};
