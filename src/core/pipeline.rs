use std::{
    collections::{
        HashMap,
        HashSet,
    },
    time::Instant,
};

use log::{
    debug,
    info,
    warn,
};

use super::{
    AnkiflagError,
    ConnectionConfig,
    FilterCriteria,
    NoteDetail,
    StoreError,
    Summary,
    UpdateError,
};
use crate::anki::{
    AnkiConnect,
    NoteStore,
};

/// Anki search query matching every note in `deck`.
pub fn deck_query(deck: &str) -> String {
    format!("deck:\"{}\"", deck.replace('"', "\\\""))
}

/// A note qualifies when it uses the configured model and at least one of its
/// cards uses the target template with an interval strictly above the minimum.
pub fn is_selected(note: &NoteDetail, criteria: &FilterCriteria) -> bool {
    note.model_name == criteria.model()
        && note.cards.iter().any(|card| {
            card.template_name == criteria.template()
                && card.interval_days > criteria.min_interval()
        })
}

/// Connects to AnkiConnect and runs one pass over the configured deck.
pub fn run_with_config(
    config: &ConnectionConfig,
    criteria: &FilterCriteria,
) -> Result<Summary, AnkiflagError> {
    let store = AnkiConnect::new(config)?;
    run(&store, criteria)
}

/// Discovers, filters and updates the notes of one deck.
///
/// Connection failures and failed lookups abort the run. A rejected update is
/// recorded in the summary and the remaining notes are still processed.
pub fn run<S: NoteStore>(store: &S, criteria: &FilterCriteria) -> Result<Summary, AnkiflagError> {
    let start = Instant::now();

    let version = store.version().map_err(|e| AnkiflagError::from_query("Version check", e))?;
    debug!("AnkiConnect is online. Version: {}", version);

    let templates = store.templates(criteria.model()).map_err(|e| match e {
        StoreError::Connection(_) => AnkiflagError::from_query("Template lookup", e),
        StoreError::Api { .. } => AnkiflagError::Query {
            step: "Template lookup",
            message: format!(
                "cannot find the '{}' template: '{}' model lookup failed ({e})",
                criteria.template(),
                criteria.model()
            ),
        },
    })?;
    debug!("Templates of model '{}': {:?}", criteria.model(), templates);
    if !templates.iter().any(|t| t == criteria.template()) {
        return Err(AnkiflagError::Query {
            step: "Template lookup",
            message: format!(
                "'{}' template not found in the '{}' model (available: {})",
                criteria.template(),
                criteria.model(),
                templates.join(", ")
            ),
        });
    }

    info!("Searching for notes in deck '{}'", criteria.deck());
    let mut note_ids = store
        .find(&deck_query(criteria.deck()))
        .map_err(|e| AnkiflagError::from_query("Note discovery", e))?;

    let mut seen = HashSet::new();
    note_ids.retain(|id| seen.insert(*id));

    let mut summary =
        Summary { discovered: note_ids.len(), dry_run: criteria.dry_run(), ..Default::default() };
    if note_ids.is_empty() {
        warn!("No notes found in deck '{}'", criteria.deck());
        return Ok(summary);
    }
    info!("Found {} notes in deck '{}'", note_ids.len(), criteria.deck());

    let notes = store
        .fetch_details(&note_ids)
        .map_err(|e| AnkiflagError::from_query("Fetching note details", e))?;

    let mut considered = HashSet::new();
    let selected: Vec<NoteDetail> = notes
        .into_iter()
        .filter(|note| considered.insert(note.id) && is_selected(note, criteria))
        .collect();
    summary.selected = selected.len();
    info!(
        "{} notes have a '{}' card with an interval above {} days",
        selected.len(),
        criteria.template(),
        criteria.min_interval()
    );

    let fields = HashMap::from([(criteria.field().to_string(), criteria.value().to_string())]);

    for note in &selected {
        let Some(current) = note.field(criteria.field()) else {
            debug!("Note {} has no field '{}', skipping", note.id, criteria.field());
            summary.missing_field += 1;
            continue;
        };

        if criteria.skip_unchanged() && current == criteria.value() {
            debug!("Note {} already has '{}' set, skipping", note.id, criteria.field());
            summary.unchanged += 1;
            continue;
        }

        if criteria.dry_run() {
            info!("Would set '{}' on note {}", criteria.field(), note.id);
            summary.updated += 1;
            continue;
        }

        match store.update(note.id, &fields) {
            Ok(()) => {
                debug!("Updated note {}", note.id);
                summary.updated += 1;
            }
            Err(e) if e.is_connection() => {
                return Err(AnkiflagError::from_query("Updating notes", e));
            }
            Err(e) => {
                warn!("Failed to update note {}: {}", note.id, e);
                summary.record_failure(UpdateError { note_id: note.id, message: e.to_string() });
            }
        }
    }

    if summary.missing_field > 0 {
        warn!(
            "{} selected notes have no field named '{}'",
            summary.missing_field,
            criteria.field()
        );
    }
    info!(
        "Set '{}' to '{}' on {} notes ({:.1}s)",
        criteria.field(),
        criteria.value(),
        summary.updated,
        start.elapsed().as_secs_f32()
    );

    Ok(summary)
}
