//! `AnkiConnect` against a mock AnkiConnect endpoint.
//!
//! The client is blocking, so the mock server is driven from a runtime owned by
//! the test instead of `#[tokio::test]`.

use std::{
    collections::HashMap,
    time::Duration,
};

use ankiflag::{
    anki::NoteStore,
    core::{
        deck_query,
        CardDetail,
        StoreError,
    },
    run,
    AnkiConnect,
    ConnectionConfig,
    FilterCriteria,
};
use serde_json::{
    json,
    Value,
};
use tokio::runtime::Runtime;
use wiremock::{
    matchers::{
        body_partial_json,
        method,
    },
    Mock,
    MockBuilder,
    MockServer,
    ResponseTemplate,
};

struct AnkiConnectMock {
    server: MockServer,
    runtime: Runtime,
}

impl AnkiConnectMock {
    fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn client(&self) -> AnkiConnect {
        let config =
            ConnectionConfig::new(self.server.uri(), 6, Duration::from_secs(5)).unwrap();
        AnkiConnect::new(&config).unwrap()
    }

    /// JSON bodies of every request received so far, in order.
    fn bodies(&self) -> Vec<Value> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .map(|request| request.body_json::<Value>().unwrap())
            .collect()
    }

    fn verify(&self) {
        self.runtime.block_on(self.server.verify());
    }
}

fn action(name: &str) -> MockBuilder {
    Mock::given(method("POST")).and(body_partial_json(json!({ "action": name, "version": 6 })))
}

fn result(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": value, "error": null }))
}

fn error(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": null, "error": message }))
}

// Written out as text so the key order on the wire is exactly this.
const WORDS_TEMPLATES: &str = r#"{
    "result": {
        "Word": {"Front": "{{Front}}", "Back": "{{Back}}"},
        "Audio": {"Front": "{{Audio}}", "Back": "{{Front}}"}
    },
    "error": null
}"#;

fn words_templates() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(WORDS_TEMPLATES, "application/json")
}

fn note_info(note_id: u64, cards: &[u64], audio_enabled: &str) -> Value {
    json!({
        "noteId": note_id,
        "profile": "User 1",
        "modelName": "Words",
        "tags": [],
        "fields": {
            "Front": {"value": format!("word {note_id}"), "order": 0},
            "Audio Enabled": {"value": audio_enabled, "order": 1}
        },
        "mod": 1718377864,
        "cards": cards
    })
}

fn card_info(card_id: u64, note: u64, ord: u64, interval: i64) -> Value {
    json!({
        "cardId": card_id,
        "note": note,
        "ord": ord,
        "interval": interval,
        "deckName": "Polish",
        "modelName": "Words",
        "fields": {}
    })
}

#[test]
fn test_find_sends_request_envelope() {
    let mock = AnkiConnectMock::start();
    mock.mount(
        action("findNotes")
            .and(body_partial_json(json!({ "params": { "query": "deck:\"Polish Vocab\"" } })))
            .respond_with(result(json!([3, 1, 2])))
            .expect(1),
    );

    let ids = mock.client().find(&deck_query("Polish Vocab")).unwrap();

    assert_eq!(ids, vec![3, 1, 2]);
    assert_eq!(
        mock.bodies(),
        vec![json!({
            "action": "findNotes",
            "version": 6,
            "params": { "query": "deck:\"Polish Vocab\"" }
        })]
    );
    mock.verify();
}

#[test]
fn test_fetch_details_resolves_templates_in_model_order() {
    let mock = AnkiConnectMock::start();
    mock.mount(
        action("notesInfo")
            .and(body_partial_json(json!({ "params": { "notes": [1, 2, 9] } })))
            .respond_with(result(json!([
                note_info(1, &[10, 11], ""),
                note_info(2, &[20], "Yes"),
                {}
            ]))),
    );
    mock.mount(
        action("cardsInfo")
            .and(body_partial_json(json!({ "params": { "cards": [10, 11, 20] } })))
            .respond_with(result(json!([
                card_info(10, 1, 0, 20),
                card_info(11, 1, 1, 3),
                card_info(20, 2, 1, -600)
            ]))),
    );
    // Both notes share a model, so its templates are looked up once
    mock.mount(
        action("modelTemplates")
            .and(body_partial_json(json!({ "params": { "modelName": "Words" } })))
            .respond_with(words_templates())
            .expect(1),
    );

    let client = mock.client();
    assert_eq!(client.templates("Words").unwrap(), vec!["Word", "Audio"]);
    let details = client.fetch_details(&[1, 2, 9]).unwrap();

    assert_eq!(details.len(), 2);
    assert_eq!(details[0].id, 1);
    assert_eq!(details[0].model_name, "Words");
    assert_eq!(details[0].field("Front"), Some("word 1"));
    assert_eq!(
        details[0].cards,
        vec![
            CardDetail { card_id: 10, template_name: "Word".to_string(), interval_days: 20 },
            CardDetail { card_id: 11, template_name: "Audio".to_string(), interval_days: 3 },
        ]
    );
    assert_eq!(details[1].field("Audio Enabled"), Some("Yes"));
    assert_eq!(
        details[1].cards,
        vec![CardDetail { card_id: 20, template_name: "Audio".to_string(), interval_days: 0 }]
    );
    mock.verify();
}

#[test]
fn test_update_sends_only_the_target_field() {
    let mock = AnkiConnectMock::start();
    mock.mount(action("updateNoteFields").respond_with(result(Value::Null)).expect(1));

    let fields = HashMap::from([("Audio Enabled".to_string(), "Yes".to_string())]);
    mock.client().update(7, &fields).unwrap();

    assert_eq!(
        mock.bodies(),
        vec![json!({
            "action": "updateNoteFields",
            "version": 6,
            "params": { "note": { "id": 7, "fields": { "Audio Enabled": "Yes" } } }
        })]
    );
    mock.verify();
}

#[test]
fn test_error_envelope_is_api_error() {
    let mock = AnkiConnectMock::start();
    mock.mount(action("findNotes").respond_with(error("collection is not available")));

    let failure = mock.client().find("deck:\"Polish\"").unwrap_err();

    assert_eq!(failure, StoreError::api("findNotes", "collection is not available"));
    assert!(!failure.is_connection());
}

#[test]
fn test_http_error_status_is_api_error() {
    let mock = AnkiConnectMock::start();
    mock.mount(action("version").respond_with(ResponseTemplate::new(500)));

    match mock.client().version() {
        Err(StoreError::Api { action, message }) => {
            assert_eq!(action, "version");
            assert!(message.contains("HTTP error 500"), "unexpected message: {message}");
        }
        other => panic!("Expected API error, got {:?}", other),
    }
}

#[test]
fn test_unknown_model_is_api_error() {
    let mock = AnkiConnectMock::start();
    mock.mount(action("modelTemplates").respond_with(error("model was not found: Wrods")));

    let failure = mock.client().templates("Wrods").unwrap_err();
    assert_eq!(failure, StoreError::api("modelTemplates", "model was not found: Wrods"));
}

#[test]
fn test_run_records_rejected_update() {
    let mock = AnkiConnectMock::start();
    mock.mount(action("version").respond_with(result(json!(6))));
    mock.mount(action("modelTemplates").respond_with(words_templates()));
    mock.mount(action("findNotes").respond_with(result(json!([1, 2]))));
    mock.mount(
        action("notesInfo")
            .respond_with(result(json!([note_info(1, &[10], ""), note_info(2, &[20], "")]))),
    );
    mock.mount(
        action("cardsInfo")
            .respond_with(result(json!([card_info(10, 1, 0, 30), card_info(20, 2, 0, 30)]))),
    );
    mock.mount(
        action("updateNoteFields")
            .and(body_partial_json(json!({ "params": { "note": { "id": 1 } } })))
            .respond_with(error("cannot update note: note is open in the editor"))
            .expect(1),
    );
    mock.mount(
        action("updateNoteFields")
            .and(body_partial_json(json!({ "params": { "note": { "id": 2 } } })))
            .respond_with(result(Value::Null))
            .expect(1),
    );

    let criteria = FilterCriteria::new("Polish", "Words", "Word", 14, "Audio Enabled", "Yes")
        .unwrap();
    let summary = run(&mock.client(), &criteria).unwrap();

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.selected, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].note_id, 1);
    assert!(summary.failures[0].message.contains("note is open in the editor"));
    mock.verify();
}
