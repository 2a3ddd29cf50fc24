//! Tests for traffic record construction
//!
//! Covers:
//! - Best-effort JSON interpretation of request bodies
//! - Record JSON shape as persisted to disk
//! - Empty response content as a first-class state
//! - The injectable diagnostic sink's filter and emission

use disclaim_webdriver::capture::detect::matches_event_endpoint;
use disclaim_webdriver::capture::{
    DiagnosticSink, PostData, SerializedRequest, SerializedResponse, TrafficSerializer,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use url::Url;

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn json_bodies_parse_into_structured_values() {
    let body = r#"{"data":{"question_id":"DuplicateName"}}"#;
    assert_eq!(
        PostData::parse(body),
        PostData::Json(json!({"data": {"question_id": "DuplicateName"}}))
    );
}

#[test]
fn non_json_bodies_stay_raw() {
    assert_eq!(
        PostData::parse("mention_id=42&confirm=yes"),
        PostData::Raw("mention_id=42&confirm=yes".to_string())
    );
    assert_eq!(
        PostData::parse(r#"{"truncated": "#),
        PostData::Raw(r#"{"truncated": "#.to_string())
    );
}

#[test]
fn request_record_serializes_with_camel_case_post_data() {
    let record = SerializedRequest {
        url: "https://www.academia.edu/v0/arbitrary_event".to_string(),
        method: "POST".to_string(),
        headers: headers(&[("Content-Type", "application/json")]),
        post_data: Some(PostData::parse(r#"{"data":{"question_id":"DuplicateName"}}"#)),
    };

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["url"], "https://www.academia.edu/v0/arbitrary_event");
    assert_eq!(value["method"], "POST");
    assert_eq!(value["headers"]["Content-Type"], "application/json");
    // JSON bodies are persisted as structured values, not as strings
    assert_eq!(value["postData"]["data"]["question_id"], "DuplicateName");
}

#[test]
fn raw_post_data_serializes_as_a_string() {
    let record = SerializedRequest {
        url: "https://example.com/form".to_string(),
        method: "POST".to_string(),
        headers: BTreeMap::new(),
        post_data: Some(PostData::parse("a=1")),
    };

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["postData"], "a=1");
}

#[test]
fn absent_post_data_serializes_as_null() {
    let record = SerializedRequest {
        url: "https://example.com/".to_string(),
        method: "GET".to_string(),
        headers: BTreeMap::new(),
        post_data: None,
    };

    let value = serde_json::to_value(&record).unwrap();
    assert!(value["postData"].is_null());
}

#[test]
fn response_record_tolerates_empty_content() {
    // An unreadable body is recorded as empty content, not as an error.
    let record = SerializedResponse {
        url: "https://example.com/stream".to_string(),
        content: Vec::new(),
        headers: headers(&[("Content-Type", "application/text")]),
        status: 200,
    };

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["status"], 200);
    assert_eq!(value["content"], json!([]));
}

/// Sink that records every URL it was offered, filtering like the default
/// sink does.
#[derive(Default)]
struct RecordingSink {
    seen: Mutex<Vec<String>>,
}

impl DiagnosticSink for RecordingSink {
    fn wants(&self, url: &Url) -> bool {
        matches_event_endpoint(url)
    }

    fn emit_request(&self, record: &SerializedRequest) {
        self.seen.lock().unwrap().push(record.url.clone());
    }
}

fn request_record(url: &str) -> SerializedRequest {
    SerializedRequest {
        url: url.to_string(),
        method: "POST".to_string(),
        headers: BTreeMap::new(),
        post_data: Some(PostData::parse(r#"{"data":{"question_id":"DuplicateName"}}"#)),
    }
}

#[test]
fn sink_receives_records_for_the_event_endpoint() {
    let sink = Arc::new(RecordingSink::default());
    let serializer = TrafficSerializer::new(sink.clone());

    let record = request_record("https://www.academia.edu/v0/arbitrary_event");
    serializer.emit_diagnostics(&record);

    assert_eq!(
        sink.seen.lock().unwrap().as_slice(),
        ["https://www.academia.edu/v0/arbitrary_event"]
    );
}

#[test]
fn sink_is_not_offered_unrelated_traffic() {
    let sink = Arc::new(RecordingSink::default());
    let serializer = TrafficSerializer::new(sink.clone());

    serializer.emit_diagnostics(&request_record("https://example.com/v0/arbitrary_event"));
    serializer.emit_diagnostics(&request_record("https://www.academia.edu/other"));
    serializer.emit_diagnostics(&request_record("not a url at all"));

    assert!(sink.seen.lock().unwrap().is_empty());
}

#[test]
fn response_content_round_trips_as_bytes() {
    let record = SerializedResponse {
        url: "https://example.com/doc".to_string(),
        content: b"hello".to_vec(),
        headers: BTreeMap::new(),
        status: 201,
    };

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["content"], json!([104, 101, 108, 108, 111]));

    let back: SerializedResponse = serde_json::from_value(value).unwrap();
    assert_eq!(back.content, b"hello");
}
