//! Conversion of live CDP traffic events into plain, serializable records.
//!
//! Records are built once per intercepted event, handed straight to the
//! [`ArtifactWriter`](crate::capture::writer::ArtifactWriter), and dropped.
//! Bodies are fetched lazily over CDP; a response body that can no longer
//! be retrieved (transport closed, resource evicted) degrades to an empty
//! byte sequence instead of failing the capture.

use crate::error::{DisclaimError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, EventResponseReceived, GetRequestPostDataParams,
    GetResponseBodyParams, Headers,
};
use chromiumoxide::page::Page;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// A request body, interpreted best-effort.
///
/// Parsing the body as JSON is a convenience for the human reading the log
/// artifact, not validation; anything that does not parse is carried
/// verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostData {
    Json(serde_json::Value),
    Raw(String),
}

impl PostData {
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => PostData::Json(value),
            Err(_) => PostData::Raw(raw.to_string()),
        }
    }
}

/// One intercepted request, flattened for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedRequest {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    #[serde(rename = "postData")]
    pub post_data: Option<PostData>,
}

/// One intercepted response, flattened for persistence.
///
/// `content` is empty when the body could not be read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedResponse {
    pub url: String,
    pub content: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    pub status: i64,
}

/// Process-wide observability hook fed selected request records.
///
/// The sink decides which URLs it cares about, so tests can assert on
/// emitted diagnostics without a live console.
pub trait DiagnosticSink: Send + Sync {
    /// Whether records for this URL should be emitted.
    fn wants(&self, url: &Url) -> bool;

    /// Receive a record the sink asked for.
    fn emit_request(&self, record: &SerializedRequest);
}

/// Default sink: spotlights the arbitrary-event endpoint on the log channel.
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn wants(&self, url: &Url) -> bool {
        crate::capture::detect::matches_event_endpoint(url)
    }

    fn emit_request(&self, record: &SerializedRequest) {
        match serde_json::to_string_pretty(record) {
            Ok(json) => log::info!("arbitrary_event request: {}", json),
            Err(e) => log::warn!("arbitrary_event request not printable: {}", e),
        }
    }
}

/// Converts live request/response events into records.
pub struct TrafficSerializer {
    sink: Arc<dyn DiagnosticSink>,
}

impl TrafficSerializer {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// Serialize a request event, fetching its body over CDP when the
    /// browser did not inline it. A body the transport can no longer
    /// produce fails the capture; the caller contains that failure.
    pub async fn serialize_request(
        &self,
        page: &Page,
        event: &EventRequestWillBeSent,
    ) -> Result<SerializedRequest> {
        let request = &event.request;

        let post_data = match &request.post_data {
            Some(raw) => Some(PostData::parse(raw)),
            None if request.has_post_data.unwrap_or(false) => {
                let body = page
                    .execute(GetRequestPostDataParams::new(event.request_id.clone()))
                    .await
                    .map_err(|e| {
                        DisclaimError::Serialization(format!(
                            "post data unavailable for {}: {}",
                            request.url, e
                        ))
                    })?;
                Some(PostData::parse(&body.result.post_data))
            }
            None => None,
        };

        let record = SerializedRequest {
            url: request.url.clone(),
            method: request.method.clone(),
            headers: headers_to_map(&request.headers),
            post_data,
        };

        self.emit_diagnostics(&record);

        Ok(record)
    }

    /// Offer a finished record to the diagnostic sink; the sink's URL
    /// filter decides whether it is emitted.
    pub fn emit_diagnostics(&self, record: &SerializedRequest) {
        if let Ok(url) = Url::parse(&record.url) {
            if self.sink.wants(&url) {
                self.sink.emit_request(record);
            }
        }
    }

    /// Serialize a response event. The metadata is already owned by the
    /// event; only the body needs the transport, and an unreadable body is
    /// recorded as empty rather than dropping the response.
    pub async fn serialize_response(
        &self,
        page: &Page,
        event: &EventResponseReceived,
    ) -> SerializedResponse {
        let response = &event.response;

        let content = match page
            .execute(GetResponseBodyParams::new(event.request_id.clone()))
            .await
        {
            Ok(body) => {
                let body = &body.result;
                if body.base64_encoded {
                    BASE64.decode(&body.body).unwrap_or_default()
                } else {
                    body.body.clone().into_bytes()
                }
            }
            Err(e) => {
                log::debug!("response body unavailable for {}: {}", response.url, e);
                Vec::new()
            }
        };

        SerializedResponse {
            url: response.url.clone(),
            content,
            headers: headers_to_map(&response.headers),
            status: response.status,
        }
    }
}

/// Flatten a CDP header bag into an ordered string map.
///
/// CDP models headers as a JSON object; non-string values show up for
/// synthetic entries and are rendered through their JSON form.
pub fn headers_to_map(headers: &Headers) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(object) = headers.inner().as_object() {
        for (name, value) in object {
            let value = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            map.insert(name.clone(), value);
        }
    }
    map
}
