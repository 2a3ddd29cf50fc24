//! Detection of the duplicate-name mutation report inside the traffic
//! stream.
//!
//! The target site funnels user actions through a single arbitrary-event
//! endpoint; the one we care about carries `data.question_id ==
//! "DuplicateName"` in its JSON body.

use crate::error::{DisclaimError, Result};
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, GetRequestPostDataParams,
};
use chromiumoxide::page::Page;
use url::Url;

/// Origin the automation operates against.
pub const TARGET_ORIGIN: &str = "https://www.academia.edu";

/// Path of the site's catch-all event-logging endpoint.
pub const EVENT_PATH: &str = "/v0/arbitrary_event";

/// Question id that marks a duplicate-name report.
pub const DUPLICATE_NAME_QUESTION_ID: &str = "DuplicateName";

/// Whether a URL addresses the target site's event-logging endpoint.
pub fn matches_event_endpoint(url: &Url) -> bool {
    url.origin().ascii_serialization() == TARGET_ORIGIN && url.path() == EVENT_PATH
}

/// Whether an event body reports the duplicate-name question.
///
/// A body that is not valid JSON is inconclusive, not a negative: the
/// endpoint only ever receives JSON, so an unparsable body means we failed
/// to observe, and the caller must not record that as "no report".
pub fn body_reports_duplicate_name(body: &str) -> Result<bool> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        DisclaimError::DetectionInconclusive(format!("event body is not JSON: {}", e))
    })?;
    Ok(value["data"]["question_id"] == DUPLICATE_NAME_QUESTION_ID)
}

/// Inspects requests for the duplicate-name mutation report.
#[derive(Debug, Default)]
pub struct MutationDetector;

impl MutationDetector {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether a request is the duplicate-name report.
    ///
    /// Returns `Ok(false)` without suspending when the origin, path, or
    /// presence of a body already rules the request out. Otherwise the body
    /// is fetched lazily (it may not be materialized at interception time)
    /// and inspected; a body that cannot be retrieved or parsed yields
    /// [`DisclaimError::DetectionInconclusive`].
    pub async fn is_mutation_report(
        &self,
        page: &Page,
        event: &EventRequestWillBeSent,
    ) -> Result<bool> {
        let request = &event.request;

        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(_) => return Ok(false),
        };
        if !matches_event_endpoint(&url) {
            return Ok(false);
        }

        let has_body = request.post_data.is_some() || request.has_post_data.unwrap_or(false);
        if !has_body {
            return Ok(false);
        }

        let body = match &request.post_data {
            Some(body) => body.clone(),
            None => page
                .execute(GetRequestPostDataParams::new(event.request_id.clone()))
                .await
                .map_err(|e| {
                    DisclaimError::DetectionInconclusive(format!(
                        "event body unavailable for {}: {}",
                        request.url, e
                    ))
                })?
                .result
                .post_data,
        };

        body_reports_duplicate_name(&body)
    }
}
