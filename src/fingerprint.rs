//! Deterministic, filesystem-safe identifiers for captured traffic.
//!
//! Every persisted artifact is named after a fingerprint derived from the
//! request URL, the headers that were on the wire, and the capture instant.
//! The SHA-256 digest makes names collision-resistant across URLs/headers;
//! the millisecond timestamp separates repeated captures of the same URL.

use crate::error::{DisclaimError, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;

/// Reduce a string to the filesystem-safe alphabet `[A-Za-z0-9_-]`.
///
/// Runs of disallowed characters collapse to a single `-`; leading and
/// trailing separators are trimmed.
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_sep = false;

    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    let trimmed = out.trim_matches('-');
    trimmed.to_string()
}

/// Fingerprint for a capture happening right now.
///
/// Identical `(url, headers)` pairs evaluated within the same millisecond
/// produce the same fingerprint; any other combination differs.
pub fn fingerprint(url: &str, headers: Option<&BTreeMap<String, String>>) -> Result<String> {
    fingerprint_at(url, headers, chrono::Utc::now().timestamp_millis())
}

/// Deterministic core of [`fingerprint`]: the capture instant is a parameter.
pub fn fingerprint_at(
    url: &str,
    headers: Option<&BTreeMap<String, String>>,
    timestamp_millis: i64,
) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|e| DisclaimError::MalformedInput(format!("invalid url {}: {}", url, e)))?;

    let mut hasher = Sha256::new();
    hasher.update(parsed.as_str().as_bytes());
    if let Some(headers) = headers {
        let encoded = serde_json::to_string(headers)
            .map_err(|e| DisclaimError::MalformedInput(format!("unencodable headers: {}", e)))?;
        hasher.update(encoded.as_bytes());
    }
    let digest = hasher.finalize();

    let origin = parsed.origin().ascii_serialization();
    Ok(slugify(&format!(
        "{}-{:x}-{}",
        origin, digest, timestamp_millis
    )))
}
