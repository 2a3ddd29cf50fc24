//! Persistence of serialized traffic records.
//!
//! The writer is the failure boundary of the capture pipeline: whatever
//! goes wrong while encoding or writing one artifact is logged and
//! swallowed so the browsing session keeps running. A missing log file is
//! acceptable; an aborted session is not.

use crate::error::{DisclaimError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Which side of the exchange an artifact records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Request,
    Response,
}

impl ArtifactKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Request => "request",
            ArtifactKind::Response => "response",
        }
    }
}

/// Only responses declaring this content-type prefix are persisted; the
/// check runs upstream, before a response record is even built.
const PERSISTED_CONTENT_TYPE_PREFIX: &str = "application/text";

/// Whether a response with these headers should be persisted at all.
pub fn response_is_persistable(headers: &BTreeMap<String, String>) -> bool {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.starts_with(PERSISTED_CONTENT_TYPE_PREFIX))
        .unwrap_or(false)
}

/// Writes traffic records into a fixed log directory.
pub struct ArtifactWriter {
    log_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Path an artifact with these coordinates lands at.
    pub fn artifact_path(
        &self,
        mention_id: &str,
        fingerprint: &str,
        kind: ArtifactKind,
    ) -> PathBuf {
        self.log_dir.join(format!(
            "mention-id-{}-{}.{}.json",
            mention_id,
            fingerprint,
            kind.suffix()
        ))
    }

    /// Persist one record, absorbing every failure.
    ///
    /// Encoding errors, unwritable paths, and full disks all end the same
    /// way: an error line on the log channel and no artifact. Returns the
    /// written path when the artifact landed, for callers that want to
    /// report it.
    pub async fn write<T: Serialize>(
        &self,
        mention_id: &str,
        fingerprint: &str,
        kind: ArtifactKind,
        record: &T,
    ) -> Option<PathBuf> {
        let path = self.artifact_path(mention_id, fingerprint, kind);
        match Self::try_write(&path, record).await {
            Ok(()) => Some(path),
            Err(e) => {
                log::error!("error logging {} to {}: {}", kind.suffix(), path.display(), e);
                None
            }
        }
    }

    async fn try_write<T: Serialize>(path: &Path, record: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| DisclaimError::Serialization(e.to_string()))?;

        tokio::fs::write(path, json)
            .await
            .map_err(|e| DisclaimError::Persistence(e.to_string()))?;

        Ok(())
    }
}
