//! Traffic capture pipeline: serialize intercepted requests/responses,
//! persist them under fingerprinted names, and watch for the duplicate-name
//! mutation report inside the stream.

pub mod detect;
pub mod serialize;
pub mod writer;

pub use detect::MutationDetector;
pub use serialize::{
    DiagnosticSink, LogSink, PostData, SerializedRequest, SerializedResponse, TrafficSerializer,
};
pub use writer::{response_is_persistable, ArtifactKind, ArtifactWriter};

use std::path::PathBuf;

/// Configuration for one page's capture run.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Directory request/response artifacts are written to.
    pub log_dir: PathBuf,

    /// Ceiling on concurrently in-flight captures. Body reads and file
    /// writes both suspend, so an unbounded fan-out on a chatty page could
    /// pile up tasks without limit. `u32` because that is the widest count
    /// a full semaphore drain can request.
    pub max_in_flight: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            max_in_flight: 32,
        }
    }
}
