pub mod browser;
pub mod capture;
pub mod error;
pub mod fingerprint;

// Re-export commonly used items
pub use browser::chrome::{ChromeDriver, ConnectionMode};
pub use browser::session::{DisclaimOutcome, DisclaimSession, SessionConfig};
pub use capture::{
    ArtifactKind, ArtifactWriter, CaptureConfig, DiagnosticSink, LogSink, MutationDetector,
    PostData, SerializedRequest, SerializedResponse, TrafficSerializer,
};
pub use error::DisclaimError;
pub use fingerprint::{fingerprint, fingerprint_at, slugify};
