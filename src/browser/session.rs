//! The scripted disclaim workflow for one target URL.
//!
//! A session opens a fresh page, hangs request/response observers off it
//! for the lifetime of the navigation, then walks the page's disclaim form:
//! tick the duplicate-name checkbox, screenshot, submit, screenshot again.
//! Traffic capture and the UI script run independently; a broken capture
//! never aborts the workflow.

use crate::browser::chrome::ChromeDriver;
use crate::capture::{
    response_is_persistable, ArtifactKind, ArtifactWriter, CaptureConfig, DiagnosticSink, LogSink,
    MutationDetector, TrafficSerializer,
};
use crate::error::{DisclaimError, Result};
use crate::fingerprint::fingerprint;
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

/// Screenshot checkpoint taken after the checkbox is ticked.
pub const CHECKPOINT_REASON: &str = "reason-to-disclaim";

/// Screenshot checkpoint taken after the form is submitted.
pub const CHECKPOINT_REPORTED: &str = "disclaim-reported";

const CHECKBOX_SELECTOR: &str = r#"input[name="DuplicateName"]"#;
const SUBMIT_XPATH: &str = "//button[contains(normalize-space(.), 'Submit')]";

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub capture: CaptureConfig,
    pub screenshot_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

/// What one completed session observed.
#[derive(Debug)]
pub struct DisclaimOutcome {
    /// Campaign identifier extracted from the target URL.
    pub mention_id: String,
    /// Whether the duplicate-name mutation report was seen in the traffic.
    pub mutation_reported: bool,
    /// Screenshot files captured at the two checkpoints.
    pub screenshots: Vec<PathBuf>,
}

/// Extract the campaign identifier from a target URL.
pub fn mention_id_from_url(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == "mention_id")
        .map(|(_, value)| value.into_owned())
}

/// Drives the disclaim workflow while capturing all page traffic.
pub struct DisclaimSession {
    config: SessionConfig,
    serializer: Arc<TrafficSerializer>,
    writer: Arc<ArtifactWriter>,
    detector: Arc<MutationDetector>,
}

impl DisclaimSession {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_sink(config, Arc::new(LogSink))
    }

    /// Build a session with a custom diagnostic sink (tests inject their
    /// own to observe serializer output).
    pub fn with_sink(config: SessionConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let writer = Arc::new(ArtifactWriter::new(config.capture.log_dir.clone()));
        Self {
            config,
            serializer: Arc::new(TrafficSerializer::new(sink)),
            writer,
            detector: Arc::new(MutationDetector::new()),
        }
    }

    /// Run the full workflow against one target URL.
    pub async fn disclaim_article_authorship(
        &self,
        driver: &ChromeDriver,
        target_url: &str,
    ) -> Result<DisclaimOutcome> {
        let article_url = Url::parse(target_url).map_err(|e| {
            DisclaimError::MalformedInput(format!("invalid target url {}: {}", target_url, e))
        })?;
        let mention_id = match mention_id_from_url(&article_url) {
            Some(id) => id,
            None => {
                log::warn!("target url {} carries no mention_id", target_url);
                "unknown".to_string()
            }
        };

        let page = driver.blank_page().await?;

        let permits = Arc::new(Semaphore::new(self.config.capture.max_in_flight as usize));
        let mutation_reported = Arc::new(AtomicBool::new(false));

        let request_task =
            self.spawn_request_observer(&page, &mention_id, &permits, &mutation_reported).await?;
        let response_task = self.spawn_response_observer(&page, &mention_id, &permits).await?;

        let outcome = self
            .drive_ui(&page, target_url, &mention_id)
            .await;

        // The navigation lifetime is over; stop observing, then drain the
        // in-flight captures so their writes land before the browser goes.
        request_task.abort();
        response_task.abort();
        let _ = permits
            .acquire_many(self.config.capture.max_in_flight)
            .await;
        let _ = page.close().await;

        let screenshots = outcome?;

        Ok(DisclaimOutcome {
            mention_id,
            mutation_reported: mutation_reported.load(Ordering::SeqCst),
            screenshots,
        })
    }

    async fn spawn_request_observer(
        &self,
        page: &Page,
        mention_id: &str,
        permits: &Arc<Semaphore>,
        mutation_reported: &Arc<AtomicBool>,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;

        let page = page.clone();
        let mention_id = mention_id.to_string();
        let permits = permits.clone();
        let mutation_reported = mutation_reported.clone();
        let serializer = self.serializer.clone();
        let writer = self.writer.clone();
        let detector = self.detector.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let page = page.clone();
                let mention_id = mention_id.clone();
                let mutation_reported = mutation_reported.clone();
                let serializer = serializer.clone();
                let writer = writer.clone();
                let detector = detector.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    capture_request(
                        &page,
                        &event,
                        &mention_id,
                        &serializer,
                        &writer,
                        &detector,
                        &mutation_reported,
                    )
                    .await;
                });
            }
        }))
    }

    async fn spawn_response_observer(
        &self,
        page: &Page,
        mention_id: &str,
        permits: &Arc<Semaphore>,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let mut responses = page.event_listener::<EventResponseReceived>().await?;

        let page = page.clone();
        let mention_id = mention_id.to_string();
        let permits = permits.clone();
        let serializer = self.serializer.clone();
        let writer = self.writer.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let page = page.clone();
                let mention_id = mention_id.clone();
                let serializer = serializer.clone();
                let writer = writer.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    capture_response(&page, &event, &mention_id, &serializer, &writer).await;
                });
            }
        }))
    }

    /// The fixed UI script: tick, verify, screenshot, submit, screenshot.
    async fn drive_ui(
        &self,
        page: &Page,
        target_url: &str,
        mention_id: &str,
    ) -> Result<Vec<PathBuf>> {
        page.goto(target_url)
            .await
            .map_err(|e| DisclaimError::NavigationFailed(format!("{}: {}", target_url, e)))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| DisclaimError::NavigationFailed(format!("{}: {}", target_url, e)))?;

        let prefix = fingerprint(target_url, None)?;

        let tick = page
            .find_element(CHECKBOX_SELECTOR)
            .await
            .map_err(|_| DisclaimError::ElementNotFound(CHECKBOX_SELECTOR.to_string()))?;
        tick.click()
            .await
            .map_err(|e| DisclaimError::Other(format!("checkbox click failed: {}", e)))?;

        // The click can be swallowed by page scripts; force the state.
        page.evaluate(format!(
            "document.querySelector('{}').checked = true",
            CHECKBOX_SELECTOR
        ))
        .await
        .map_err(|e| DisclaimError::Other(format!("checkbox verify failed: {}", e)))?;

        let first = self
            .save_checkpoint(page, mention_id, &prefix, CHECKPOINT_REASON)
            .await?;

        let submit = page
            .find_xpath(SUBMIT_XPATH)
            .await
            .map_err(|_| DisclaimError::ElementNotFound(SUBMIT_XPATH.to_string()))?;
        submit
            .click()
            .await
            .map_err(|e| DisclaimError::Other(format!("submit click failed: {}", e)))?;

        // Give the submission a moment to reflect in the page.
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

        let second = self
            .save_checkpoint(page, mention_id, &prefix, CHECKPOINT_REPORTED)
            .await?;

        Ok(vec![first, second])
    }

    async fn save_checkpoint(
        &self,
        page: &Page,
        mention_id: &str,
        prefix: &str,
        checkpoint: &str,
    ) -> Result<PathBuf> {
        let path = self.config.screenshot_dir.join(format!(
            "report-mention-to-wrong-human-{}-{}-{}.png",
            mention_id, prefix, checkpoint
        ));
        page.save_screenshot(ScreenshotParams::default(), &path)
            .await
            .map_err(|e| DisclaimError::Other(format!("screenshot failed: {}", e)))?;
        log::info!("captured {} checkpoint at {}", checkpoint, path.display());
        Ok(path)
    }
}

/// Serialize and persist one request, and feed it to the mutation detector.
/// Failures are contained here; the capture is dropped with an error line.
async fn capture_request(
    page: &Page,
    event: &EventRequestWillBeSent,
    mention_id: &str,
    serializer: &TrafficSerializer,
    writer: &ArtifactWriter,
    detector: &MutationDetector,
    mutation_reported: &AtomicBool,
) {
    let url = &event.request.url;

    match detector.is_mutation_report(page, event).await {
        Ok(true) => {
            log::info!("duplicate-name mutation report observed in {}", url);
            mutation_reported.store(true, Ordering::SeqCst);
        }
        Ok(false) => {}
        // Inconclusive is not a negative; surface it and move on.
        Err(e) => log::error!("mutation detection inconclusive for {}: {}", url, e),
    }

    log::info!("logging request for {}", url);

    let record = match serializer.serialize_request(page, event).await {
        Ok(record) => record,
        Err(e) => {
            log::error!("error logging request for {}: {}", url, e);
            return;
        }
    };

    let name = match fingerprint(url, Some(&record.headers)) {
        Ok(name) => name,
        Err(e) => {
            log::error!("error logging request for {}: {}", url, e);
            return;
        }
    };

    writer
        .write(mention_id, &name, ArtifactKind::Request, &record)
        .await;
}

/// Serialize and persist one response, if its content-type is of interest.
async fn capture_response(
    page: &Page,
    event: &EventResponseReceived,
    mention_id: &str,
    serializer: &TrafficSerializer,
    writer: &ArtifactWriter,
) {
    let url = &event.response.url;
    let headers = crate::capture::serialize::headers_to_map(&event.response.headers);

    if !response_is_persistable(&headers) {
        return;
    }

    log::info!("logging response for {}", url);

    let record = serializer.serialize_response(page, event).await;

    let name = match fingerprint(url, Some(&headers)) {
        Ok(name) => name,
        Err(e) => {
            log::error!("error logging response for {}: {}", url, e);
            return;
        }
    };

    writer
        .write(mention_id, &name, ArtifactKind::Response, &record)
        .await;
}
