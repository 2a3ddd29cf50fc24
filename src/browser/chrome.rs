// spider_chrome re-exports the chromiumoxide API
use crate::error::{DisclaimError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;

/// Viewport the disclaim workflow renders at.
pub const VIEWPORT_WIDTH: u32 = 1080;
pub const VIEWPORT_HEIGHT: u32 = 1024;

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for the Chrome browser.
pub enum ConnectionMode {
    /// Launch Chrome using a system installation.
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Connect to an existing Chrome on a debug port.
    DebugPort(u16),
}

impl ConnectionMode {
    /// Mode selection as exposed on the command line: a debug port wins
    /// over launch options, which only apply to a browser we start
    /// ourselves.
    pub fn from_cli(
        debug_port: Option<u16>,
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    ) -> Self {
        match debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            },
        }
    }
}

impl ChromeDriver {
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory so parallel runs don't share state
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map_err(|e| DisclaimError::LaunchFailed(e.to_string()))?
                    .as_nanos();
                let temp_dir = std::env::temp_dir().join(format!("disclaim-chrome-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    DisclaimError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                config = config.user_data_dir(&temp_dir).viewport(Viewport {
                    width: VIEWPORT_WIDTH,
                    height: VIEWPORT_HEIGHT,
                    ..Default::default()
                });

                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                let config = config.build().map_err(|e| {
                    DisclaimError::LaunchFailed(format!(
                        "{}. Install Chrome or pass --chrome-path /path/to/chrome; \
                         Linux sandbox issues can be worked around with --no-sandbox",
                        e
                    ))
                })?;

                let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
                    DisclaimError::LaunchFailed(format!(
                        "{}. Install Chrome or pass --chrome-path /path/to/chrome; \
                         Linux sandbox issues can be worked around with --no-sandbox",
                        e
                    ))
                })?;

                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if event.is_err() {
                            break;
                        }
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    DisclaimError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if event.is_err() {
                            break;
                        }
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// Open a fresh blank page; the session registers its traffic listeners
    /// on it before navigating anywhere.
    pub async fn blank_page(&self) -> Result<Page> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| DisclaimError::Other(format!("Failed to create page: {}", e)))
    }

    /// Check if the browser is still alive and responsive. Used between
    /// targets to tell a page-level failure from a dead connection.
    pub async fn is_alive(&self) -> bool {
        let pages = match self.browser.pages().await {
            Ok(pages) => pages,
            Err(_) => return false,
        };
        // A browser with no pages still answered the query above.
        let Some(page) = pages.first() else {
            return true;
        };
        tokio::time::timeout(tokio::time::Duration::from_secs(2), page.url())
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false)
    }

    /// Close the browser connection.
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| DisclaimError::Other(e.to_string()))?;
        self.browser
            .wait()
            .await
            .map_err(|e| DisclaimError::Other(e.to_string()))?;
        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_port_wins_over_launch_flags() {
        let mode = ConnectionMode::from_cli(Some(9222), Some("/opt/chrome".to_string()), true, true);
        assert!(matches!(mode, ConnectionMode::DebugPort(9222)));
    }

    #[test]
    fn launch_flags_carry_into_sandboxed_mode() {
        let mode = ConnectionMode::from_cli(None, Some("/opt/chrome".to_string()), true, false);
        match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                assert_eq!(chrome_path.as_deref(), Some("/opt/chrome"));
                assert!(no_sandbox);
                assert!(!headless);
            }
            ConnectionMode::DebugPort(_) => panic!("expected sandboxed mode"),
        }
    }
}
