use clap::Parser;
use disclaim_webdriver::browser::chrome::{ChromeDriver, ConnectionMode};
use disclaim_webdriver::browser::session::{DisclaimSession, SessionConfig};
use disclaim_webdriver::capture::CaptureConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding the array of target URLs
    #[arg(long, default_value = "disclaim-links.json")]
    links: PathBuf,

    /// Directory request/response artifacts are written to
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Directory checkpoint screenshots are written to
    #[arg(long, default_value = "screenshots")]
    screenshot_dir: PathBuf,

    /// Run Chrome headless
    #[arg(long)]
    headless: bool,

    /// Pass --no-sandbox to Chrome (Linux AppArmor workaround)
    #[arg(long)]
    no_sandbox: bool,

    /// Path to a Chrome executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Connect to a running Chrome on this debug port instead of launching
    #[arg(long)]
    debug_port: Option<u16>,

    /// Ceiling on concurrently in-flight traffic captures
    #[arg(long, default_value_t = 32)]
    max_in_flight: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let raw = tokio::fs::read_to_string(&args.links)
        .await
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", args.links.display(), e))?;
    let links: Vec<String> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("{} is not a JSON array of URLs: {}", args.links.display(), e))?;

    tokio::fs::create_dir_all(&args.log_dir).await?;
    tokio::fs::create_dir_all(&args.screenshot_dir).await?;

    let session = DisclaimSession::new(SessionConfig {
        capture: CaptureConfig {
            log_dir: args.log_dir.clone(),
            max_in_flight: args.max_in_flight,
        },
        screenshot_dir: args.screenshot_dir.clone(),
    });

    log::info!("processing {} target link(s)", links.len());

    for link in &links {
        let driver = ChromeDriver::new(ConnectionMode::from_cli(
            args.debug_port,
            args.chrome_path.clone(),
            args.no_sandbox,
            args.headless,
        ))
        .await?;

        // One bad target must not stop the rest of the list.
        match session.disclaim_article_authorship(&driver, link).await {
            Ok(outcome) => log::info!(
                "processed mention {} (mutation reported: {})",
                outcome.mention_id,
                outcome.mutation_reported
            ),
            Err(e) => {
                log::error!("failed to process {}: {}", link, e);
                if !driver.is_alive().await {
                    log::error!("browser connection lost; starting a fresh one");
                }
            }
        }

        if let Err(e) = driver.close().await {
            log::warn!("browser close failed: {}", e);
        }
    }

    Ok(())
}
