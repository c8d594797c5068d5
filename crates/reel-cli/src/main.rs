mod interactive;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;

use interactive::Collector;
use reel_client::{ChromeSession, LaunchOptions, find_profile_dir};
use reel_core::artifact::{ArtifactFormat, write_artifact};
use reel_core::{ExtractionConfig, ExtractionResult, ExtractionService, Outcome, Strategy};

#[derive(Parser)]
#[command(name = "reel", version, about = "Pull the full track list out of an infinitely-scrolling playlist page")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one collection and save it
    Extract {
        /// Collection page URL
        #[arg(short, long)]
        url: String,

        #[command(flatten)]
        opts: RunOptions,
    },

    /// Prompt for collection URLs until told to stop
    Interactive {
        #[command(flatten)]
        opts: RunOptions,
    },
}

#[derive(Args, Clone)]
struct RunOptions {
    /// Folder that receives one sub-folder per collection (defaults to ~/Downloads)
    #[arg(short, long, env = "REEL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Artifact format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Browser user data dir to reuse (defaults to the local Chrome/Chromium profile)
    #[arg(long, env = "REEL_PROFILE_DIR")]
    profile: Option<PathBuf>,

    /// Start with a fresh profile; only public collections will be visible
    #[arg(long, default_value_t = false)]
    no_profile: bool,

    /// Show the browser window
    #[arg(long, default_value_t = false)]
    headed: bool,

    /// JSON strategy file overriding the built-in locator tables
    #[arg(short, long, env = "REEL_STRATEGY")]
    strategy: Option<PathBuf>,

    /// Seconds allowed for opening the page
    #[arg(long, env = "REEL_NAV_TIMEOUT_SECS", default_value_t = 30)]
    nav_timeout_secs: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ArtifactFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Text => ArtifactFormat::Text,
            OutputFormat::Json => ArtifactFormat::Json,
        }
    }
}

/// Everything one run needs besides the URL.
pub(crate) struct Runner {
    session: ChromeSession,
    service: ExtractionService,
    output_root: PathBuf,
    format: ArtifactFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("reel=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { url, opts } => {
            let runner = Runner::start(&opts).await?;
            let outcome = cmd_extract(&runner, &url).await;
            runner.shutdown().await;
            outcome
        }
        Commands::Interactive { opts } => {
            let runner = Runner::start(&opts).await?;
            let stdin = std::io::stdin();
            let outcome = interactive::run(&runner, &mut stdin.lock(), &mut std::io::stdout()).await;
            runner.shutdown().await;
            outcome
        }
    }
}

impl Runner {
    async fn start(opts: &RunOptions) -> Result<Self> {
        let config = ExtractionConfig::from_env().context("Invalid REEL_* configuration")?;

        let strategy = match &opts.strategy {
            Some(path) => Strategy::load(path)
                .with_context(|| format!("Failed to load strategy file: {}", path.display()))?,
            None => Strategy::playlist(),
        };
        let service = ExtractionService::new(strategy, &config)?;

        let profile_dir = if opts.no_profile {
            None
        } else {
            find_profile_dir(opts.profile.as_deref())
        };
        if profile_dir.is_none() {
            tracing::warn!("No browser profile found; only public collections will be visible");
        }

        let launch = LaunchOptions {
            headed: opts.headed,
            profile_dir,
            navigation_timeout: Duration::from_secs(opts.nav_timeout_secs),
        };
        tracing::info!("Launching browser...");
        let session = ChromeSession::launch(&launch)
            .await
            .context("Failed to launch browser")?;

        Ok(Self {
            session,
            service,
            output_root: output_root(opts.output_dir.clone()),
            format: opts.format.into(),
        })
    }

    async fn shutdown(self) {
        if let Err(e) = self.session.shutdown().await {
            tracing::warn!(error = %e, "Browser shutdown failed");
        }
    }
}

impl Collector for Runner {
    /// Open `url` in a fresh tab, run the pipeline, close the tab.
    async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        let url = validate_url(url)?;
        let page = self.session.open(url.as_str()).await?;
        let result = self.service.extract(&page).await;
        page.close().await;
        Ok(result?)
    }

    fn save(&self, result: &ExtractionResult) -> Result<PathBuf> {
        let title = result.title().context("Cannot save a collection without a title")?;
        let path = write_artifact(&self.output_root, title, result.records(), self.format)
            .with_context(|| format!("Failed to write into {}", self.output_root.display()))?;
        Ok(path)
    }
}

async fn cmd_extract<C: Collector>(runner: &C, url: &str) -> Result<()> {
    let result = runner.extract(url).await?;

    match result.outcome() {
        Outcome::Failed => bail!("Could not identify the collection at {url}"),
        Outcome::Empty | Outcome::Done if !result.has_records() => {
            eprintln!("{}", interactive::EMPTY_REASONS);
            bail!("No records found in collection");
        }
        Outcome::Empty | Outcome::Done => {
            let path = runner.save(&result)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Only non-empty http(s) URLs are accepted.
fn validate_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("No URL provided");
    }
    let url = Url::parse(raw).with_context(|| format!("Invalid URL: {raw}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => bail!("URL scheme '{scheme}' is not allowed (only http/https)"),
    }
}

fn output_root(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(dirs::download_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| Path::new(".").to_path_buf())
}
