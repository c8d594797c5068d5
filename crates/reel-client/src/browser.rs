use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use reel_core::error::AppError;
use tokio::task::JoinHandle;

use crate::page::{BrowserPage, map_cdp};
use crate::profile::profile_in_use;

/// How to launch Chromium.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Show the browser window instead of running headless.
    pub headed: bool,
    /// Reuse an existing user data dir (cookies, logins).
    pub profile_dir: Option<PathBuf>,
    /// Ceiling for opening a page and waiting for its `<body>`.
    pub navigation_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headed: false,
            profile_dir: None,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// A Chromium process driven over the Chrome DevTools Protocol.
///
/// One browser serves many runs; each [`open`](Self::open) gets a fresh tab.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromeSession {
    /// Launch Chromium with the given options.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$CHROME_BIN`, one of
    /// the well-known install paths, or `chromiumoxide`'s own lookup.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        if let Some(bin) = find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        if let Some(profile) = &options.profile_dir {
            tracing::info!("Using browser profile: {}", profile.display());
            if profile_in_use(profile) {
                tracing::warn!(
                    "Profile appears to be open in another browser; close it to avoid lock errors"
                );
            }
            builder = builder.user_data_dir(profile);
        }

        builder = if options.headed {
            builder.with_head()
        } else {
            builder.arg("--headless=new")
        };

        let config = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--no-first-run")
            .window_size(1280, 1024)
            .build()
            .map_err(|e| AppError::Generic(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::SessionUnavailable(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            navigation_timeout: options.navigation_timeout,
        })
    }

    /// Open a new tab at `url` and wait until it has rendered a `<body>`.
    ///
    /// A tab that never renders is closed before the error is returned.
    pub async fn open(&self, url: &str) -> Result<BrowserPage, AppError> {
        tracing::info!("Navigating to: {url}");
        let timeout = self.navigation_timeout;
        let deadline = tokio::time::Instant::now() + timeout;

        let page = match tokio::time::timeout_at(deadline, self.browser.new_page(url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                return Err(AppError::NavigationFailed(format!(
                    "Failed to navigate to {url}: {e}"
                )));
            }
            Err(_) => return Err(AppError::Timeout(timeout.as_secs())),
        };

        let rendered = tokio::time::timeout_at(deadline, page.find_element("body"))
            .await
            .ok()
            .map(|found| found.map(|_| ()));
        let page = BrowserPage::new(page);
        match render_outcome(rendered, timeout) {
            Ok(()) => Ok(page),
            Err(e) => {
                page.close().await;
                Err(e)
            }
        }
    }

    /// Close the browser and stop the CDP handler.
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        tracing::info!("Closing browser...");
        self.browser.close().await.map_err(map_cdp)?;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "Browser did not exit cleanly");
        }
        self.handler.abort();
        Ok(())
    }
}

/// `None` means the deadline passed before `<body>` appeared.
fn render_outcome(
    rendered: Option<Result<(), CdpError>>,
    timeout: Duration,
) -> Result<(), AppError> {
    match rendered {
        Some(Ok(())) => Ok(()),
        Some(Err(e)) => Err(AppError::NavigationFailed(format!(
            "Page did not render body: {e}"
        ))),
        None => Err(AppError::Timeout(timeout.as_secs())),
    }
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// On systems where Chromium is installed via **snap**, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags, breaking headless mode.
/// We look for the real binary inside the snap first, then fall back to
/// well-known system paths. If nothing is found we return `None` and let
/// `chromiumoxide` do its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    const CANDIDATES: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    ];

    CANDIDATES.iter().map(Path::new).find(|p| p.exists()).map(Path::to_path_buf)
}
