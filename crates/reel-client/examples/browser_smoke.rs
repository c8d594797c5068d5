/// Smoke-test for `ChromeSession` + the extraction pipeline.
///
/// Launches a headless Chromium, opens a small inline playlist page, and
/// verifies the title and rows come back while the recommendations below
/// the marker are left out. The run is repeated with row fields written as
/// relative XPath.
///
/// Run with:
///   cargo run -p reel-client --example browser_smoke
use std::time::Duration;

use reel_client::{ChromeSession, LaunchOptions};
use reel_core::{ExtractionConfig, ExtractionService, Locator, Outcome, Strategy, Target};

const PAGE: &str = r#"<html><head><title>Smoke Mix - playlist</title></head><body>
<div data-testid="playlist-page"><h1>Smoke Mix</h1>
<div data-testid="tracklist-row"><a data-testid="internal-track-link">First</a><span data-testid="internal-track-link"><a>Band</a></span></div>
<div data-testid="tracklist-row"><a data-testid="internal-track-link">Second</a></div>
<h2>Recommended</h2>
<div data-testid="tracklist-row"><a data-testid="internal-track-link">Suggested</a></div>
</div></body></html>"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    println!("Launching headless browser…");
    let session = ChromeSession::launch(&LaunchOptions::default()).await?;

    let url = format!("data:text/html,{}", PAGE.replace('#', "%23"));

    let mut xpath_fields = Strategy::playlist();
    xpath_fields.primary = Target::new(
        "primary",
        vec![Locator::xpath(".//a[@data-testid='internal-track-link']")],
    );
    xpath_fields.secondary = Target::new(
        "secondary",
        vec![Locator::xpath(".//span[@data-testid='internal-track-link']/a")],
    );

    for strategy in [Strategy::playlist(), xpath_fields] {
        let lines = extract_lines(&session, &url, strategy).await?;
        assert_eq!(lines, vec!["First - Band", "Second"]);
    }
    session.shutdown().await?;

    println!("OK — CSS and XPath row fields both extracted 2 records");
    Ok(())
}

async fn extract_lines(
    session: &ChromeSession,
    url: &str,
    strategy: Strategy,
) -> anyhow::Result<Vec<String>> {
    let config = ExtractionConfig {
        settle_delay: Duration::from_millis(200),
        wait_timeout: Duration::from_secs(5),
        ..ExtractionConfig::default()
    };
    let service = ExtractionService::new(strategy, &config)?;
    let page = session.open(url).await?;
    let result = service.extract(&page).await;
    page.close().await;
    let result = result?;

    assert_eq!(result.outcome(), Outcome::Done);
    assert_eq!(result.title(), Some("Smoke Mix"));
    Ok(result.records().iter().map(ToString::to_string).collect())
}
