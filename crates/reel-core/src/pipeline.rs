use crate::boundary::detect_boundary;
use crate::config::ExtractionConfig;
use crate::error::AppError;
use crate::loader::ProgressiveLoader;
use crate::locator::{WaitPolicy, contain, resolve_all, resolve_text, split_page_title};
use crate::models::{ExtractionResult, Probe, Target};
use crate::records::{RowFields, extract_records};
use crate::strategy::Strategy;
use crate::traits::{PageSession, Scope};

/// Orchestrates one extraction run: title → load → boundary → rows → records.
///
/// Generic over the page session, so the whole pipeline can be driven by an
/// in-memory page in tests.
pub struct ExtractionService {
    strategy: Strategy,
    boundary: Option<Target>,
    loader: ProgressiveLoader,
    wait: WaitPolicy,
}

impl ExtractionService {
    /// Validate the strategy and prepare a reusable service.
    pub fn new(strategy: Strategy, config: &ExtractionConfig) -> Result<Self, AppError> {
        strategy.validate()?;
        let boundary = strategy.boundary_target()?;
        Ok(Self {
            strategy,
            boundary,
            loader: ProgressiveLoader::new(config.settle_delay, config.max_reveals),
            wait: WaitPolicy {
                timeout: config.wait_timeout,
                poll_interval: config.poll_interval,
            },
        })
    }

    /// Run the pipeline against a page already positioned at the collection.
    ///
    /// 1. Resolve the collection title (page-title fallback last); give up if absent
    /// 2. Scroll until the content stops growing
    /// 3. Snapshot the exclusion marker position, if any
    /// 4. Resolve the row collection; empty result if absent
    /// 5. Walk rows into records
    ///
    /// Only session-fatal errors are returned as `Err`.
    pub async fn extract<S: PageSession>(&self, session: &S) -> Result<ExtractionResult, AppError> {
        // 1. Title
        let Some(title) = self.resolve_title(session).await? else {
            tracing::warn!("Could not identify the collection title");
            return Ok(ExtractionResult::failed());
        };
        tracing::info!(%title, "Collection found");

        // 2. Load
        tracing::info!("Scrolling to load all rows...");
        let report = self.loader.load(session).await?;
        tracing::debug!(?report, "Progressive load finished");

        // 3. Boundary
        let boundary = match &self.boundary {
            Some(target) => detect_boundary(session, target).await?,
            None => None,
        };

        // 4. Rows
        let rows = match resolve_all(session, Scope::Document, &self.strategy.rows).await? {
            Probe::Found(rows) => rows,
            Probe::NotFound => {
                tracing::warn!("Could not find row elements");
                return Ok(ExtractionResult::empty(title));
            }
            Probe::Fault(e) => {
                tracing::warn!(error = %e, "Row lookup faulted");
                return Ok(ExtractionResult::empty(title));
            }
        };
        tracing::info!("Found {} row elements", rows.len());

        // 5. Records
        let fields = RowFields {
            primary: &self.strategy.primary,
            secondary: &self.strategy.secondary,
        };
        let records = extract_records(session, &rows, boundary, &fields).await?;

        Ok(ExtractionResult::done(title, records))
    }

    async fn resolve_title<S: PageSession>(&self, session: &S) -> Result<Option<String>, AppError> {
        let target = &self.strategy.title;
        match resolve_text(session, Scope::Document, target, self.wait).await? {
            Probe::Found(title) => return Ok(Some(title)),
            Probe::NotFound => {}
            Probe::Fault(e) => tracing::debug!(error = %e, "Title locators faulted"),
        }

        tracing::info!("Trying to extract the title from the page title...");
        let raw = match contain(session.page_title().await)? {
            Probe::Found(Some(raw)) => raw,
            Probe::Found(None) | Probe::NotFound => return Ok(None),
            Probe::Fault(e) => {
                tracing::debug!(error = %e, "Page title unreadable");
                return Ok(None);
            }
        };

        Ok(split_page_title(&raw, &self.strategy.title_separator)
            .filter(|head| target.accepts(head))
            .map(str::to_string))
    }
}
