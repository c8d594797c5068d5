//! Progressive loading of infinitely-scrolling content.
//!
//! The only observable signal that more rows arrived is the document's
//! scrollable length, so loading is a bounded polling loop: trigger, settle,
//! measure, stop on the first iteration that did not grow.

use std::time::Duration;

use crate::error::AppError;
use crate::locator::contain;
use crate::models::Probe;
use crate::traits::PageSession;

/// Why loading stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStop {
    /// An iteration produced no growth.
    Converged,
    /// The reveal cap was reached while content was still growing.
    CapReached,
    /// Measuring or triggering faulted; the page is used as loaded so far.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadReport {
    /// Reveal triggers issued.
    pub reveals: u32,
    /// Last successfully measured content extent.
    pub extent: f64,
    pub stop: LoadStop,
}

/// Drives a page until its lazily rendered content stops growing.
#[derive(Debug, Clone)]
pub struct ProgressiveLoader {
    settle_delay: Duration,
    max_reveals: u32,
}

impl ProgressiveLoader {
    pub fn new(settle_delay: Duration, max_reveals: u32) -> Self {
        Self {
            settle_delay,
            max_reveals,
        }
    }

    /// Scroll until convergence or the cap. Never fails the run except on
    /// session loss.
    pub async fn load<S: PageSession>(&self, session: &S) -> Result<LoadReport, AppError> {
        let mut report = LoadReport {
            reveals: 0,
            extent: 0.0,
            stop: LoadStop::Interrupted,
        };

        report.extent = match contain(session.content_extent().await)? {
            Probe::Found(extent) => extent,
            Probe::NotFound | Probe::Fault(_) => {
                tracing::warn!("Could not measure page length; skipping progressive load");
                return Ok(report);
            }
        };

        while report.reveals < self.max_reveals {
            if let Probe::Fault(e) = contain(session.reveal_more().await)? {
                tracing::warn!(error = %e, reveals = report.reveals, "Reveal trigger failed");
                return Ok(report);
            }
            report.reveals += 1;
            tokio::time::sleep(self.settle_delay).await;

            let extent = match contain(session.content_extent().await)? {
                Probe::Found(extent) => extent,
                Probe::NotFound | Probe::Fault(_) => {
                    tracing::warn!(reveals = report.reveals, "Lost track of page length");
                    return Ok(report);
                }
            };

            if extent == report.extent {
                report.stop = LoadStop::Converged;
                tracing::info!(reveals = report.reveals, extent, "Content fully loaded");
                return Ok(report);
            }
            report.extent = extent;

            if report.reveals % 5 == 0 {
                tracing::info!("Scrolled {} times...", report.reveals);
            }
        }

        report.stop = LoadStop::CapReached;
        tracing::warn!(
            reveals = report.reveals,
            "Reveal cap reached before content stopped growing"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockSession;

    fn loader() -> ProgressiveLoader {
        ProgressiveLoader::new(Duration::ZERO, 50)
    }

    #[tokio::test]
    async fn stops_on_first_non_growing_iteration() {
        let page = MockSession::new();
        page.with_extents(&[100.0, 200.0, 300.0, 300.0]);

        let report = loader().load(&page).await.unwrap();

        assert_eq!(page.reveals(), 3);
        assert_eq!(report.reveals, 3);
        assert_eq!(report.stop, LoadStop::Converged);
        assert_eq!(report.extent, 300.0);
    }

    #[tokio::test]
    async fn static_page_needs_one_reveal() {
        let page = MockSession::new();
        page.with_extents(&[800.0]);

        let report = loader().load(&page).await.unwrap();
        assert_eq!(report.reveals, 1);
        assert_eq!(report.stop, LoadStop::Converged);
    }

    #[tokio::test]
    async fn never_exceeds_cap() {
        let page = MockSession::new();
        page.with_growing_extent();

        let report = loader().load(&page).await.unwrap();

        assert_eq!(page.reveals(), 50);
        assert_eq!(report.stop, LoadStop::CapReached);
        assert_eq!(page.extent_calls(), 51);
    }

    #[tokio::test]
    async fn custom_cap() {
        let page = MockSession::new();
        page.with_growing_extent();

        let report = ProgressiveLoader::new(Duration::ZERO, 3)
            .load(&page)
            .await
            .unwrap();
        assert_eq!(report.reveals, 3);
    }

    #[tokio::test]
    async fn session_loss_propagates() {
        let page = MockSession::new();
        page.lose_session();

        let err = loader().load(&page).await.unwrap_err();
        assert!(matches!(err, AppError::SessionUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn settles_between_reveals() {
        let page = MockSession::new();
        page.with_extents(&[100.0, 200.0, 200.0]);

        let started = tokio::time::Instant::now();
        ProgressiveLoader::new(Duration::from_millis(1500), 50)
            .load(&page)
            .await
            .unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(3000));
        assert!(waited < Duration::from_millis(3100));
    }
}
