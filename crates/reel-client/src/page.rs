use std::sync::atomic::{AtomicU64, Ordering};

use chromiumoxide::Page;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use reel_core::error::AppError;
use reel_core::models::{Locator, QueryLanguage};
use reel_core::traits::{PageSession, Scope};

const CONTENT_EXTENT_JS: &str = "document.body.scrollHeight";
const REVEAL_MORE_JS: &str = "window.scrollTo(0, document.body.scrollHeight)";
const PAGE_OFFSET_FN: &str =
    "function() { return this.getBoundingClientRect().top + window.scrollY; }";
const HIT_ATTR: &str = "data-reel-hit";

/// One rendered tab, exposed to the extraction pipeline.
pub struct BrowserPage {
    page: Page,
    hits: AtomicU64,
}

impl BrowserPage {
    pub(crate) fn new(page: Page) -> Self {
        Self {
            page,
            hits: AtomicU64::new(0),
        }
    }

    /// Close the tab to free browser resources.
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "Failed to close tab");
        }
    }

    async fn xpath_count(&self, expr: &str) -> Result<f64, AppError> {
        let script = format!(
            "document.evaluate({}, document, null, XPathResult.NUMBER_TYPE, null).numberValue",
            serde_json::to_string(&format!("count({expr})"))?
        );
        Ok(self.page.evaluate(script).await.map_err(map_cdp)?.into_value()?)
    }

    /// XPath relative to `element`. CDP has no element-scoped XPath search, so
    /// the matches are tagged in place, collected by attribute, then untagged.
    async fn xpath_within(&self, element: &Element, expr: &str) -> Result<Vec<Element>, AppError> {
        let token = format!("h{}", self.hits.fetch_add(1, Ordering::Relaxed));
        let tagged = element
            .call_js_fn(tag_xpath_fn(expr, &token)?, false)
            .await
            .map_err(map_cdp)?
            .result
            .value
            .and_then(|v| v.as_u64())
            .ok_or_else(|| AppError::QueryFailed(format!("XPath '{expr}' did not evaluate")))?;
        if tagged == 0 {
            return Ok(Vec::new());
        }

        let found = self
            .page
            .find_elements(format!("[{HIT_ATTR}=\"{token}\"]"))
            .await
            .map_err(map_cdp);
        if let Err(e) = self.page.evaluate(untag_js(&token)?).await {
            tracing::debug!(error = %e, "Failed to clear XPath hit markers");
        }
        found
    }
}

/// Function body run with `this` bound to the scope element. Tags every
/// element match in document order and returns how many were tagged.
fn tag_xpath_fn(expr: &str, token: &str) -> Result<String, AppError> {
    Ok(format!(
        "function() {{ \
            const snap = document.evaluate({expr}, this, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
            let n = 0; \
            for (let i = 0; i < snap.snapshotLength; i++) {{ \
                const node = snap.snapshotItem(i); \
                if (node.nodeType === Node.ELEMENT_NODE) {{ node.setAttribute({attr}, {token}); n++; }} \
            }} \
            return n; \
        }}",
        expr = serde_json::to_string(expr)?,
        attr = serde_json::to_string(HIT_ATTR)?,
        token = serde_json::to_string(token)?,
    ))
}

fn untag_js(token: &str) -> Result<String, AppError> {
    let selector = format!("[{HIT_ATTR}=\"{token}\"]");
    Ok(format!(
        "document.querySelectorAll({}).forEach(e => e.removeAttribute({}))",
        serde_json::to_string(&selector)?,
        serde_json::to_string(HIT_ATTR)?,
    ))
}

impl PageSession for BrowserPage {
    type Element = Element;

    async fn query(
        &self,
        scope: Scope<'_, Element>,
        locator: &Locator,
    ) -> Result<Vec<Element>, AppError> {
        let expr = locator.expr.as_str();
        match (scope, locator.language) {
            (Scope::Document, QueryLanguage::Css) => {
                self.page.find_elements(expr).await.map_err(map_cdp)
            }
            (Scope::Document, QueryLanguage::XPath) => {
                // DOM.performSearch errors out instead of returning nothing,
                // so count first.
                if self.xpath_count(expr).await? == 0.0 {
                    return Ok(Vec::new());
                }
                self.page.find_xpaths(expr).await.map_err(map_cdp)
            }
            (Scope::Within(element), QueryLanguage::Css) => {
                element.find_elements(expr).await.map_err(map_cdp)
            }
            (Scope::Within(element), QueryLanguage::XPath) => {
                self.xpath_within(element, expr).await
            }
        }
    }

    async fn text(&self, element: &Element) -> Result<String, AppError> {
        Ok(element
            .inner_text()
            .await
            .map_err(map_cdp)?
            .unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, AppError> {
        element.attribute(name).await.map_err(map_cdp)
    }

    async fn vertical_offset(&self, element: &Element) -> Result<f64, AppError> {
        let returns = element
            .call_js_fn(PAGE_OFFSET_FN, false)
            .await
            .map_err(map_cdp)?;
        returns
            .result
            .value
            .and_then(|v| v.as_f64())
            .ok_or_else(|| AppError::QueryFailed("element has no layout position".into()))
    }

    async fn content_extent(&self) -> Result<f64, AppError> {
        Ok(self
            .page
            .evaluate(CONTENT_EXTENT_JS)
            .await
            .map_err(map_cdp)?
            .into_value()?)
    }

    async fn reveal_more(&self) -> Result<(), AppError> {
        self.page
            .evaluate(REVEAL_MORE_JS)
            .await
            .map(|_| ())
            .map_err(map_cdp)
    }

    async fn page_title(&self) -> Result<Option<String>, AppError> {
        self.page.get_title().await.map_err(map_cdp)
    }
}

/// Connection-level CDP failures mean the session is gone; everything else is
/// a fault of the one call.
pub(crate) fn map_cdp(e: CdpError) -> AppError {
    match e {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            AppError::SessionUnavailable(e.to_string())
        }
        other => AppError::QueryFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_session_fatal() {
        assert!(map_cdp(CdpError::NoResponse).is_session_fatal());
    }

    #[test]
    fn test_other_errors_are_local_faults() {
        let err = map_cdp(CdpError::ChromeMessage("No node with given id found".into()));
        assert!(matches!(err, AppError::QueryFailed(_)));
        assert!(!err.is_session_fatal());
    }

    #[test]
    fn test_scoped_xpath_is_evaluated_against_the_element() {
        let js = tag_xpath_fn(".//a[@data-testid='internal-track-link']", "h7").unwrap();
        assert!(js.contains(r#"document.evaluate(".//a[@data-testid='internal-track-link']", this,"#));
        assert!(js.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        assert!(js.contains(r#"node.setAttribute("data-reel-hit", "h7")"#));
    }

    #[test]
    fn test_scoped_xpath_quotes_are_escaped() {
        let js = tag_xpath_fn(r#".//a[text()="x"]"#, "h0").unwrap();
        assert!(js.contains(r#"document.evaluate(".//a[text()=\"x\"]", this,"#));
    }

    #[test]
    fn test_untag_clears_only_one_query() {
        let js = untag_js("h3").unwrap();
        assert_eq!(
            js,
            r#"document.querySelectorAll("[data-reel-hit=\"h3\"]").forEach(e => e.removeAttribute("data-reel-hit"))"#
        );
    }
}
