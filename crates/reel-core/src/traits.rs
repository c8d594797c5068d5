use std::future::Future;

use crate::error::AppError;
use crate::models::Locator;

/// Where a query is evaluated.
pub enum Scope<'a, E> {
    /// The whole document.
    Document,
    /// The subtree rooted at one element.
    Within(&'a E),
}

impl<E> Clone for Scope<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Scope<'_, E> {}

/// Capabilities the extraction pipeline needs from a live rendered page.
///
/// The pipeline never creates, navigates or closes the page; it borrows an
/// already-positioned session for the duration of one run.
///
/// Errors for which [`AppError::is_session_fatal`] is true abort the run.
/// Any other error is treated as a local fault of that one query.
pub trait PageSession: Send + Sync {
    type Element: Send + Sync;

    /// All elements matching `locator` within `scope`, in document order.
    /// No match is `Ok(vec![])`, not an error.
    fn query(
        &self,
        scope: Scope<'_, Self::Element>,
        locator: &Locator,
    ) -> impl Future<Output = Result<Vec<Self::Element>, AppError>> + Send;

    /// Rendered text of an element.
    fn text(&self, element: &Self::Element)
    -> impl Future<Output = Result<String, AppError>> + Send;

    /// Value of an attribute, if present.
    fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    /// Vertical offset of the element's top edge from the top of the document.
    fn vertical_offset(
        &self,
        element: &Self::Element,
    ) -> impl Future<Output = Result<f64, AppError>> + Send;

    /// Total scrollable length of the document.
    fn content_extent(&self) -> impl Future<Output = Result<f64, AppError>> + Send;

    /// Ask the page to render more lazily-loaded content (scroll to bottom).
    fn reveal_more(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// The document title, if any.
    fn page_title(&self) -> impl Future<Output = Result<Option<String>, AppError>> + Send;
}
