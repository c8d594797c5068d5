//! Locator strategy chain.
//!
//! A [`Target`] lists several independent hypotheses for where one logical
//! thing lives in the page. The chain tries them in declared order and takes
//! the first plausible hit. A miss moves on to the next hypothesis; a local
//! query fault does too, but is remembered so an exhausted chain can report
//! [`Probe::Fault`] instead of [`Probe::NotFound`]. Only session-fatal errors
//! leave the chain as `Err`.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::AppError;
use crate::models::{Locator, Mention, Probe, Target};
use crate::traits::{PageSession, Scope};

/// How long a singular locator is polled before it is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    /// Query each locator exactly once.
    pub fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

/// Collection mode: the full match set of the first locator that matches anything.
pub async fn resolve_all<S: PageSession>(
    session: &S,
    scope: Scope<'_, S::Element>,
    target: &Target,
) -> Result<Probe<Vec<S::Element>>, AppError> {
    let mut misses = Misses::default();
    for locator in &target.locators {
        match query_once(session, scope, locator).await? {
            Probe::Found(elements) => {
                tracing::debug!(name = %target.name, %locator, count = elements.len(), "Matched");
                return Ok(Probe::Found(elements));
            }
            other => misses.record(target, locator, other),
        }
    }
    Ok(misses.finish(target))
}

/// Singular element mode: the picked match of the first locator that matches.
pub async fn resolve_element<S: PageSession>(
    session: &S,
    scope: Scope<'_, S::Element>,
    target: &Target,
) -> Result<Probe<S::Element>, AppError> {
    let mut misses = Misses::default();
    for locator in &target.locators {
        let probe = match query_once(session, scope, locator).await? {
            Probe::Found(elements) => pick(elements, locator),
            Probe::NotFound => Probe::NotFound,
            Probe::Fault(e) => Probe::Fault(e),
        };
        let element = match probe {
            Probe::Found(element) => element,
            other => {
                misses.record(target, locator, other);
                continue;
            }
        };

        let confirmed = match &target.mention {
            None => Probe::Found(true),
            Some(mention) => mentions(session, &element, mention).await?,
        };
        match confirmed {
            Probe::Found(true) => {
                tracing::debug!(name = %target.name, %locator, "Matched");
                return Ok(Probe::Found(element));
            }
            Probe::Found(false) => {
                tracing::debug!(name = %target.name, %locator, "Match does not mention marker");
            }
            other => misses.record(target, locator, other),
        }
    }
    Ok(misses.finish(target))
}

/// Singular text mode: the trimmed text of the first picked match whose text
/// is non-empty and not denylisted.
///
/// Each locator is polled according to `wait` until it matches; a match whose
/// text is rejected is abandoned straight away.
pub async fn resolve_text<S: PageSession>(
    session: &S,
    scope: Scope<'_, S::Element>,
    target: &Target,
    wait: WaitPolicy,
) -> Result<Probe<String>, AppError> {
    let mut misses = Misses::default();
    for locator in &target.locators {
        let element = match query_waiting(session, scope, locator, wait).await? {
            Probe::Found(elements) => pick(elements, locator),
            Probe::NotFound => Probe::NotFound,
            Probe::Fault(e) => Probe::Fault(e),
        };
        let element = match element {
            Probe::Found(element) => element,
            other => {
                misses.record(target, locator, other);
                continue;
            }
        };

        match contain(session.text(&element).await)? {
            Probe::Found(text) => {
                let text = text.trim();
                if target.accepts(text) {
                    tracing::debug!(name = %target.name, %locator, "Matched");
                    return Ok(Probe::Found(text.to_string()));
                }
                tracing::debug!(name = %target.name, %locator, text, "Rejected text");
            }
            other => misses.record(target, locator, other),
        }
    }
    Ok(misses.finish(target))
}

/// First segment of a page title such as `"Road Trip - playlist by someone | Site"`.
///
/// `None` unless the separator occurs and the segment is non-empty.
pub fn split_page_title<'a>(raw: &'a str, separator: &str) -> Option<&'a str> {
    let (head, _) = raw.split_once(separator)?;
    let head = head.trim();
    (!head.is_empty()).then_some(head)
}

/// Lift a session result into a probe, letting session-fatal errors escape.
pub(crate) fn contain<T>(result: Result<T, AppError>) -> Result<Probe<T>, AppError> {
    match result {
        Ok(v) => Ok(Probe::Found(v)),
        Err(e) if e.is_session_fatal() => Err(e),
        Err(e) => Ok(Probe::Fault(e)),
    }
}

async fn query_once<S: PageSession>(
    session: &S,
    scope: Scope<'_, S::Element>,
    locator: &Locator,
) -> Result<Probe<Vec<S::Element>>, AppError> {
    Ok(match contain(session.query(scope, locator).await)? {
        Probe::Found(elements) if elements.is_empty() => Probe::NotFound,
        other => other,
    })
}

async fn query_waiting<S: PageSession>(
    session: &S,
    scope: Scope<'_, S::Element>,
    locator: &Locator,
    wait: WaitPolicy,
) -> Result<Probe<Vec<S::Element>>, AppError> {
    let deadline = Instant::now() + wait.timeout;
    loop {
        let probe = query_once(session, scope, locator).await?;
        if !matches!(probe, Probe::NotFound) || Instant::now() >= deadline {
            return Ok(probe);
        }
        tokio::time::sleep(wait.poll_interval).await;
    }
}

/// Whether the element's text or one of the listed attributes contains the word.
async fn mentions<S: PageSession>(
    session: &S,
    element: &S::Element,
    mention: &Mention,
) -> Result<Probe<bool>, AppError> {
    match contain(session.text(element).await)? {
        Probe::Found(text) if mention.found_in(&text) => return Ok(Probe::Found(true)),
        Probe::Fault(e) => return Ok(Probe::Fault(e)),
        _ => {}
    }
    for name in &mention.attributes {
        match contain(session.attribute(element, name).await)? {
            Probe::Found(Some(value)) if mention.found_in(&value) => {
                return Ok(Probe::Found(true));
            }
            Probe::Fault(e) => return Ok(Probe::Fault(e)),
            _ => {}
        }
    }
    Ok(Probe::Found(false))
}

fn pick<E>(elements: Vec<E>, locator: &Locator) -> Probe<E> {
    match elements.into_iter().nth(locator.pick) {
        Some(element) => Probe::Found(element),
        None => Probe::NotFound,
    }
}

/// Remembers why locators missed so exhaustion can be reported faithfully.
#[derive(Default)]
struct Misses {
    fault: Option<AppError>,
}

impl Misses {
    fn record<T>(&mut self, target: &Target, locator: &Locator, probe: Probe<T>) {
        match probe {
            Probe::Found(_) | Probe::NotFound => {
                tracing::debug!(name = %target.name, %locator, "No match");
            }
            Probe::Fault(e) => {
                tracing::debug!(name = %target.name, %locator, error = %e, "Locator faulted");
                self.fault = Some(e);
            }
        }
    }

    fn finish<T>(self, target: &Target) -> Probe<T> {
        match self.fault {
            Some(e) => Probe::Fault(e),
            None => {
                tracing::debug!(name = %target.name, "All locators exhausted");
                Probe::NotFound
            }
        }
    }
}
