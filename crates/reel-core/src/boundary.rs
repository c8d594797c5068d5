//! Exclusion-zone detection.
//!
//! Some collection pages append a section of suggested rows below the real
//! list. The section is introduced by a marker element; everything at or
//! below the marker's vertical position is not part of the collection.

use crate::error::AppError;
use crate::locator::{contain, resolve_element};
use crate::models::{Boundary, Locator, Mention, Probe, Target};
use crate::traits::{PageSession, Scope};

/// Build the marker target for `word`: a heading mentioning it, a container
/// whose `aria-label` mentions it, then any element whose text mentions it.
/// Matching is case-insensitive.
pub fn marker_target(word: &str) -> Result<Target, AppError> {
    let word = word.trim();
    if word.is_empty() || word.contains('\'') {
        return Err(AppError::StrategyError(format!(
            "boundary marker '{word}' must be non-empty and free of quotes"
        )));
    }
    let (upper, lower) = case_pairs(word);
    let needle = word.to_lowercase();
    let folded = |subject: &str| {
        format!("contains(translate({subject}, '{upper}', '{lower}'), '{needle}')")
    };

    Ok(Target::new(
        "boundary",
        vec![
            Locator::xpath(format!("//h2[{}]", folded("text()"))),
            Locator::xpath(format!("//div[{}]", folded("@aria-label"))),
            Locator::xpath(format!("//*[{}]", folded("text()"))),
        ],
    )
    .with_mention(Mention::new(needle).or_attribute("aria-label")))
}

/// `translate()` tables mapping each cased character of `word` to its lower
/// case. Characters whose case mapping is not one-to-one (`ß` → `SS`) are left
/// out so both tables stay the same length.
fn case_pairs(word: &str) -> (String, String) {
    let mut upper = String::new();
    let mut lower = String::new();
    for c in word.chars() {
        let (mut up, mut low) = (c.to_uppercase(), c.to_lowercase());
        if let (Some(u), None, Some(l), None) = (up.next(), up.next(), low.next(), low.next())
            && u != l
        {
            upper.push(u);
            lower.push(l);
        }
    }
    (upper, lower)
}

/// Find the exclusion marker and snapshot its position.
///
/// Absence of the marker, or an unreadable position, means "no boundary".
pub async fn detect_boundary<S: PageSession>(
    session: &S,
    target: &Target,
) -> Result<Option<Boundary>, AppError> {
    let marker = match resolve_element(session, Scope::Document, target).await? {
        Probe::Found(marker) => marker,
        Probe::NotFound => {
            tracing::debug!("No exclusion marker on page");
            return Ok(None);
        }
        Probe::Fault(e) => {
            tracing::warn!(error = %e, "Exclusion marker lookup faulted; assuming none");
            return Ok(None);
        }
    };

    match contain(session.vertical_offset(&marker).await)? {
        Probe::Found(y) => {
            tracing::info!(y, "Found exclusion marker - rows below it will be skipped");
            Ok(Some(Boundary { y }))
        }
        Probe::NotFound => Ok(None),
        Probe::Fault(e) => {
            tracing::warn!(error = %e, "Could not read exclusion marker position; assuming none");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockSession;

    #[test]
    fn test_marker_target_shape() {
        let t = marker_target("Recommended").unwrap();
        assert_eq!(t.locators.len(), 3);
        assert_eq!(
            t.locators[0].expr,
            "//h2[contains(translate(text(), 'RECOMMENDED', 'recommended'), 'recommended')]"
        );
        assert_eq!(
            t.locators[1].expr,
            "//div[contains(translate(@aria-label, 'RECOMMENDED', 'recommended'), 'recommended')]"
        );
        assert!(t.locators[2].expr.starts_with("//*["));
    }

    #[test]
    fn test_marker_target_folds_non_ascii_per_char() {
        let t = marker_target("Straße").unwrap();
        assert_eq!(
            t.locators[0].expr,
            "//h2[contains(translate(text(), 'STRAE', 'strae'), 'straße')]"
        );

        let t = marker_target("Empfehlungen für dich").unwrap();
        let (upper, lower) = case_pairs("Empfehlungen für dich");
        assert_eq!(upper.chars().count(), lower.chars().count());
        assert!(upper.contains('Ü') && lower.contains('ü'));
        assert!(t.locators[1].expr.ends_with("'empfehlungen für dich')]"));
    }

    #[test]
    fn test_marker_target_rejects_quotes() {
        assert!(marker_target("don't").is_err());
        assert!(marker_target("  ").is_err());
    }

    #[tokio::test]
    async fn absent_marker_is_no_boundary() {
        let page = MockSession::new();
        let t = marker_target("recommended").unwrap();
        assert_eq!(detect_boundary(&page, &t).await.unwrap(), None);
    }

    #[tokio::test]
    async fn heading_marker_sets_cutoff() {
        let page = MockSession::new();
        let heading = page.node("Recommended", 2500.0);
        let t = marker_target("recommended").unwrap();
        page.on(&t.locators[0].expr, &[heading]);

        assert_eq!(
            detect_boundary(&page, &t).await.unwrap(),
            Some(Boundary { y: 2500.0 })
        );
    }

    #[tokio::test]
    async fn aria_label_marker_sets_cutoff() {
        let page = MockSession::new();
        let section = page.node("", 1800.0);
        page.set_attr(section, "aria-label", "Recommended based on this playlist");
        let t = marker_target("recommended").unwrap();
        page.on(&t.locators[1].expr, &[section]);

        assert_eq!(
            detect_boundary(&page, &t).await.unwrap(),
            Some(Boundary { y: 1800.0 })
        );
    }

    #[tokio::test]
    async fn unreadable_position_is_no_boundary() {
        let page = MockSession::new();
        let heading = page.node("Recommended", 0.0);
        page.fault_offset(heading);
        let t = marker_target("recommended").unwrap();
        page.on(&t.locators[0].expr, &[heading]);

        assert_eq!(detect_boundary(&page, &t).await.unwrap(), None);
    }

    #[tokio::test]
    async fn faulting_lookup_is_no_boundary() {
        let page = MockSession::new();
        let t = marker_target("recommended").unwrap();
        for l in &t.locators {
            page.fault_on(&l.expr);
        }
        assert_eq!(detect_boundary(&page, &t).await.unwrap(), None);
    }
}
