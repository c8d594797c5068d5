//! Declarative locator tables for one page shape.
//!
//! Markup churn is absorbed here: when a release renames a test id, a new
//! hypothesis is added in front of the old ones, either in code or in a JSON
//! strategy file loaded at runtime.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::boundary::marker_target;
use crate::error::AppError;
use crate::models::{Locator, Target};

/// Everything the pipeline needs to know about where things live on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Collection header.
    pub title: Target,
    /// Separator of the document title used by the last-resort title fallback.
    #[serde(default = "default_title_separator")]
    pub title_separator: String,
    /// Row elements, collection mode.
    pub rows: Target,
    /// Primary field, resolved inside each row.
    pub primary: Target,
    /// Secondary field, resolved inside each row.
    pub secondary: Target,
    /// Word introducing the exclusion zone; `None` disables boundary detection.
    #[serde(default)]
    pub boundary_marker: Option<String>,
}

fn default_title_separator() -> String {
    " - ".to_string()
}

impl Strategy {
    /// Locator tables for a music-streaming playlist page.
    pub fn playlist() -> Self {
        Self {
            title: Target::new(
                "title",
                vec![
                    Locator::css("div[data-testid='playlist-page'] h1"),
                    Locator::css("div[data-testid='entity-page'] h1"),
                    Locator::css("h1[data-encore-id='type']"),
                    Locator::css("div.main-view-container h1"),
                    Locator::css("section[data-testid='playlist-page'] h1"),
                ],
            )
            .with_denylist(["Your Library", "Library"]),
            title_separator: default_title_separator(),
            rows: Target::new(
                "rows",
                vec![
                    Locator::css("div[data-testid='tracklist-row']"),
                    Locator::css("div[data-testid='playlist-tracklist'] div[role='row']"),
                    Locator::css("div.tracklist-row"),
                ],
            ),
            primary: Target::new(
                "primary",
                vec![
                    Locator::css(
                        "div[data-testid='tracklist-row'] a[data-testid='internal-track-link']",
                    ),
                    Locator::css("a[data-testid='internal-track-link']"),
                ],
            ),
            secondary: Target::new(
                "secondary",
                vec![
                    Locator::css("span[data-testid='internal-track-link'] a"),
                    Locator::css("a").nth(1),
                ],
            ),
            boundary_marker: Some("recommended".to_string()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let strategy: Self = serde_json::from_str(json)?;
        strategy.validate()?;
        Ok(strategy)
    }

    /// Load and validate a strategy file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| match e {
            AppError::SerializationError(inner) => {
                AppError::StrategyError(format!("{}: {inner}", path.display()))
            }
            other => other,
        })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for target in [&self.title, &self.rows, &self.primary, &self.secondary] {
            target.validate()?;
        }
        if self.title_separator.is_empty() {
            return Err(AppError::StrategyError(
                "title_separator must not be empty".into(),
            ));
        }
        self.boundary_target().map(|_| ())
    }

    /// Marker target derived from `boundary_marker`.
    pub fn boundary_target(&self) -> Result<Option<Target>, AppError> {
        self.boundary_marker
            .as_deref()
            .map(marker_target)
            .transpose()
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::playlist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryLanguage;

    #[test]
    fn test_playlist_strategy_is_valid() {
        let s = Strategy::playlist();
        s.validate().unwrap();
        assert!(s.title.denylist.contains(&"Your Library".to_string()));
        assert_eq!(s.secondary.locators[1].pick, 1);
        assert!(s.boundary_target().unwrap().is_some());
    }

    #[test]
    fn test_json_round_trip_keeps_tables() {
        let s = Strategy::playlist();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(Strategy::from_json(&json).unwrap(), s);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "title": {"name": "title", "locators": [{"language": "css", "expr": "h1"}]},
            "rows": {"name": "rows", "locators": [{"language": "css", "expr": "li"}]},
            "primary": {"name": "primary", "locators": [{"language": "css", "expr": "b"}]},
            "secondary": {"name": "secondary", "locators": [{"language": "css", "expr": "i"}]}
        }"#;
        let s = Strategy::from_json(json).unwrap();
        assert_eq!(s.title_separator, " - ");
        assert_eq!(s.boundary_marker, None);
        assert!(s.boundary_target().unwrap().is_none());
    }

    #[test]
    fn test_xpath_row_fields_load() {
        let mut s = Strategy::playlist();
        s.primary = Target::new(
            "primary",
            vec![Locator::xpath(".//a[@data-testid='internal-track-link']")],
        );
        let json = serde_json::to_string(&s).unwrap();

        let loaded = Strategy::from_json(&json).unwrap();
        assert_eq!(loaded.primary.locators[0].language, QueryLanguage::XPath);
    }

    #[test]
    fn test_json_without_locators_rejected() {
        let json = r#"{
            "title": {"name": "title", "locators": []},
            "rows": {"name": "rows", "locators": [{"language": "css", "expr": "li"}]},
            "primary": {"name": "primary", "locators": [{"language": "css", "expr": "b"}]},
            "secondary": {"name": "secondary", "locators": [{"language": "css", "expr": "i"}]}
        }"#;
        let err = Strategy::from_json(json).unwrap_err();
        assert!(matches!(err, AppError::StrategyError(_)));
    }

    #[test]
    fn test_load_reports_path_on_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Strategy::load(&path).unwrap_err();
        assert!(matches!(err, AppError::StrategyError(_)));
        assert!(err.to_string().contains("broken.json"));
    }
}
