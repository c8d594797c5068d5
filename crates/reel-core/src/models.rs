use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Query language a [`Locator`] expression is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    Css,
    #[serde(rename = "xpath")]
    XPath,
}

/// One structural hypothesis for finding a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub language: QueryLanguage,
    pub expr: String,
    /// Which match to take when the expression resolves to several elements.
    #[serde(default)]
    pub pick: usize,
}

impl Locator {
    pub fn css(expr: impl Into<String>) -> Self {
        Self {
            language: QueryLanguage::Css,
            expr: expr.into(),
            pick: 0,
        }
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self {
            language: QueryLanguage::XPath,
            expr: expr.into(),
            pick: 0,
        }
    }

    /// Take the `index`-th match (0-based) instead of the first.
    pub fn nth(mut self, index: usize) -> Self {
        self.pick = index;
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lang = match self.language {
            QueryLanguage::Css => "css",
            QueryLanguage::XPath => "xpath",
        };
        if self.pick == 0 {
            write!(f, "{lang}:{}", self.expr)
        } else {
            write!(f, "{lang}:{}[{}]", self.expr, self.pick)
        }
    }
}

/// Case-insensitive substring requirement on an element's text or attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub word: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Mention {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            attributes: Vec::new(),
        }
    }

    pub fn or_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    pub fn found_in(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.word.to_lowercase())
    }
}

/// A logical target described by an ordered list of locators.
///
/// Locators are tried in declared order, most specific first. Resolved text
/// equal to an entry of `denylist` is treated as a miss, as is a matched
/// element that does not satisfy `mention`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub locators: Vec<Locator>,
    #[serde(default)]
    pub denylist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<Mention>,
}

impl Target {
    pub fn new(name: impl Into<String>, locators: Vec<Locator>) -> Self {
        Self {
            name: name.into(),
            locators,
            denylist: Vec::new(),
            mention: None,
        }
    }

    pub fn with_mention(mut self, mention: Mention) -> Self {
        self.mention = Some(mention);
        self
    }

    pub fn with_denylist<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Empty (after trimming) and denylisted text are never acceptable.
    pub fn accepts(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty() && !self.denylist.iter().any(|d| d == text)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.locators.is_empty() {
            return Err(AppError::StrategyError(format!(
                "target '{}' has no locators",
                self.name
            )));
        }
        if let Some(l) = self.locators.iter().find(|l| l.expr.trim().is_empty()) {
            return Err(AppError::StrategyError(format!(
                "target '{}' has an empty {:?} expression",
                self.name, l.language
            )));
        }
        Ok(())
    }
}

/// Outcome of one resolution attempt.
///
/// `NotFound` is an expected miss; `Fault` means the underlying query
/// mechanism misbehaved. The two are never conflated.
#[derive(Debug)]
pub enum Probe<T> {
    Found(T),
    NotFound,
    Fault(AppError),
}

impl<T> Probe<T> {
    /// Collapse to an `Option`, treating faults as absence.
    pub fn found(self) -> Option<T> {
        match self {
            Probe::Found(v) => Some(v),
            Probe::NotFound | Probe::Fault(_) => None,
        }
    }
}

/// Vertical cutoff of the exclusion zone, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub y: f64,
}

impl Boundary {
    /// A row at or below the marker is past the boundary.
    pub fn excludes(&self, row_y: f64) -> bool {
        row_y >= self.y
    }
}

/// One extracted member of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub primary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

impl Record {
    /// Builds a record, or `None` if the primary text is empty.
    pub fn new(primary: impl Into<String>, secondary: Option<String>) -> Option<Self> {
        let primary = primary.into().trim().to_string();
        if primary.is_empty() {
            return None;
        }
        let secondary = secondary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Some(Self { primary, secondary })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary {
            Some(secondary) => write!(f, "{} - {}", self.primary, secondary),
            None => f.write_str(&self.primary),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The collection could not be identified at all.
    Failed,
    /// The collection was identified but no rows resolved.
    Empty,
    /// The collection was identified and rows were walked.
    Done,
}

/// Final product of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    title: Option<String>,
    records: Vec<Record>,
    #[serde(skip)]
    rows_resolved: bool,
}

impl ExtractionResult {
    pub fn failed() -> Self {
        Self {
            title: None,
            records: Vec::new(),
            rows_resolved: false,
        }
    }

    pub fn empty(title: String) -> Self {
        Self {
            title: Some(title),
            records: Vec::new(),
            rows_resolved: false,
        }
    }

    pub fn done(title: String, records: Vec<Record>) -> Self {
        Self {
            title: Some(title),
            records,
            rows_resolved: true,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn outcome(&self) -> Outcome {
        match (&self.title, self.rows_resolved) {
            (None, _) => Outcome::Failed,
            (Some(_), false) => Outcome::Empty,
            (Some(_), true) => Outcome::Done,
        }
    }

    /// True when there is something worth persisting.
    pub fn has_records(&self) -> bool {
        self.title.is_some() && !self.records.is_empty()
    }
}
