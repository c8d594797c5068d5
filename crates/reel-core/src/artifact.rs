//! Persisting an extraction result to disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::Record;

/// Folder name used when a title sanitizes to nothing.
pub const PLACEHOLDER_NAME: &str = "Untitled_Collection";

const MAX_NAME_CHARS: usize = 200;
const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactFormat {
    #[default]
    Text,
    Json,
}

impl ArtifactFormat {
    fn file_name(self) -> &'static str {
        match self {
            ArtifactFormat::Text => "records.txt",
            ArtifactFormat::Json => "records.json",
        }
    }
}

/// Derive a filesystem-safe folder name from a collection title.
///
/// Illegal characters are dropped (not replaced), leading/trailing dots and
/// spaces trimmed, and the result capped at 200 characters.
pub fn sanitize_name(title: &str) -> String {
    let stripped: String = title.chars().filter(|c| !ILLEGAL.contains(c)).collect();
    let capped: String = stripped
        .trim_matches(|c| c == '.' || c == ' ')
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();
    if capped.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        capped
    }
}

/// Plain-text listing: header, rule, then one numbered line per record.
pub fn render_text(title: &str, records: &[Record]) -> String {
    let mut out = format!(
        "Collection: {title}\nTotal Records: {}\n{}\n\n",
        records.len(),
        "=".repeat(50)
    );
    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!("{}. {record}\n", i + 1));
    }
    out
}

#[derive(Serialize)]
struct JsonArtifact<'a> {
    title: &'a str,
    total: usize,
    extracted_at: DateTime<Utc>,
    records: &'a [Record],
}

pub fn render_json(title: &str, records: &[Record]) -> Result<String, AppError> {
    let doc = JsonArtifact {
        title,
        total: records.len(),
        extracted_at: Utc::now(),
        records,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Write `records.txt` (or `.json`) into `<root>/<sanitized title>/`,
/// creating the folder if needed. Returns the written file's path.
pub fn write_artifact(
    root: &Path,
    title: &str,
    records: &[Record],
    format: ArtifactFormat,
) -> Result<PathBuf, AppError> {
    let folder = root.join(sanitize_name(title));
    std::fs::create_dir_all(&folder)?;
    tracing::info!("Created folder: {}", folder.display());

    let body = match format {
        ArtifactFormat::Text => render_text(title, records),
        ArtifactFormat::Json => render_json(title, records)?,
    };
    let path = folder.join(format.file_name());
    std::fs::write(&path, body)?;

    tracing::info!("Saved {} records to: {}", records.len(), path.display());
    Ok(path)
}
