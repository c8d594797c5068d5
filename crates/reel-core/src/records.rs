//! Row walking and record assembly.

use crate::error::AppError;
use crate::locator::{WaitPolicy, contain, resolve_text};
use crate::models::{Boundary, Probe, Record, Target};
use crate::traits::{PageSession, Scope};

/// Per-row field targets, resolved inside each row's subtree.
#[derive(Debug, Clone)]
pub struct RowFields<'a> {
    pub primary: &'a Target,
    pub secondary: &'a Target,
}

/// Turn resolved rows into records, in document order.
///
/// Iteration stops at the first row at or below `boundary`: rows are laid out
/// top to bottom, so nothing after it can belong to the collection. A row
/// that faults is dropped and the walk continues. No deduplication.
pub async fn extract_records<S: PageSession>(
    session: &S,
    rows: &[S::Element],
    boundary: Option<Boundary>,
    fields: &RowFields<'_>,
) -> Result<Vec<Record>, AppError> {
    let mut records = Vec::with_capacity(rows.len());

    for (idx, row) in rows.iter().enumerate() {
        let ordinal = idx + 1;

        if let Some(boundary) = boundary {
            match contain(session.vertical_offset(row).await)? {
                Probe::Found(y) if boundary.excludes(y) => {
                    tracing::info!("Stopping at row {ordinal} - reached exclusion zone");
                    break;
                }
                Probe::Found(_) => {}
                Probe::NotFound => continue,
                Probe::Fault(e) => {
                    tracing::warn!(row = ordinal, error = %e, "Skipping row with unreadable position");
                    continue;
                }
            }
        }

        match extract_row(session, row, fields).await? {
            Probe::Found(record) => {
                records.push(record);
                if ordinal % 10 == 0 {
                    tracing::info!("Extracted {ordinal} rows...");
                }
            }
            Probe::NotFound => {
                tracing::debug!(row = ordinal, "Row has no primary text");
            }
            Probe::Fault(e) => {
                tracing::warn!(row = ordinal, error = %e, "Skipping unreadable row");
            }
        }
    }

    tracing::info!("Successfully extracted {} records", records.len());
    Ok(records)
}

async fn extract_row<S: PageSession>(
    session: &S,
    row: &S::Element,
    fields: &RowFields<'_>,
) -> Result<Probe<Record>, AppError> {
    let scope = Scope::Within(row);

    let primary = match resolve_text(session, scope, fields.primary, WaitPolicy::immediate()).await? {
        Probe::Found(text) => text,
        Probe::NotFound => return Ok(Probe::NotFound),
        Probe::Fault(e) => return Ok(Probe::Fault(e)),
    };

    let secondary =
        match resolve_text(session, scope, fields.secondary, WaitPolicy::immediate()).await? {
            Probe::Found(text) => Some(text),
            Probe::NotFound => None,
            Probe::Fault(e) => return Ok(Probe::Fault(e)),
        };

    Ok(match Record::new(primary, secondary) {
        Some(record) => Probe::Found(record),
        None => Probe::NotFound,
    })
}
