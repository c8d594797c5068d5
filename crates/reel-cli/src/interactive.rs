//! Prompt loop: ask for a URL, extract, save, ask whether to go again.

use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use reel_core::{ExtractionResult, Outcome};

pub(crate) const EMPTY_REASONS: &str = "Warning: No records found in collection

Possible reasons:
  - The collection is private
  - The page structure has changed
  - The page didn't load completely";

const RULE: &str = "============================================================";

/// The two things a prompt loop needs from a run: extract a URL, persist a
/// result.
pub(crate) trait Collector {
    fn extract(&self, url: &str) -> impl Future<Output = Result<ExtractionResult>>;

    fn save(&self, result: &ExtractionResult) -> Result<PathBuf>;
}

/// What the user should be asked after one run.
#[derive(Debug, PartialEq, Eq)]
enum Next {
    /// Something went wrong; offer a retry.
    Retry(String),
    /// Saved; offer another collection.
    Another,
}

pub(crate) async fn run<C: Collector, R: BufRead, W: Write>(
    runner: &C,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{RULE}\nreel - collection extractor\n{RULE}")?;

    loop {
        let Some(url) = prompt(input, out, "\nEnter collection URL: ")? else {
            break;
        };
        if url.is_empty() {
            writeln!(out, "Error: No URL provided")?;
            continue;
        }

        let next = match runner.extract(&url).await {
            Ok(result) => match verdict(&result) {
                Some(message) => Next::Retry(message),
                None => match runner.save(&result) {
                    Ok(path) => {
                        writeln!(
                            out,
                            "\n{RULE}\nSUCCESS!\nCollection: {}\nRecords saved to: {}\n{RULE}",
                            result.title().unwrap_or_default(),
                            path.display()
                        )?;
                        Next::Another
                    }
                    Err(e) => Next::Retry(format!("Error: could not save collection: {e:#}")),
                },
            },
            Err(e) => {
                tracing::debug!("{e:?}");
                Next::Retry(format!("Error occurred while extracting: {e:#}"))
            }
        };

        let question = match next {
            Next::Retry(message) => {
                writeln!(out, "\n{message}")?;
                "\nWould you like to try another collection? (y/n): "
            }
            Next::Another => "\nWould you like to download another collection? (y/n): ",
        };
        if !confirm(input, out, question)? {
            writeln!(out, "\nExiting...")?;
            break;
        }
    }
    Ok(())
}

/// `None` if the result should be saved, otherwise the message to show.
fn verdict(result: &ExtractionResult) -> Option<String> {
    match result.outcome() {
        Outcome::Failed => Some("Error: Could not identify the collection".to_string()),
        Outcome::Empty | Outcome::Done if !result.has_records() => Some(EMPTY_REASONS.to_string()),
        Outcome::Empty | Outcome::Done => None,
    }
}

/// Print `question` and read one trimmed line; `None` on end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<Option<String>> {
    write!(out, "{question}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Only an explicit `y` continues.
fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<bool> {
    Ok(prompt(input, out, question)?.is_some_and(|a| a.eq_ignore_ascii_case("y")))
}
