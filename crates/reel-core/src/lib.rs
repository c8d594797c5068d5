pub mod artifact;
pub mod boundary;
pub mod config;
pub mod error;
pub mod loader;
pub mod locator;
pub mod models;
pub mod pipeline;
pub mod records;
pub mod strategy;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::ExtractionConfig;
pub use error::AppError;
pub use models::{ExtractionResult, Locator, Outcome, Record, Target};
pub use pipeline::ExtractionService;
pub use strategy::Strategy;
pub use traits::{PageSession, Scope};
