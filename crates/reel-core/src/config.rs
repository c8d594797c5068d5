use std::time::Duration;

use crate::error::AppError;

/// Timing knobs for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Pause after each reveal trigger so asynchronous rendering can land.
    pub settle_delay: Duration,
    /// Upper bound on reveal triggers per run.
    pub max_reveals: u32,
    /// How long a singular document-level locator is polled before the
    /// chain moves on to the next one.
    pub wait_timeout: Duration,
    /// Delay between polls while waiting.
    pub poll_interval: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
            max_reveals: 50,
            wait_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl ExtractionConfig {
    /// Read configuration from environment variables, falling back to
    /// [`Default`] for anything unset.
    ///
    /// - `REEL_SETTLE_MS`
    /// - `REEL_MAX_REVEALS` (at least 1)
    /// - `REEL_WAIT_TIMEOUT_SECS`
    /// - `REEL_POLL_MS` (at least 1)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let settle_delay = match lookup("REEL_SETTLE_MS") {
            None => defaults.settle_delay,
            Some(raw) => Duration::from_millis(parse_u64("REEL_SETTLE_MS", &raw)?),
        };

        let max_reveals = match lookup("REEL_MAX_REVEALS") {
            None => defaults.max_reveals,
            Some(raw) => {
                let parsed: u32 = raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid REEL_MAX_REVEALS '{raw}': must be a positive integer"
                    ))
                })?;
                if parsed == 0 {
                    return Err(AppError::ConfigError(
                        "REEL_MAX_REVEALS must be at least 1".into(),
                    ));
                }
                parsed
            }
        };

        let wait_timeout = match lookup("REEL_WAIT_TIMEOUT_SECS") {
            None => defaults.wait_timeout,
            Some(raw) => Duration::from_secs(parse_u64("REEL_WAIT_TIMEOUT_SECS", &raw)?),
        };

        let poll_interval = match lookup("REEL_POLL_MS") {
            None => defaults.poll_interval,
            Some(raw) => {
                let ms = parse_u64("REEL_POLL_MS", &raw)?;
                if ms == 0 {
                    return Err(AppError::ConfigError(
                        "REEL_POLL_MS must be at least 1".into(),
                    ));
                }
                Duration::from_millis(ms)
            }
        };

        Ok(Self {
            settle_delay,
            max_reveals,
            wait_timeout,
            poll_interval,
        })
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid {key} '{raw}': must be a non-negative integer"
        ))
    })
}
