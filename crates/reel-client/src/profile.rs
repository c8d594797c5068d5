//! Discovery of an existing Chrome/Chromium user data dir.
//!
//! Reusing the profile of the user's everyday browser lets the session see
//! collections that are only visible when logged in.

use std::path::{Path, PathBuf};

/// Chrome writes this symlink while a profile is open.
const LOCK_FILE: &str = "SingletonLock";

/// Find a user data dir to reuse.
///
/// `explicit` (from `--profile` / `REEL_PROFILE_DIR`) wins if it exists;
/// otherwise the standard per-user Chrome and Chromium locations are tried.
pub fn find_profile_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_dir() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("Profile dir {} does not exist; ignoring", path.display());
    }

    let config = dirs::config_dir()?;
    first_existing(&[
        config.join("google-chrome"),
        config.join("chromium"),
        config.join("Google").join("Chrome"),
        config.join("Chromium"),
    ])
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_dir()).cloned()
}

/// Whether another browser currently holds the profile.
pub fn profile_in_use(profile: &Path) -> bool {
    std::fs::symlink_metadata(profile.join(LOCK_FILE)).is_ok()
}
