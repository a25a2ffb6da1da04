//! Where the kiosk keeps its data on disk.
//!
//! The root is `<data-local>/evote-kiosk`. Several booths sharing one
//! machine (rehearsals, training rooms) each set `EV_PROFILE` and get
//! `<data-local>/evote-kiosk-<profile>` instead.

use std::path::PathBuf;

use ev_core::{
    app_dirs::AppDirs,
    ports::{AppDirsError, AppDirsPort},
};

const KIOSK_DIR: &str = "evote-kiosk";
pub const PROFILE_ENV: &str = "EV_PROFILE";

/// Keep a profile usable as a single path segment. Anything outside
/// `[A-Za-z0-9_-]` is dropped; nothing left means no profile.
fn sanitize_profile(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Data directory resolver backed by the `dirs` crate.
pub struct DirsAppDirsAdapter {
    data_local_root: Option<PathBuf>,
    profile: Option<String>,
}

impl Default for DirsAppDirsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DirsAppDirsAdapter {
    /// System data-local directory, profile taken from `EV_PROFILE`.
    pub fn new() -> Self {
        let profile = std::env::var(PROFILE_ENV)
            .ok()
            .and_then(|raw| sanitize_profile(&raw));
        Self {
            data_local_root: None,
            profile,
        }
    }

    /// Resolve under `root` rather than the system directory.
    pub fn rooted_at(root: PathBuf) -> Self {
        Self {
            data_local_root: Some(root),
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: &str) -> Self {
        self.profile = sanitize_profile(profile);
        self
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    fn data_local_root(&self) -> Option<PathBuf> {
        self.data_local_root.clone().or_else(dirs::data_local_dir)
    }

    fn kiosk_dir_name(&self) -> String {
        match &self.profile {
            Some(profile) => format!("{KIOSK_DIR}-{profile}"),
            None => KIOSK_DIR.to_string(),
        }
    }
}

impl AppDirsPort for DirsAppDirsAdapter {
    fn get_app_dirs(&self) -> Result<AppDirs, AppDirsError> {
        let root = self
            .data_local_root()
            .ok_or(AppDirsError::DataLocalDirUnavailable)?;
        Ok(AppDirs {
            app_data_root: root.join(self.kiosk_dir_name()),
        })
    }
}
