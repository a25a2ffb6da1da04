use std::path::PathBuf;

use ev_core::app_dirs::AppDirs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_path: PathBuf,
    /// Durable key-value store (checkpoint and session summary).
    pub storage_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl AppPaths {
    pub fn from_app_dirs(dirs: &AppDirs) -> Self {
        Self {
            config_path: dirs.app_data_root.join("config.toml"),
            storage_path: dirs.app_data_root.join("storage.json"),
            logs_dir: dirs.app_data_root.join("logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_paths_derives_concrete_locations_from_app_data_root() {
        let dirs = AppDirs {
            app_data_root: PathBuf::from("/tmp/evote-kiosk"),
        };

        let paths = AppPaths::from_app_dirs(&dirs);

        assert_eq!(paths.config_path, PathBuf::from("/tmp/evote-kiosk/config.toml"));
        assert_eq!(paths.storage_path, PathBuf::from("/tmp/evote-kiosk/storage.json"));
        assert_eq!(paths.logs_dir, PathBuf::from("/tmp/evote-kiosk/logs"));
    }
}
