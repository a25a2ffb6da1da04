//! # Configuration Loader / 配置加载器
//!
//! ## Responsibilities / 职责
//!
//! - Read TOML configuration files / 读取 TOML 配置文件
//! - Parse TOML into the AppConfig DTO / 将 TOML 解析为 AppConfig DTO
//! - Report I/O and parsing errors with context / 报告带上下文的错误
//!
//! Defaults for missing keys live in the DTO, not here.

use std::path::{Path, PathBuf};

use anyhow::Context;
use ev_core::config::AppConfig;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "EV_CONFIG";

/// Load configuration from a TOML file.
/// 从 TOML 文件加载配置。
///
/// # Errors / 错误
///
/// - File cannot be read (I/O error)
/// - Content is not valid TOML
/// - A key has the wrong type or an unknown enum value
pub fn load_config(config_path: PathBuf) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}

/// `EV_CONFIG` wins over the default location.
pub fn resolve_config_path(default_path: &Path) -> PathBuf {
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => default_path.to_path_buf(),
    }
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default(config_path: PathBuf) -> anyhow::Result<AppConfig> {
    if !config_path.exists() {
        tracing::info!(path = %config_path.display(), "config file not found; using defaults");
        return Ok(AppConfig::empty());
    }
    load_config(config_path)
}
