//! # Configuration DTO / 配置 DTO
//!
//! - Define configuration data structures / 定义配置数据结构
//! - Provide TOML → DTO mapping / 提供 TOML → DTO 的映射
//!
//! Missing keys fall back to the documented defaults. Values of the wrong
//! type are errors, not silently replaced.

mod app_config;

pub use app_config::{ApiConfig, AppConfig, CameraSettings, StorageConfig, VerificationConfig};
