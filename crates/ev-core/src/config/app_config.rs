use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::access::{MissingTimestampPolicy, SessionValidityPolicy};
use crate::camera::{CameraConfig, FacingMode};

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL, without trailing slash. Endpoints are appended to it.
    pub base_url: String,
    pub face_verify_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:7185/api".to_string(),
            face_verify_timeout_secs: 45,
            health_timeout_secs: 5,
            request_timeout_secs: 15,
        }
    }
}

/// Workflow timing and policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    /// Substitute a simulated result when the face-match service fails.
    pub simulation_fallback: bool,
    pub session_window_hours: i64,
    pub missing_timestamp: MissingTimestampPolicy,
    /// Delay before leaving the wizard after an outcome.
    pub redirect_delay_ms: u64,
    pub countdown_secs: u32,
    pub banner_dismiss_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            simulation_fallback: true,
            session_window_hours: 8,
            missing_timestamp: MissingTimestampPolicy::Deny,
            redirect_delay_ms: 2000,
            countdown_secs: 3,
            banner_dismiss_ms: 5000,
        }
    }
}

impl VerificationConfig {
    pub fn validity_policy(&self) -> SessionValidityPolicy {
        SessionValidityPolicy::new(self.session_window_hours, self.missing_timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub facing_mode: FacingMode,
    /// Serve this image instead of a live device (rehearsal / headless).
    pub still_image_path: Option<PathBuf>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let base = CameraConfig::default();
        Self {
            width: base.width,
            height: base.height,
            frame_rate: base.frame_rate,
            facing_mode: base.facing_mode,
            still_image_path: None,
        }
    }
}

impl CameraSettings {
    pub fn to_camera_config(&self) -> CameraConfig {
        CameraConfig {
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
            facing_mode: self.facing_mode,
            device_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
}

/// Application configuration DTO
/// 应用配置 DTO
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub verification: VerificationConfig,
    pub camera: CameraSettings,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Create AppConfig from TOML value
    /// 从 TOML 值创建 AppConfig
    pub fn from_toml(toml_value: &toml::Value) -> Result<Self> {
        let defaults = Self::empty();
        let api = toml_value.get("api");
        let verification = toml_value.get("verification");
        let camera = toml_value.get("camera");
        let storage = toml_value.get("storage");

        let missing_timestamp = match get_str(verification, "verification", "missing_timestamp")? {
            Some(raw) => MissingTimestampPolicy::parse(raw).ok_or_else(|| {
                anyhow!("verification.missing_timestamp must be \"allow\" or \"deny\", got {raw:?}")
            })?,
            None => defaults.verification.missing_timestamp,
        };
        let facing_mode = match get_str(camera, "camera", "facing_mode")? {
            Some(raw) => FacingMode::parse(raw).ok_or_else(|| {
                anyhow!("camera.facing_mode must be \"user\" or \"environment\", got {raw:?}")
            })?,
            None => defaults.camera.facing_mode,
        };

        Ok(Self {
            api: ApiConfig {
                base_url: get_str(api, "api", "base_url")?
                    .map(|s| s.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.api.base_url),
                face_verify_timeout_secs: get_u64(api, "api", "face_verify_timeout_secs")?
                    .unwrap_or(defaults.api.face_verify_timeout_secs),
                health_timeout_secs: get_u64(api, "api", "health_timeout_secs")?
                    .unwrap_or(defaults.api.health_timeout_secs),
                request_timeout_secs: get_u64(api, "api", "request_timeout_secs")?
                    .unwrap_or(defaults.api.request_timeout_secs),
            },
            verification: VerificationConfig {
                simulation_fallback: get_bool(verification, "verification", "simulation_fallback")?
                    .unwrap_or(defaults.verification.simulation_fallback),
                session_window_hours: get_u64(verification, "verification", "session_window_hours")?
                    .map(|v| v as i64)
                    .unwrap_or(defaults.verification.session_window_hours),
                missing_timestamp,
                redirect_delay_ms: get_u64(verification, "verification", "redirect_delay_ms")?
                    .unwrap_or(defaults.verification.redirect_delay_ms),
                countdown_secs: get_u64(verification, "verification", "countdown_secs")?
                    .map(|v| v as u32)
                    .unwrap_or(defaults.verification.countdown_secs),
                banner_dismiss_ms: get_u64(verification, "verification", "banner_dismiss_ms")?
                    .unwrap_or(defaults.verification.banner_dismiss_ms),
            },
            camera: CameraSettings {
                width: get_u64(camera, "camera", "width")?
                    .map(|v| v as u32)
                    .unwrap_or(defaults.camera.width),
                height: get_u64(camera, "camera", "height")?
                    .map(|v| v as u32)
                    .unwrap_or(defaults.camera.height),
                frame_rate: get_u64(camera, "camera", "frame_rate")?
                    .map(|v| v as u32)
                    .unwrap_or(defaults.camera.frame_rate),
                facing_mode,
                still_image_path: get_str(camera, "camera", "still_image_path")?
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
            },
            storage: StorageConfig {
                data_dir: get_str(storage, "storage", "data_dir")?
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
            },
        })
    }

    /// All defaults.
    /// 全部使用默认值。
    pub fn empty() -> Self {
        Self::default()
    }
}

fn get_str<'a>(
    section: Option<&'a toml::Value>,
    section_name: &str,
    key: &str,
) -> Result<Option<&'a str>> {
    match section.and_then(|s| s.get(key)) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| anyhow!("{section_name}.{key} must be a string")),
    }
}

fn get_u64(section: Option<&toml::Value>, section_name: &str, key: &str) -> Result<Option<u64>> {
    match section.and_then(|s| s.get(key)) {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| anyhow!("{section_name}.{key} must be a non-negative integer")),
    }
}

fn get_bool(section: Option<&toml::Value>, section_name: &str, key: &str) -> Result<Option<bool>> {
    match section.and_then(|s| s.get(key)) {
        None => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| anyhow!("{section_name}.{key} must be a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Value;

    #[test]
    fn test_from_toml_uses_defaults_when_sections_missing() {
        let toml_value: Value = toml::from_str("").unwrap();

        let config = AppConfig::from_toml(&toml_value).unwrap();

        assert_eq!(config, AppConfig::empty());
        assert_eq!(config.api.face_verify_timeout_secs, 45);
        assert_eq!(config.api.health_timeout_secs, 5);
        assert!(config.verification.simulation_fallback);
        assert_eq!(
            config.verification.missing_timestamp,
            MissingTimestampPolicy::Deny
        );
        assert_eq!(config.verification.redirect_delay_ms, 2000);
        assert_eq!(config.camera.width, 1280);
    }

    #[test]
    fn test_from_toml_parses_all_sections() {
        let toml_str = r#"
            [api]
            base_url = "http://verify.local/api/"
            face_verify_timeout_secs = 30

            [verification]
            simulation_fallback = false
            session_window_hours = 4
            missing_timestamp = "allow"
            countdown_secs = 5

            [camera]
            width = 640
            height = 480
            facing_mode = "environment"
            still_image_path = "/srv/kiosk/face.jpg"

            [storage]
            data_dir = "/var/lib/evote"
        "#;
        let toml_value: Value = toml::from_str(toml_str).unwrap();

        let config = AppConfig::from_toml(&toml_value).unwrap();

        assert_eq!(config.api.base_url, "http://verify.local/api");
        assert_eq!(config.api.face_verify_timeout_secs, 30);
        assert_eq!(config.api.request_timeout_secs, 15);
        assert!(!config.verification.simulation_fallback);
        assert_eq!(config.verification.session_window_hours, 4);
        assert_eq!(
            config.verification.missing_timestamp,
            MissingTimestampPolicy::Allow
        );
        assert_eq!(config.verification.countdown_secs, 5);
        assert_eq!(config.camera.facing_mode, FacingMode::Environment);
        assert_eq!(
            config.camera.still_image_path,
            Some(PathBuf::from("/srv/kiosk/face.jpg"))
        );
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/var/lib/evote")));
    }

    #[test]
    fn test_from_toml_rejects_unknown_policy() {
        let toml_value: Value = toml::from_str(
            r#"
            [verification]
            missing_timestamp = "sometimes"
        "#,
        )
        .unwrap();

        let err = AppConfig::from_toml(&toml_value).unwrap_err();
        assert!(err.to_string().contains("missing_timestamp"));
    }

    #[test]
    fn test_from_toml_rejects_wrong_type() {
        let toml_value: Value = toml::from_str(
            r#"
            [api]
            health_timeout_secs = "five"
        "#,
        )
        .unwrap();

        assert!(AppConfig::from_toml(&toml_value).is_err());
    }

    #[test]
    fn test_validity_policy_follows_config() {
        let mut config = AppConfig::empty();
        config.verification.session_window_hours = 2;
        let policy = config.verification.validity_policy();
        assert_eq!(policy.window, chrono::Duration::hours(2));
    }
}
