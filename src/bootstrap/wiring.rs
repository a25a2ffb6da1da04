//! # Dependency Injection / 依赖注入模块
//!
//! ## Responsibilities / 职责
//!
//! - Create infra implementations (storage, HTTP clients, clock) / 创建 infra 层具体实现
//! - Create platform implementations (camera, app dirs) / 创建 platform 层具体实现
//! - Inject all dependencies into the use cases / 将所有依赖注入到用例
//!
//! ## Prohibited / 禁止事项
//!
//! No business logic and no configuration validation. This is the only place
//! allowed to depend on ev-infra + ev-platform + ev-app at the same time, and
//! only for assembly.
//! 这是唯一允许同时依赖 ev-infra、ev-platform 和 ev-app 的地方，但仅用于组装。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ev_app::usecases::{
    CheckVoter, RouteGuard, VerificationOutcomes, VerificationSessionStore, VerificationWizard,
    WizardSettings,
};
use ev_app::{AppDeps, AppPaths};
use ev_core::app_dirs::AppDirs;
use ev_core::config::AppConfig;
use ev_core::ports::*;
use ev_infra::{
    FallbackFaceMatcher, FileKeyValueStore, HttpFaceMatchClient, HttpVoterRegistry,
    InMemoryKeyValueStore, SimulatedFaceMatcher, SystemClock,
};
use ev_platform::{CameraAdapter, DirsAppDirsAdapter, StillImageMediaDevices};
use tracing::info;

/// Pause before a simulated result is returned, so the degraded path feels
/// like a real request.
pub const SIMULATED_VERIFY_DELAY: Duration = Duration::from_secs(2);

/// Frame source used when `[camera] still_image_path` is not set.
const DEFAULT_FRAME_FILE: &str = "camera/frame.jpg";

pub type WiringResult<T> = Result<T, WiringError>;

/// 依赖注入错误（基础设施初始化失败）
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Application directory resolution failed: {0}")]
    AppDirs(String),

    #[error("Storage initialization failed: {0}")]
    StorageInit(String),
}

/// Application data root: `[storage] data_dir`, else the platform default.
pub fn resolve_app_dirs(config: &AppConfig) -> WiringResult<AppDirs> {
    if let Some(root) = &config.storage.data_dir {
        return Ok(AppDirs {
            app_data_root: root.clone(),
        });
    }
    DirsAppDirsAdapter::new()
        .get_app_dirs()
        .map_err(|e| WiringError::AppDirs(e.to_string()))
}

/// Build every port implementation.
pub fn wire_dependencies(
    config: &AppConfig,
    app_dirs: &AppDirs,
    navigator: Arc<dyn NavigatorPort>,
) -> WiringResult<AppDeps> {
    let paths = AppPaths::from_app_dirs(app_dirs);
    std::fs::create_dir_all(&app_dirs.app_data_root)
        .map_err(|e| WiringError::StorageInit(e.to_string()))?;

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

    let session_storage: Arc<dyn KeyValueStorePort> = Arc::new(InMemoryKeyValueStore::new());
    let durable_storage: Arc<dyn KeyValueStorePort> =
        Arc::new(FileKeyValueStore::new(paths.storage_path.clone()));

    let frame_path = config
        .camera
        .still_image_path
        .clone()
        .unwrap_or_else(|| app_dirs.app_data_root.join(DEFAULT_FRAME_FILE));
    let camera: Arc<dyn CameraPort> = Arc::new(CameraAdapter::new(
        Arc::new(StillImageMediaDevices::new(frame_path.clone())),
        config.camera.to_camera_config(),
    ));

    let remote: Arc<dyn FaceMatchPort> = Arc::new(HttpFaceMatchClient::new(
        config.api.base_url.clone(),
        Duration::from_secs(config.api.face_verify_timeout_secs),
        Duration::from_secs(config.api.health_timeout_secs),
        clock.clone(),
    ));
    let simulated: Arc<dyn FaceMatchPort> =
        Arc::new(SimulatedFaceMatcher::new(SIMULATED_VERIFY_DELAY, clock.clone()));
    let face_match: Arc<dyn FaceMatchPort> = Arc::new(FallbackFaceMatcher::new(
        remote,
        simulated,
        config.verification.simulation_fallback,
    ));

    let voter_registry: Arc<dyn VoterRegistryPort> = Arc::new(HttpVoterRegistry::new(
        config.api.base_url.clone(),
        Duration::from_secs(config.api.request_timeout_secs),
    ));

    info!(
        data_root = %app_dirs.app_data_root.display(),
        storage = %paths.storage_path.display(),
        camera_source = %frame_path.display(),
        api = %config.api.base_url,
        simulation_fallback = config.verification.simulation_fallback,
        "dependencies wired"
    );

    Ok(AppDeps {
        session_storage,
        durable_storage,
        camera,
        face_match,
        voter_registry,
        navigator,
        clock,
    })
}

/// Use cases over one set of ports.
///
/// 用例集合：共享同一个会话存储。
pub struct AppRuntime {
    pub config: AppConfig,
    pub paths: AppPaths,
    pub deps: AppDeps,
    pub store: Arc<VerificationSessionStore>,
    pub check_voter: CheckVoter,
    pub route_guard: RouteGuard,
    pub outcomes: VerificationOutcomes,
}

impl AppRuntime {
    /// Restores any stored session before returning.
    pub async fn build(config: AppConfig, app_dirs: &AppDirs, deps: AppDeps) -> Self {
        let store = Arc::new(
            VerificationSessionStore::open(
                deps.session_storage.clone(),
                deps.durable_storage.clone(),
                deps.clock.clone(),
                chrono::Duration::hours(config.verification.session_window_hours),
            )
            .await,
        );
        let check_voter = CheckVoter::new(
            deps.voter_registry.clone(),
            deps.session_storage.clone(),
            store.clone(),
        );
        let route_guard = RouteGuard::new(
            deps.session_storage.clone(),
            deps.durable_storage.clone(),
            deps.clock.clone(),
            config.verification.validity_policy(),
        );
        let outcomes = VerificationOutcomes::new(
            store.clone(),
            deps.session_storage.clone(),
            deps.navigator.clone(),
            deps.clock.clone(),
        );
        Self {
            paths: AppPaths::from_app_dirs(app_dirs),
            config,
            deps,
            store,
            check_voter,
            route_guard,
            outcomes,
        }
    }

    /// A fresh wizard for one visit of the verification page.
    pub fn wizard(&self) -> VerificationWizard {
        VerificationWizard::new(
            self.store.clone(),
            self.deps.camera.clone(),
            self.deps.face_match.clone(),
            self.deps.navigator.clone(),
            self.deps.clock.clone(),
            WizardSettings::from_config(&self.config.verification),
        )
    }

    pub fn storage_path(&self) -> PathBuf {
        self.paths.storage_path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_core::access::RouteTarget;

    struct NullNavigator;

    impl NavigatorPort for NullNavigator {
        fn navigate(&self, _target: RouteTarget) {}
    }

    #[test]
    fn test_data_dir_override_wins() {
        let mut config = AppConfig::empty();
        config.storage.data_dir = Some(PathBuf::from("/srv/kiosk"));
        let dirs = resolve_app_dirs(&config).unwrap();
        assert_eq!(dirs.app_data_root, PathBuf::from("/srv/kiosk"));
    }

    #[tokio::test]
    async fn test_runtime_builds_over_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app_dirs = AppDirs {
            app_data_root: dir.path().to_path_buf(),
        };
        let config = AppConfig::empty();

        let deps = wire_dependencies(&config, &app_dirs, Arc::new(NullNavigator)).unwrap();
        let runtime = AppRuntime::build(config, &app_dirs, deps).await;

        assert_eq!(runtime.storage_path(), dir.path().join("storage.json"));
        assert!(runtime.store.session().await.is_none());
        assert!(!runtime.deps.camera.is_active());
        let decision = runtime.route_guard.check_verification().await;
        assert_eq!(decision.target().unwrap().to_url(), "/check");
    }
}
