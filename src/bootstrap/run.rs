use std::sync::{Arc, Mutex};

use ev_core::access::RouteTarget;
use ev_core::app_dirs::AppDirs;
use ev_core::config::AppConfig;
use ev_core::ports::{CameraPort, FaceMatchPort, NavigatorPort};
use tracing::{info, warn};

use super::wiring::{wire_dependencies, AppRuntime};

/// Navigator for the headless shell: remembers and logs the last route.
#[derive(Default)]
pub struct LoggingNavigator {
    last: Mutex<Option<RouteTarget>>,
}

impl LoggingNavigator {
    pub fn last_route(&self) -> Option<RouteTarget> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl NavigatorPort for LoggingNavigator {
    fn navigate(&self, target: RouteTarget) {
        info!(route = %target, "navigate");
        *self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(target);
    }
}

/// What the kiosk found at startup.
#[derive(Debug, Clone)]
pub struct StartupReport {
    pub service_online: bool,
    pub service_status: String,
    pub camera_available: bool,
    /// Where the election routes would send the voter right now.
    pub gate: String,
}

/// Wire the runtime, probe the services and evaluate the election gate.
pub async fn run_app(config: AppConfig, app_dirs: AppDirs) -> anyhow::Result<StartupReport> {
    let navigator = Arc::new(LoggingNavigator::default());
    let deps = wire_dependencies(&config, &app_dirs, navigator.clone())?;
    let runtime = AppRuntime::build(config, &app_dirs, deps).await;

    let health = runtime.deps.face_match.check_health().await;
    if health.is_online() {
        info!(status = %health.status, version = ?health.version, "face-match service reachable");
    } else {
        warn!(
            simulation_fallback = runtime.config.verification.simulation_fallback,
            "face-match service offline"
        );
    }

    let camera_available = runtime.deps.camera.check_camera_status().await;
    let decision = runtime.route_guard.check_verification().await;
    let gate = match decision.target() {
        Some(target) => target.to_url(),
        None => "allowed".to_string(),
    };
    info!(gate = %gate, camera_available, "kiosk ready");

    runtime.outcomes.dispose();
    runtime.deps.camera.release().await;

    Ok(StartupReport {
        service_online: health.is_online(),
        service_status: health.status,
        camera_available,
        gate,
    })
}
