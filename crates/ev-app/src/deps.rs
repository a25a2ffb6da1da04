//! # Application Dependencies / 应用依赖
//!
//! Dependency grouping for use-case construction. Plain parameter packing,
//! no defaults and no hidden logic.
//! 仅用于参数打包，无默认值，无隐藏逻辑。

use std::sync::Arc;

use ev_core::ports::*;

/// Every port the use cases need. All fields are required.
///
/// 所有依赖都是必需的。
pub struct AppDeps {
    // Storage / 存储
    /// Cleared with the kiosk session.
    pub session_storage: Arc<dyn KeyValueStorePort>,
    /// Survives restarts; holds the verification checkpoint.
    pub durable_storage: Arc<dyn KeyValueStorePort>,

    // Devices / 设备
    pub camera: Arc<dyn CameraPort>,

    // Remote services / 远程服务
    pub face_match: Arc<dyn FaceMatchPort>,
    pub voter_registry: Arc<dyn VoterRegistryPort>,

    // Shell / 外壳
    pub navigator: Arc<dyn NavigatorPort>,

    // System / 系统
    pub clock: Arc<dyn ClockPort>,
}
