use ev_core::config::AppConfig;
use evote_kiosk_lib::bootstrap::{resolve_app_dirs, run_app};

fn config_for(base_url: String, data_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::empty();
    config.api.base_url = base_url;
    config.api.health_timeout_secs = 1;
    config.storage.data_dir = Some(data_dir.to_path_buf());
    config
}

#[tokio::test]
async fn run_app_reports_service_health_and_gate() {
    let mut server = mockito::Server::new_async().await;
    let health = server
        .mock("GET", "/face/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"healthy","version":"1.2.0"}"#)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(server.url(), dir.path());
    let app_dirs = resolve_app_dirs(&config).unwrap();

    let report = run_app(config, app_dirs).await.expect("run app");

    health.assert_async().await;
    assert!(report.service_online);
    assert_eq!(report.service_status, "healthy");
    // No frame source in the temp dir.
    assert!(!report.camera_available);
    assert_eq!(report.gate, "/check");
}

#[tokio::test]
async fn run_app_survives_offline_service() {
    let mut server = mockito::Server::new_async().await;
    let health = server
        .mock("GET", "/face/health")
        .with_status(503)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(server.url(), dir.path());
    let app_dirs = resolve_app_dirs(&config).unwrap();

    let report = run_app(config, app_dirs).await.expect("run app");

    health.assert_async().await;
    assert!(!report.service_online);
    assert_eq!(report.service_status, "offline");
}
