use std::process::ExitCode;

use ev_app::AppPaths;
use evote_kiosk_lib::bootstrap::{
    load_config_or_default, resolve_app_dirs, resolve_config_path, run_app, tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    match start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("evote-kiosk failed to start: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn start() -> anyhow::Result<()> {
    // Config location depends on the default data dir; the data dir itself
    // may then be overridden by the config.
    let default_dirs = resolve_app_dirs(&ev_core::AppConfig::empty())?;
    let config_path = resolve_config_path(&AppPaths::from_app_dirs(&default_dirs).config_path);
    let config = load_config_or_default(config_path)?;

    let app_dirs = resolve_app_dirs(&config)?;
    let paths = AppPaths::from_app_dirs(&app_dirs);
    tracing::init_tracing_subscriber(&paths.logs_dir)?;

    let report = run_app(config, app_dirs).await?;
    println!(
        "face-match: {} | camera: {} | election gate: {}",
        report.service_status,
        if report.camera_available { "available" } else { "unavailable" },
        report.gate
    );
    Ok(())
}
