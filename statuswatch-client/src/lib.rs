use statuswatch_shared::api::rest::TransportError;
use tracing::info;

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod diff;
pub mod notify;
pub mod render;
pub mod source;
pub mod store;
pub mod view;

pub use app::monitor::{CycleOutcome, MonitorHandle, MonitorSettings, Refresher};
pub use cli::{Cli, Command};
pub use config::{ClientConfig, load_config, resolve_config_path};
pub use diff::{ChangeSet, diff};
pub use notify::{NotificationScheduler, Stamp, Timings};
pub use source::{HttpSource, SnapshotSource};
pub use store::SnapshotStore;
pub use view::ViewState;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("monitor stopped")]
    MonitorStopped,
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    init_tracing();
    execute(cli).await
}

/// Dispatch a parsed command line. Offline commands run before the config is
/// loaded, so a broken config file does not block them.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    match &cli.command {
        Some(Command::InitConfig { force }) => {
            let path = commands::init_config(cli.config.clone(), *force)?;
            info!(path=?path, "wrote default config");
            return Ok(());
        }
        Some(Command::Diff { old, new }) => {
            let changes = commands::diff_files(old, new)?;
            commands::print_change_set(&changes);
            return Ok(());
        }
        _ => {}
    }

    let (cfg_path, mut cfg) = ClientConfig::find_and_load(cli.config.clone())?;
    match &cfg_path {
        Some(path) => info!(path=?path, "loaded config"),
        None => info!("no config file found; using defaults"),
    }
    cfg.apply_overrides(cli.server.as_deref(), cli.interval_ms);
    cfg.validate()?;

    if let Some(Command::Fetch) = cli.command {
        return commands::fetch_once(&cfg).await;
    }
    app::run(
        cfg,
        app::RunOptions {
            render: !cli.no_render,
        },
    )
    .await
}
