//! One-shot subcommands.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use statuswatch_shared::Snapshot;
use tracing::info;

use crate::AppError;
use crate::config::{ClientConfig, resolve_config_path, save_config};
use crate::diff::{ChangeSet, diff};
use crate::source::{HttpSource, SnapshotSource};

pub async fn fetch_once(cfg: &ClientConfig) -> Result<(), AppError> {
    let source = HttpSource::from_config(cfg);
    let snapshot = source.fetch().await?;
    info!(records = snapshot.len(), server = source.base(), "fetched snapshot");
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, AppError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub fn diff_files(old: &Path, new: &Path) -> Result<ChangeSet, AppError> {
    let previous = load_snapshot(old)?;
    let current = load_snapshot(new)?;
    Ok(diff(&previous, &current))
}

pub fn print_change_set(changes: &ChangeSet) {
    for id in changes.iter() {
        println!("{id}");
    }
}

/// Write the default config to the resolved location.
pub fn init_config(cli_value: Option<PathBuf>, force: bool) -> Result<PathBuf, AppError> {
    let path = resolve_config_path(cli_value)?;
    if path.exists() && !force {
        return Err(AppError::Config(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    save_config(&path, &ClientConfig::default())?;
    Ok(path)
}
