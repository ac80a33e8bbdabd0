use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::AppError;
use crate::app::monitor::MonitorSettings;
use crate::notify::Timings;

pub const ENV_CONFIG: &str = "STATUSWATCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_blink_period_ms")]
    pub blink_period_ms: u64,
    #[serde(default = "default_blink_toggles")]
    pub blink_toggles: u32,
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_blink_period_ms() -> u64 {
    500
}

fn default_blink_toggles() -> u32 {
    5
}

fn default_highlight_ms() -> u64 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval_ms: default_poll_interval_ms(),
            blink_period_ms: default_blink_period_ms(),
            blink_toggles: default_blink_toggles(),
            highlight_ms: default_highlight_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Resolve and load the config file.
    ///
    /// An explicitly named file (flag or env) must exist. The platform default
    /// location is optional; without it the built-in defaults apply.
    pub fn find_and_load(cli_value: Option<PathBuf>) -> Result<(Option<PathBuf>, Self), AppError> {
        let explicit = cli_value.or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from));
        if let Some(path) = explicit {
            let cfg = load_config(&path)?;
            return Ok((Some(path), cfg));
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                let cfg = load_config(&path)?;
                Ok((Some(path), cfg))
            }
            _ => Ok((None, Self::default())),
        }
    }

    pub fn apply_overrides(&mut self, server_url: Option<&str>, poll_interval_ms: Option<u64>) {
        if let Some(url) = server_url {
            self.server_url = url.to_string();
        }
        if let Some(ms) = poll_interval_ms {
            self.poll_interval_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let normalized = normalize_server_url(&self.server_url);
        url::Url::parse(&normalized)
            .map_err(|e| AppError::Config(format!("invalid server_url {normalized}: {e}")))?;
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.blink_period_ms == 0 {
            return Err(AppError::Config("blink_period_ms must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn timings(&self) -> Timings {
        Timings {
            blink_period: Duration::from_millis(self.blink_period_ms),
            blink_toggles: self.blink_toggles,
            highlight_ttl: Duration::from_millis(self.highlight_ms),
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: self.poll_interval(),
            stall_after: self.request_timeout(),
            timings: self.timings(),
        }
    }
}

pub fn resolve_config_path(cli_value: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(p) = cli_value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Ok(PathBuf::from(p));
    }
    default_config_path().ok_or_else(|| AppError::Config("could not determine config dir".into()))
}

pub fn default_config_path() -> Option<PathBuf> {
    let pd = ProjectDirs::from("dev", "statuswatch", "statuswatch")?;
    Some(pd.config_dir().join("client.yaml"))
}

pub fn load_config(path: &Path) -> Result<ClientConfig, AppError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("read {} failed: {e}", path.display())))?;
    let cfg: ClientConfig = serde_yaml::from_str(&data)
        .map_err(|e| AppError::Config(format!("parse {} failed: {e}", path.display())))?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &ClientConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let data = serde_yaml::to_string(cfg)
        .map_err(|e| AppError::Config(format!("serialize config failed: {e}")))?;
    std::fs::write(path, data)
        .map_err(|e| AppError::Config(format!("write {} failed: {e}", path.display())))
}

pub fn normalize_server_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", trimmed.trim_end_matches('/'))
    }
}
