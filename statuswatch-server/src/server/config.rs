use serde::Deserialize;
use std::{env, fs, path::Path};

use crate::source::SourceShape;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_regenerate_every")]
    pub regenerate_every: u64,
    /// Fixed RNG seed for reproducible listings.
    pub seed: Option<u64>,
    pub listen_port: Option<u16>,
}

fn default_min_records() -> usize {
    10
}

fn default_max_records() -> usize {
    20
}

fn default_regenerate_every() -> u64 {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_records: default_min_records(),
            max_records: default_max_records(),
            regenerate_every: default_regenerate_every(),
            seed: None,
            listen_port: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigError::Yaml(value)
    }
}

impl AppConfig {
    /// Load from `$CONFIG_PATH`; without it the built-in defaults apply.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("CONFIG_PATH") {
            Ok(path) => Self::load_from_path(path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        let cfg: AppConfig = serde_yaml::from_str(&text)?;
        Ok(cfg)
    }

    pub fn shape(&self) -> SourceShape {
        SourceShape {
            min_records: self.min_records,
            max_records: self.max_records,
            regenerate_every: self.regenerate_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "seed: 9\nmax_records: 12\n").unwrap();
        let cfg = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(cfg.max_records, 12);
        assert_eq!(cfg.min_records, 10);
        assert_eq!(cfg.regenerate_every, 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::load_from_path("/nonexistent/statuswatch.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
