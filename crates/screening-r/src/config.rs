use screening_core::ScreeningConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCAL_FILE: &str = "screening.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Where the runner looks for its YAML, highest priority first: the
    /// working directory, then the per-user `~/.screening/config.yaml`.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".").join(LOCAL_FILE)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".screening").join("config.yaml"));
        }
        paths
    }

    /// The first file in [`search_paths`](Self::search_paths) that exists;
    /// built-in defaults when none does.
    pub async fn load_default() -> Result<ScreeningConfig, ConfigError> {
        for path in Self::search_paths() {
            if tokio::fs::try_exists(&path).await? {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load_from(&path).await;
            }
        }
        Ok(ScreeningConfig::default())
    }

    /// Read one file; an empty file yields the defaults.
    pub async fn load_from(path: &Path) -> Result<ScreeningConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(ScreeningConfig::from_yaml_str(&content)?)
    }
}
