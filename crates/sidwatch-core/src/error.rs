use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("data source error: {0}")]
    DataSource(#[from] sqlx::Error),

    #[error("notification failed: {0}")]
    Notify(#[from] reqwest::Error),

    #[error("failed to spawn restart action '{script}': {reason}")]
    RestartSpawn { script: String, reason: String },

    #[error("already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WatchError>;
