pub mod checkpoint;
pub mod config;
pub mod fingerprint;
pub mod run;
pub mod status;
pub mod step;

use anyhow::Context as _;
use sidwatch_core::config::Config;
use sidwatch_core::{
    AlertThrottle, ConfiguredNotifier, FileCheckpoint, Reconciler, Schedule, ScriptRestarter,
    SqlSource,
};
use std::path::PathBuf;

pub type WatchReconciler = Reconciler<SqlSource, FileCheckpoint, ScriptRestarter, ConfiguredNotifier>;

/// Global flags shared by every command.
pub struct Context {
    pub config_path: PathBuf,
    pub database_url: Option<String>,
    pub json: bool,
}

impl Context {
    /// Load the config file, applying the `--database-url` override.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut cfg = Config::load(&self.config_path)
            .with_context(|| format!("failed to load {}", self.config_path.display()))?;
        if let Some(url) = &self.database_url {
            cfg.database.url = Some(url.clone());
        }
        Ok(cfg)
    }
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Must be called inside the runtime: the pool spawns its maintenance tasks.
pub fn build_source(cfg: &Config) -> anyhow::Result<SqlSource> {
    let url = cfg.database_url()?;
    SqlSource::connect_lazy(url, &cfg.database, cfg.hash).context("invalid database url")
}

/// Wire every component from `cfg`. Must be called inside the runtime.
pub fn build_reconciler(cfg: &Config) -> anyhow::Result<WatchReconciler> {
    let source = build_source(cfg)?;
    let store = FileCheckpoint::new(cfg.checkpoint.path.clone());
    let restarter = ScriptRestarter::from_config(&cfg.restart);
    let notifier =
        ConfiguredNotifier::from_config(&cfg.alerts).context("failed to build alert notifier")?;
    Ok(Reconciler::new(
        source,
        store,
        restarter,
        AlertThrottle::new(notifier, cfg.alerts.threshold),
        Schedule::from(&cfg.schedule),
        cfg.restart.job.clone(),
    ))
}
