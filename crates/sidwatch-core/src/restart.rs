//! The restart action: a job-control script driven through three phases.
//!
//! # Protocol
//! - `stop`:  run to completion, then wait `phase_delay`.
//! - `kill`:  run to completion, then wait `phase_delay`.
//! - `start`: launch without waiting for it to exit, then wait `phase_delay`.
//!
//! Each phase runs `<script> <verb> <job> <environment>` with stdout and
//! stderr appended to a shared log file. Exit codes are logged; a failing
//! phase never stops the following ones.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use crate::config::RestartConfig;
use crate::error::{Result, WatchError};
use crate::io::open_append;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stop,
    Kill,
    Start,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Stop, Phase::Kill, Phase::Start];

    pub fn verb(self) -> &'static str {
        match self {
            Phase::Stop => "stop",
            Phase::Kill => "kill",
            Phase::Start => "start",
        }
    }

    /// `start` is launched in the background; the others are awaited.
    pub fn waits_for_exit(self) -> bool {
        !matches!(self, Phase::Start)
    }
}

pub trait ActionInvoker {
    /// Restart `job`. Errors cover only the action's own plumbing (e.g. the
    /// log destination); phase failures are logged, not returned.
    fn restart(&self, job: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: ActionInvoker + Sync> ActionInvoker for &T {
    fn restart(&self, job: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).restart(job)
    }
}

#[derive(Debug, Clone)]
pub struct ScriptRestarter {
    script: PathBuf,
    environment: String,
    phase_delay: Duration,
    log_file: PathBuf,
}

impl ScriptRestarter {
    pub fn new(
        script: impl Into<PathBuf>,
        environment: impl Into<String>,
        phase_delay: Duration,
        log_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            script: script.into(),
            environment: environment.into(),
            phase_delay,
            log_file: log_file.into(),
        }
    }

    pub fn from_config(cfg: &RestartConfig) -> Self {
        Self::new(
            cfg.script.clone(),
            cfg.environment.clone(),
            cfg.phase_delay(),
            cfg.log_file.clone(),
        )
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    fn build_command(&self, phase: Phase, job: &str) -> Result<Command> {
        let log = open_append(&self.log_file)?;
        let err_log = log.try_clone()?;
        let mut cmd = Command::new(&self.script);
        cmd.args([phase.verb(), job, &self.environment])
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(err_log));
        Ok(cmd)
    }

    async fn run_phase(&self, phase: Phase, job: &str) -> Result<()> {
        info!(job, phase = phase.verb(), "restart phase");
        let mut cmd = self.build_command(phase, job)?;

        let spawned = cmd.spawn().map_err(|e| WatchError::RestartSpawn {
            script: self.script.display().to_string(),
            reason: e.to_string(),
        });
        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => {
                warn!(job, phase = phase.verb(), error = %e, "restart phase failed to launch");
                return Ok(());
            }
        };

        if phase.waits_for_exit() {
            match child.wait().await {
                Ok(status) if status.success() => {
                    info!(job, phase = phase.verb(), "restart phase finished");
                }
                Ok(status) => {
                    warn!(job, phase = phase.verb(), exit_code = ?status.code(), "restart phase exited with failure");
                }
                Err(e) => {
                    warn!(job, phase = phase.verb(), error = %e, "failed to wait for restart phase");
                }
            }
        } else {
            info!(job, phase = phase.verb(), pid = ?child.id(), "restart phase launched");
        }
        Ok(())
    }
}

impl ActionInvoker for ScriptRestarter {
    async fn restart(&self, job: &str) -> Result<()> {
        info!(job, script = %self.script.display(), "restarting job");
        for phase in Phase::ALL {
            self.run_phase(phase, job).await?;
            tokio::time::sleep(self.phase_delay).await;
        }
        info!(job, "restart finished");
        Ok(())
    }
}
