use super::{build_reconciler, runtime, Context};
use anyhow::{anyhow, Result};
use sidwatch_core::instance::InstanceRecord;
use sidwatch_core::WatchError;
use tracing::{info, warn};

pub fn run(ctx: &Context) -> Result<()> {
    let cfg = ctx.load_config()?;
    let pid_file = cfg.pid_file.clone();

    let record = match InstanceRecord::acquire(&pid_file, &ctx.config_path) {
        Ok(r) => r,
        Err(WatchError::AlreadyRunning(pid)) => {
            return Err(anyhow!(
                "sidwatch is already running (PID {pid})\n\
                 Run `sidwatch stop` to stop it first."
            ));
        }
        Err(e) => return Err(anyhow!("failed to write {}: {e}", pid_file.display())),
    };

    info!(
        pid = record.pid,
        config = %ctx.config_path.display(),
        checkpoint = %cfg.checkpoint.path.display(),
        restart_log = %cfg.restart.log_file.display(),
        "sidwatch starting"
    );

    let result = runtime().and_then(|rt| {
        rt.block_on(async {
            let mut reconciler = build_reconciler(&cfg)?;
            tokio::select! {
                _ = reconciler.run() => {}
                _ = shutdown_signal() => info!("shutdown signal received"),
            }
            Ok::<(), anyhow::Error>(())
        })
    });

    if let Err(e) = record.release(&pid_file) {
        warn!(error = %e, path = %pid_file.display(), "failed to remove instance record");
    }
    info!("sidwatch stopped");
    result
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
