use super::Context;
use crate::output::{print_json, print_pairs};
use anyhow::{anyhow, bail, Result};
use sidwatch_core::instance;
use std::time::{Duration, Instant};

pub fn status(ctx: &Context) -> Result<()> {
    let cfg = ctx.load_config()?;
    let record = instance::running(&cfg.pid_file).map_err(|e| anyhow!("{e}"))?;

    if ctx.json {
        print_json(&serde_json::json!({
            "running": record.is_some(),
            "pid_file": cfg.pid_file,
            "instance": record,
        }))?;
        return Ok(());
    }

    match record {
        Some(r) => print_pairs(&[
            ("status", "running".to_string()),
            ("pid", r.pid.to_string()),
            ("config", r.config.display().to_string()),
            (
                "started",
                r.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
        ]),
        None => println!("sidwatch is not running"),
    }
    Ok(())
}

pub fn stop(ctx: &Context) -> Result<()> {
    let cfg = ctx.load_config()?;
    let record = instance::running(&cfg.pid_file)
        .map_err(|e| anyhow!("{e}"))?
        .ok_or_else(|| anyhow!("sidwatch is not running"))?;

    instance::terminate(record.pid).map_err(|e| anyhow!("{e}"))?;
    println!("Stopping sidwatch (PID {})", record.pid);
    Ok(())
}

/// How long `restart` waits for the old instance to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(15);

/// Stop the running instance (if any), wait for it to exit, then `run`.
pub fn restart(ctx: &Context) -> Result<()> {
    let cfg = ctx.load_config()?;
    match instance::running(&cfg.pid_file).map_err(|e| anyhow!("{e}"))? {
        Some(record) => {
            instance::terminate(record.pid).map_err(|e| anyhow!("{e}"))?;
            println!("Stopping sidwatch (PID {})", record.pid);
            wait_for_exit(record.pid)?;
        }
        None => println!("sidwatch is not running; starting"),
    }
    super::run::run(ctx)
}

fn wait_for_exit(pid: u32) -> Result<()> {
    let deadline = Instant::now() + STOP_TIMEOUT;
    while instance::is_pid_alive(pid) {
        if Instant::now() >= deadline {
            bail!(
                "sidwatch (PID {pid}) did not exit within {}s",
                STOP_TIMEOUT.as_secs()
            );
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Ok(())
}
