use super::{build_reconciler, runtime, Context};
use crate::output::print_json;
use anyhow::Result;
use sidwatch_core::StepOutcome;

/// One cycle against whatever checkpoint is stored. Unlike `run`, the
/// checkpoint is not cleared first, so an unchanged fingerprint restarts
/// nothing.
pub fn run(ctx: &Context) -> Result<()> {
    let cfg = ctx.load_config()?;
    let rt = runtime()?;
    let outcome = rt.block_on(async {
        let mut reconciler = build_reconciler(&cfg)?;
        Ok::<_, anyhow::Error>(reconciler.step().await)
    })?;

    if ctx.json {
        print_json(&outcome)?;
    } else {
        match &outcome {
            StepOutcome::FetchFailed { reason } => println!("fetch failed: {reason}"),
            StepOutcome::Unchanged { fingerprint } => println!("unchanged: {fingerprint}"),
            StepOutcome::Changed {
                previous,
                current,
                persist_attempts,
            } => println!(
                "changed: {previous} -> {current} (saved after {persist_attempts} attempt(s); job '{}' restarted)",
                cfg.restart.job
            ),
        }
    }

    if let StepOutcome::FetchFailed { reason } = outcome {
        anyhow::bail!("no valid fingerprint: {reason}");
    }
    Ok(())
}
