use super::Context;
use crate::output::{print_json, print_pairs};
use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use sidwatch_core::{CheckpointStore, FileCheckpoint};

#[derive(Subcommand)]
pub enum CheckpointSubcommand {
    /// Print the stored fingerprint ("0,0" when none is stored)
    Show,
    /// Remove the stored fingerprint
    Clear,
}

pub fn run(ctx: &Context, subcmd: CheckpointSubcommand) -> Result<()> {
    let cfg = ctx.load_config()?;
    let store = FileCheckpoint::new(cfg.checkpoint.path.clone());
    match subcmd {
        CheckpointSubcommand::Show => show(ctx, &store),
        CheckpointSubcommand::Clear => clear(ctx, &store),
    }
}

fn show(ctx: &Context, store: &FileCheckpoint) -> Result<()> {
    let fp = store.read().context("failed to read checkpoint")?;
    let saved_at: Option<DateTime<Utc>> = std::fs::metadata(store.path())
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::from);

    if ctx.json {
        print_json(&serde_json::json!({
            "path": store.path(),
            "fingerprint": fp,
            "stored": !fp.is_sentinel(),
            "saved_at": saved_at,
        }))?;
        return Ok(());
    }

    let mut rows = vec![
        ("path", store.path().display().to_string()),
        ("fingerprint", fp.to_string()),
    ];
    if let Some(ts) = saved_at {
        rows.push(("saved_at", ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()));
    }
    print_pairs(&rows);
    Ok(())
}

fn clear(ctx: &Context, store: &FileCheckpoint) -> Result<()> {
    store.clear().context("failed to clear checkpoint")?;
    if ctx.json {
        print_json(&serde_json::json!({ "cleared": store.path() }))?;
    } else {
        println!("Cleared checkpoint {}", store.path().display());
    }
    Ok(())
}
