use super::{build_source, runtime, Context};
use crate::output::{print_json, print_pairs};
use anyhow::{Context as _, Result};
use sidwatch_core::FingerprintSource;

pub fn run(ctx: &Context) -> Result<()> {
    let cfg = ctx.load_config()?;
    let rt = runtime()?;
    let snapshot = rt.block_on(async {
        let source = build_source(&cfg)?;
        source.fetch().await.context("failed to query data source")
    })?;

    if ctx.json {
        print_json(&serde_json::json!({
            "fingerprint": snapshot.fingerprint,
            "valid": !snapshot.fingerprint.is_sentinel(),
            "hash": cfg.hash.as_str(),
            "services": snapshot.services,
            "products": snapshot.products,
        }))?;
        return Ok(());
    }

    print_pairs(&[
        ("fingerprint", snapshot.fingerprint.to_string()),
        ("hash", cfg.hash.as_str().to_string()),
        ("services", snapshot.services.len().to_string()),
        ("products", snapshot.products.len().to_string()),
    ]);
    if snapshot.fingerprint.is_sentinel() {
        println!("warning: both row sets are empty; this fingerprint would be rejected");
    }
    Ok(())
}
