use anyhow::{Context, Result};
use lmx_reconcile::{diff_by_key, DiffSummary};

pub fn run(current: &str, previous: &str, key: &str) -> Result<()> {
    let cur = lmx_snapshot::load(current).with_context(|| format!("--current {current}"))?;
    let prev = lmx_snapshot::load(previous).with_context(|| format!("--previous {previous}"))?;

    let entries = diff_by_key(&cur, &prev, key)?;
    println!("{}", DiffSummary::of(&entries));
    for e in &entries {
        println!("{} {}", e.status, e.record.first(key).unwrap_or(""));
    }
    Ok(())
}
