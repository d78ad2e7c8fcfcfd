use anyhow::{Context, Result};
use lmx_config::{ConfigMode, UnusedKeyPolicy};
use lmx_directory::CancelFlag;
use lmx_sync::{mapper_from_config, write_report, SyncJob, SyncMode, SyncOrchestrator};

use super::{cancel_on_ctrl_c, connect, load_sync_config};

pub async fn run(
    config_paths: &[String],
    full: bool,
    report_override: Option<&str>,
    strict: bool,
) -> Result<()> {
    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let (loaded, cfg) = load_sync_config(config_paths, ConfigMode::Sync, policy)?;

    let mode = if full { SyncMode::Full } else { SyncMode::Auto };
    let cancel: CancelFlag = cancel_on_ctrl_c();
    let job = SyncJob::from_config(&cfg, mode, cancel).with_config_hash(&loaded.config_hash);
    let mapper = mapper_from_config(&cfg.mapping)?;

    let mut conn = connect(&cfg).await?;
    let mut orchestrator = SyncOrchestrator::new(job, mapper);
    let result = orchestrator.run(&mut conn).await;
    conn.close().await;
    let report = result?;

    if let Some(path) = report_override.or(cfg.output.report_path.as_deref()) {
        write_report(path, &report).with_context(|| format!("run report: {path}"))?;
    }

    println!("run_id={}", report.run_id);
    println!("outcome={}", report.outcome.as_str());
    println!("records={}", report.fetch.records);
    if let Some(diff) = report.diff {
        println!("{diff}");
    }
    for doc in &report.documents {
        println!("document={}", doc.display());
    }
    println!("config_hash={}", loaded.config_hash);
    Ok(())
}
