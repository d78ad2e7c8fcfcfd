use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lmx_reconcile::DiffSummary;
use lmx_snapshot::RotationReport;
use serde::Serialize;
use uuid::Uuid;

pub const REPORT_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Every fetched record was mapped (first run or forced full mode).
    Exported,
    /// Only the diff was mapped.
    Updated,
    /// Nothing changed; no documents written, snapshot untouched.
    Unchanged,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Exported => "exported",
            SyncOutcome::Updated => "updated",
            SyncOutcome::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchCounts {
    pub pages: usize,
    pub records: usize,
    pub skipped: usize,
}

/// What one run did. Serialized as the run report.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub started_at_utc: DateTime<Utc>,
    pub finished_at_utc: DateTime<Utc>,
    pub config_hash: Option<String>,
    pub outcome: SyncOutcome,
    pub fetch: FetchCounts,
    /// `None` when no diff was computed.
    pub diff: Option<DiffSummary>,
    /// MARC records written across all documents.
    pub elements: usize,
    pub documents: Vec<PathBuf>,
    pub snapshot_path: PathBuf,
    /// `None` when the snapshot was left as is.
    pub rotation: Option<RotationReport>,
}

/// Write `report` as pretty JSON, creating parent directories.
pub fn write_report(path: impl AsRef<Path>, report: &SyncReport) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir failed: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serialize run report failed")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write run report failed: {}", path.display()))?;
    Ok(())
}
