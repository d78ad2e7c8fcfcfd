use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate, Utc};
use lmx_directory::{fetch, DirectoryConnection, FetchOptions, SearchRequest};
use lmx_marc::{AssumeKnown, IdentifierLookup, MappedElement, Mapper};
use lmx_reconcile::DiffSummary;
use lmx_schemas::DEFAULT_KEY_ATTRIBUTE;
use lmx_snapshot::{RotationReport, StorageError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::report::{FetchCounts, SyncOutcome, SyncReport, REPORT_SCHEMA_VERSION};
use crate::{SyncError, SyncErrorKind, SyncState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Incremental when a snapshot exists, full export otherwise.
    #[default]
    Auto,
    /// Map every fetched record regardless of the snapshot; still refresh it.
    Full,
}

/// Where a set of documents goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    /// Elements per document; `<= 0` writes a single unsuffixed document.
    pub chunk_size: i64,
}

/// Everything one run needs apart from the connection and the mapper.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub request: SearchRequest,
    pub fetch: FetchOptions,
    pub key_attribute: String,
    pub snapshot_path: PathBuf,
    pub retain: usize,
    pub full_output: OutputTarget,
    pub update_output: OutputTarget,
    pub mode: SyncMode,
    pub config_hash: Option<String>,
}

impl SyncJob {
    pub fn new(request: SearchRequest, snapshot_path: impl Into<PathBuf>) -> Self {
        let snapshot_path = snapshot_path.into();
        let sibling = |name: &str| {
            snapshot_path
                .parent()
                .map(|p| p.join(name))
                .unwrap_or_else(|| PathBuf::from(name))
        };
        Self {
            request,
            fetch: FetchOptions::default(),
            key_attribute: DEFAULT_KEY_ATTRIBUTE.to_string(),
            retain: 10,
            full_output: OutputTarget {
                path: sibling("records.xml"),
                chunk_size: 500,
            },
            update_output: OutputTarget {
                path: sibling("records_updated.xml"),
                chunk_size: 0,
            },
            snapshot_path,
            mode: SyncMode::Auto,
            config_hash: None,
        }
    }
}

/// Drives one run through the [`SyncState`] machine.
///
/// Non-retrying: the first failure ends the run in `Failed`.
pub struct SyncOrchestrator {
    job: SyncJob,
    mapper: Mapper,
    lookup: Box<dyn IdentifierLookup + Send + Sync>,
    state: SyncState,
}

struct Mapped {
    elements: Vec<MappedElement>,
    target: OutputTarget,
    outcome: SyncOutcome,
    diff: Option<DiffSummary>,
}

impl SyncOrchestrator {
    /// The mapper observes the job's cancel flag.
    pub fn new(job: SyncJob, mapper: Mapper) -> Self {
        let mapper = mapper.with_cancel(job.fetch.cancel.clone());
        Self {
            job,
            mapper,
            lookup: Box::new(AssumeKnown),
            state: SyncState::Idle,
        }
    }

    /// Consult `lookup` before emitting retractions for removed records.
    pub fn with_lookup(mut self, lookup: impl IdentifierLookup + Send + Sync + 'static) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn job(&self) -> &SyncJob {
        &self.job
    }

    /// Run with today's local date on removal annotations.
    pub async fn run<C>(&mut self, conn: &mut C) -> Result<SyncReport, SyncError>
    where
        C: DirectoryConnection + ?Sized,
    {
        self.run_on(conn, Local::now().date_naive()).await
    }

    pub async fn run_on<C>(
        &mut self,
        conn: &mut C,
        removal_date: NaiveDate,
    ) -> Result<SyncReport, SyncError>
    where
        C: DirectoryConnection + ?Sized,
    {
        let started_at_utc = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, mode = ?self.job.mode, snapshot = %self.job.snapshot_path.display(), "sync run start");

        match self.execute(conn, removal_date, run_id, started_at_utc).await {
            Ok(report) => {
                info!(
                    %run_id,
                    outcome = ?report.outcome,
                    documents = report.documents.len(),
                    elements = report.elements,
                    "sync run done"
                );
                Ok(report)
            }
            Err(err) => {
                // Failed is reachable from every non-terminal state.
                if !self.state.is_terminal() {
                    self.state = SyncState::Failed(err.failure_kind());
                }
                error!(%run_id, stage = %err.stage, error = %err, "sync run failed");
                Err(err)
            }
        }
    }

    fn advance(&mut self, next: SyncState) -> Result<(), SyncError> {
        self.state = self
            .state
            .advance(next)
            .map_err(|e| SyncError::new(self.state, SyncErrorKind::IllegalTransition(e)))?;
        Ok(())
    }

    fn fail(&self, kind: SyncErrorKind) -> SyncError {
        SyncError::new(self.state, kind)
    }

    fn check_cancel(&self) -> Result<(), SyncError> {
        if self.job.fetch.cancel.is_cancelled() {
            return Err(self.fail(SyncErrorKind::Cancelled));
        }
        Ok(())
    }

    async fn execute<C>(
        &mut self,
        conn: &mut C,
        removal_date: NaiveDate,
        run_id: Uuid,
        started_at_utc: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError>
    where
        C: DirectoryConnection + ?Sized,
    {
        // ---- Fetching --------------------------------------------------------
        self.advance(SyncState::Fetching)?;
        let fetched = fetch(conn, &self.job.request, &self.job.fetch)
            .await
            .map_err(|e| self.fail(SyncErrorKind::Directory(e)))?;
        let records = fetched.records;
        let counts = FetchCounts {
            pages: fetched.stats.pages,
            records: records.len(),
            skipped: fetched.stats.skipped,
        };

        let previous = match self.job.mode {
            SyncMode::Full => None,
            SyncMode::Auto => match lmx_snapshot::load(&self.job.snapshot_path) {
                Ok(prev) => Some(prev),
                Err(StorageError::NotFound { .. }) => {
                    info!(snapshot = %self.job.snapshot_path.display(), "no snapshot; full export");
                    None
                }
                // The snapshot is read on behalf of the diff.
                Err(e) => {
                    return Err(SyncError::new(
                        SyncState::Diffing,
                        SyncErrorKind::Storage(e),
                    ))
                }
            },
        };

        // ---- Diffing / Mapping ------------------------------------------------
        let mapped = match previous {
            Some(prev) => {
                self.advance(SyncState::Diffing)?;
                let entries = lmx_reconcile::diff_by_key(&records, &prev, &self.job.key_attribute)
                    .map_err(|e| self.fail(SyncErrorKind::Reconcile(e)))?;
                let summary = DiffSummary::of(&entries);
                info!(%summary, "diff computed");

                if summary.is_empty() {
                    self.advance(SyncState::Done)?;
                    return Ok(self.report(
                        run_id,
                        started_at_utc,
                        counts,
                        Mapped {
                            elements: Vec::new(),
                            target: self.job.update_output.clone(),
                            outcome: SyncOutcome::Unchanged,
                            diff: Some(summary),
                        },
                        Vec::new(),
                        None,
                    ));
                }

                self.advance(SyncState::Mapping)?;
                let elements = self
                    .mapper
                    .map_diff_with_lookup(&entries, removal_date, self.lookup.as_ref())
                    .map_err(|e| self.fail(SyncErrorKind::Mapping(e)))?;
                Mapped {
                    elements,
                    target: self.job.update_output.clone(),
                    outcome: SyncOutcome::Updated,
                    diff: Some(summary),
                }
            }
            None => {
                lmx_reconcile::check_keys(&records, &self.job.key_attribute)
                    .map_err(|e| self.fail(SyncErrorKind::Reconcile(e)))?;
                self.advance(SyncState::Mapping)?;
                let elements = self
                    .mapper
                    .map_records(&records)
                    .map_err(|e| self.fail(SyncErrorKind::Mapping(e)))?;
                Mapped {
                    elements,
                    target: self.job.full_output.clone(),
                    outcome: SyncOutcome::Exported,
                    diff: None,
                }
            }
        };

        // ---- Writing -----------------------------------------------------------
        self.advance(SyncState::Writing)?;
        let documents = lmx_marc::emit_with_cancel(
            &mapped.elements,
            mapped.target.chunk_size,
            &mapped.target.path,
            &self.job.fetch.cancel,
        )
        .map_err(|e| self.fail(SyncErrorKind::Mapping(e)))?;

        let staged = lmx_snapshot::staged_path(&self.job.snapshot_path);
        lmx_snapshot::save(&staged, &records).map_err(|e| self.fail(SyncErrorKind::Storage(e)))?;
        self.check_cancel()?;

        // ---- Rotating ----------------------------------------------------------
        self.advance(SyncState::Rotating)?;
        let rotation = lmx_snapshot::rotate(&self.job.snapshot_path, self.job.retain)
            .map_err(|e| self.fail(SyncErrorKind::Storage(e)))?;
        for failure in &rotation.failed {
            warn!(path = %failure.path.display(), reason = %failure.reason, "snapshot archive not pruned");
        }
        lmx_snapshot::promote_staged(&staged, &self.job.snapshot_path)
            .map_err(|e| self.fail(SyncErrorKind::Storage(e)))?;

        self.advance(SyncState::Done)?;
        Ok(self.report(
            run_id,
            started_at_utc,
            counts,
            mapped,
            documents,
            Some(rotation),
        ))
    }

    fn report(
        &self,
        run_id: Uuid,
        started_at_utc: DateTime<Utc>,
        fetch: FetchCounts,
        mapped: Mapped,
        documents: Vec<PathBuf>,
        rotation: Option<RotationReport>,
    ) -> SyncReport {
        SyncReport {
            schema_version: REPORT_SCHEMA_VERSION,
            run_id,
            started_at_utc,
            finished_at_utc: Utc::now(),
            config_hash: self.job.config_hash.clone(),
            outcome: mapped.outcome,
            fetch,
            diff: mapped.diff,
            elements: mapped.elements.len(),
            documents,
            snapshot_path: self.job.snapshot_path.clone(),
            rotation,
        }
    }
}
