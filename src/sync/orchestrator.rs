use crate::catalog::{reconcile, ProductVariant};
use crate::codec;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::shopify::{CatalogFetcher, ShopifyApi};
use crate::store::{FileStore, ProductTable};
use crate::sync::run::{Stage, StageState, SyncRun, SyncStatus};
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

/// What to run and with which operator inputs.
#[derive(Clone, Debug)]
pub struct SyncOptions {
    /// Stages to execute, in pipeline order. Unlisted stages are marked
    /// Skipped.
    pub stages: Vec<Stage>,
    /// Flat-file name under `imports/` for the Import stage.
    pub import_file: Option<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            stages: Stage::ALL.to_vec(),
            import_file: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub state: StageState,
    pub detail: String,
}

/// Export stage output handed back for delivery (e.g. a download).
#[derive(Clone, Debug)]
pub struct ExportArtifact {
    pub locator: String,
    pub bytes: Bytes,
}

#[derive(Debug)]
pub struct SyncReport {
    pub stages: Vec<StageReport>,
    /// True only when every attempted stage succeeded.
    pub succeeded: bool,
    /// Final status line; names each failed stage and its error.
    pub summary: String,
    pub export: Option<ExportArtifact>,
}

/// Drives one synchronization run: Pull → Import → Push → Export, strictly
/// in order, each stage attempted even when a predecessor failed. Stage
/// failures are recorded and reported, never propagated as a run abort.
///
/// Holds the collaborators for the whole run; the product table must not be
/// shared with a concurrent run (callers keep one run in flight at a time).
/// Cancellation simply drops the future mid-stage; committed upserts remain,
/// which is safe because upserts are idempotent by SKU.
pub struct Orchestrator<A, T, F> {
    api: A,
    table: T,
    files: F,
    cfg: SyncConfig,
    status_tx: watch::Sender<SyncStatus>,
}

impl<A, T, F> Orchestrator<A, T, F>
where
    A: ShopifyApi,
    T: ProductTable,
    F: FileStore,
{
    pub fn new(api: A, table: T, files: F, cfg: SyncConfig) -> Self {
        let (status_tx, _) = watch::channel(SyncRun::new().status());
        Self {
            api,
            table,
            files,
            cfg,
            status_tx,
        }
    }

    /// Observe run status: current stage, per-stage states, progress,
    /// last message.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    fn publish(&self, run: &SyncRun) {
        self.status_tx.send_replace(run.status());
    }

    pub async fn run(&self, opts: &SyncOptions) -> SyncReport {
        let mut run = SyncRun::new();
        for stage in Stage::ALL {
            if !opts.stages.contains(&stage) {
                run.skip_stage(stage);
            }
        }
        self.publish(&run);

        let mut reports = Vec::with_capacity(Stage::ALL.len());
        let mut export = None;
        for stage in Stage::ALL {
            if run.state_of(stage) == StageState::Skipped {
                reports.push(StageReport {
                    stage,
                    state: StageState::Skipped,
                    detail: "skipped".into(),
                });
                continue;
            }
            run.start_stage(stage);
            self.publish(&run);

            let result = match stage {
                Stage::Pull => self.stage_pull(&mut run).await,
                Stage::Import => self.stage_import(&mut run, opts).await,
                Stage::Push => self.stage_push(&mut run).await,
                Stage::Export => match self.stage_export(&mut run).await {
                    Ok(artifact) => {
                        let detail = format!(
                            "exported {} bytes to {}",
                            artifact.bytes.len(),
                            artifact.locator
                        );
                        export = Some(artifact);
                        Ok(detail)
                    }
                    Err(e) => Err(e),
                },
            };

            match result {
                Ok(detail) => {
                    info!(stage = %stage, detail = %detail, "stage succeeded");
                    run.succeed_stage(stage, detail.clone());
                    reports.push(StageReport {
                        stage,
                        state: StageState::Succeeded,
                        detail,
                    });
                }
                Err(e) => {
                    error!(stage = %stage, error = %e, "stage failed");
                    run.fail_stage(stage, e.to_string());
                    reports.push(StageReport {
                        stage,
                        state: StageState::Failed,
                        detail: e.to_string(),
                    });
                }
            }
            self.publish(&run);
        }

        let failures: Vec<String> = reports
            .iter()
            .filter(|r| r.state == StageState::Failed)
            .map(|r| format!("{}: {}", r.stage, r.detail))
            .collect();
        let succeeded = failures.is_empty();
        let summary = if succeeded {
            "sync completed".to_string()
        } else {
            format!("sync failed ({})", failures.join("; "))
        };
        run.finish(summary.clone());
        self.publish(&run);

        SyncReport {
            stages: reports,
            succeeded,
            summary,
            export,
        }
    }

    /// Pull: full catalog fetch from the remote platform, merged into the
    /// table.
    async fn stage_pull(&self, run: &mut SyncRun) -> Result<String, SyncError> {
        let fetched = CatalogFetcher::new(&self.api, &self.cfg).fetch_all().await?;
        run.report_progress(
            fetched.variants.len() as u64,
            None,
            format!(
                "fetched {} variants from {} products",
                fetched.variants.len(),
                fetched.products_seen
            ),
        );
        self.publish(run);

        let persisted = self.table.read_all().await?;
        let merged = reconcile(&fetched.variants, &[], &persisted);
        let records: Vec<ProductVariant> = merged.records.into_values().collect();
        let total = records.len() as u64;
        let written = self.table.upsert(&records).await?;
        run.report_progress(total, Some(total), "table updated");
        self.publish(run);
        Ok(format!(
            "pulled {} variants ({} pages, {} enrichment failures, {} dropped), wrote {written} rows",
            fetched.variants.len(),
            fetched.pages_seen,
            fetched.enrichment_failures,
            merged.dropped
        ))
    }

    /// Import: decode the operator's flat file and merge it into the table.
    /// A missing file name is a caller precondition violation, reported as
    /// `MissingInput` rather than retried.
    async fn stage_import(&self, run: &mut SyncRun, opts: &SyncOptions) -> Result<String, SyncError> {
        let name = opts
            .import_file
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SyncError::MissingInput("no import file supplied".into()))?;
        let locator = format!("imports/{name}");
        let bytes = self.files.retrieve(&locator).await?;
        let imported = codec::decode(&bytes)?;
        run.report_progress(
            imported.len() as u64,
            None,
            format!("decoded {} rows from {locator}", imported.len()),
        );
        self.publish(run);

        let persisted = self.table.read_all().await?;
        let merged = reconcile(&[], &imported, &persisted);
        let records: Vec<ProductVariant> = merged.records.into_values().collect();
        let total = records.len() as u64;
        let written = self.table.upsert(&records).await?;
        run.report_progress(total, Some(total), "table updated");
        self.publish(run);
        Ok(format!(
            "imported {} rows from {locator} ({} dropped), wrote {written} rows",
            imported.len(),
            merged.dropped
        ))
    }

    /// Push: hand the persisted snapshot to the remote write endpoint. The
    /// remote owns the schema; only success or failure is checked here.
    async fn stage_push(&self, run: &mut SyncRun) -> Result<String, SyncError> {
        let records = self.table.read_all().await?;
        let total = records.len() as u64;
        run.report_progress(0, Some(total), format!("pushing {total} records"));
        self.publish(run);
        self.api.push_catalog(&records).await?;
        run.report_progress(total, Some(total), "push accepted");
        self.publish(run);
        Ok(format!("pushed {total} records"))
    }

    /// Export: serialize a fresh table snapshot to the file store, then
    /// read the artifact back for delivery.
    async fn stage_export(&self, run: &mut SyncRun) -> Result<ExportArtifact, SyncError> {
        let records = self.table.read_all().await?;
        let encoded = codec::encode(&records)?;
        let name = format!("exports/{}.csv", Utc::now().format("%Y-%m-%d"));
        let locator = self.files.store(&name, encoded).await?;
        run.report_progress(
            records.len() as u64,
            None,
            format!("stored {} rows at {locator}", records.len()),
        );
        self.publish(run);

        let bytes = self
            .files
            .retrieve(&locator)
            .await
            .map_err(|e| match e {
                SyncError::ExportUnavailable { .. } => e,
                other => SyncError::ExportUnavailable {
                    locator: locator.clone(),
                    detail: other.to_string(),
                },
            })?;
        Ok(ExportArtifact { locator, bytes })
    }
}
