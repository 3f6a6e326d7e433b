//! Run orchestration: correlation ids, both upload strategies, aggregation.

pub mod outcome;

pub use outcome::{FileMeta, RunReport, StrategyOutcome, StrategySummary};

use crate::common::RunConfig;
use crate::transfer::correlation::IssueRequest;
use crate::transfer::{
    ChunkUploader, CorrelationIssuer, MergeCoordinator, SingleShotUploader, TransferPlan,
    WorkerPool,
};
use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressDrawTarget};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Drives one full run: issue correlation ids, fan out N single-shot
/// repetitions, fan out N chunked repetitions, aggregate.
///
/// Repetitions of a phase run concurrently and are joined at one point,
/// collecting failures instead of short-circuiting. `parallelism` bounds
/// chunk workers *within* a repetition only.
pub struct Runner {
    config: RunConfig,
    client: reqwest::Client,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn run(&self, single_path: &Path, chunk_path: &Path) -> Result<RunReport> {
        let date = Utc::now();
        let repetitions = self.config.repetitions.max(1);

        let single_file = file_meta(single_path)?;
        let chunk_file = file_meta(chunk_path)?;
        let chunk_mtime_ms = mtime_millis(chunk_path);

        // One plan per run; every chunked repetition shares the same geometry.
        // A zero chunk size is fatal before anything is spawned.
        let plan = TransferPlan::new(chunk_file.size, self.config.chunk_size_bytes())?;
        tracing::info!(
            file_size = chunk_file.size,
            chunk_size = plan.chunk_size,
            total_chunks = plan.total_chunks,
            parallelism = self.config.parallelism,
            repetitions,
            "starting upload benchmark"
        );

        let correlation_ids = self.issue_correlation_ids(&chunk_file.name, repetitions).await;

        let single_outcomes = self
            .run_single_phase(single_path, repetitions, &correlation_ids)
            .await;
        let chunked_outcomes = self
            .run_chunked_phase(chunk_path, &chunk_file, chunk_mtime_ms, plan, &correlation_ids)
            .await;

        Ok(RunReport {
            date,
            repetitions,
            chunk_size: plan.chunk_size,
            single: outcome::summarize(&single_outcomes, single_file.size),
            chunked: outcome::summarize(&chunked_outcomes, chunk_file.size),
            correlation_ids,
            single_file,
            chunk_file,
        })
    }

    /// One id per repetition, all issuances in flight at once. Unconfigured
    /// issuance short-circuits to `None` without touching the network.
    async fn issue_correlation_ids(&self, chunk_filename: &str, repetitions: u32) -> Vec<Option<String>> {
        let (dir_name, ext) = split_filename(chunk_filename);
        let body = IssueRequest::from_config(&self.config, &dir_name, &ext);
        let issuer = CorrelationIssuer::new(self.client.clone(), self.config.clone());

        join_all((0..repetitions).map(|rep| {
            let body = body.clone();
            let issuer = &issuer;
            async move { issuer.issue(&body, rep).await }
        }))
        .await
    }

    async fn run_single_phase(
        &self,
        path: &Path,
        repetitions: u32,
        correlation_ids: &[Option<String>],
    ) -> Vec<StrategyOutcome> {
        let uploader = SingleShotUploader::new(self.client.clone(), self.config.clone());

        join_all((0..repetitions).map(|rep| {
            let uploader = &uploader;
            let correlation_id = correlation_ids[rep as usize].as_deref();
            async move {
                let started_at = Utc::now();
                let started = Instant::now();
                let (elapsed, failure) = match uploader.send(path, correlation_id).await {
                    Ok(elapsed) => {
                        tracing::info!(repetition = rep, elapsed_ms = elapsed.as_millis() as u64, "single upload done");
                        (elapsed, None)
                    }
                    Err(err) => {
                        tracing::warn!(repetition = rep, error = %err, "single upload failed");
                        (started.elapsed(), Some(err.to_string()))
                    }
                };
                StrategyOutcome {
                    repetition: rep,
                    started_at,
                    finished_at: Utc::now(),
                    elapsed,
                    failure,
                }
            }
        }))
        .await
    }

    /// Chunked repetitions, each owning its plan run, abort flag, and cursor.
    /// Elapsed time brackets the whole attempt: pool run plus merge.
    async fn run_chunked_phase(
        &self,
        path: &Path,
        chunk_file: &FileMeta,
        mtime_ms: u128,
        plan: TransferPlan,
        correlation_ids: &[Option<String>],
    ) -> Vec<StrategyOutcome> {
        let repetitions = correlation_ids.len() as u32;
        let merger = MergeCoordinator::new(self.client.clone(), self.config.clone());
        let progress = ProgressBar::with_draw_target(
            Some(u64::from(plan.total_chunks) * u64::from(repetitions)),
            ProgressDrawTarget::stderr(),
        );

        let outcomes = join_all((0..repetitions).map(|rep| {
            let merger = &merger;
            let progress = progress.clone();
            let correlation_id = correlation_ids[rep as usize].clone();
            let filename = chunk_file.name.clone();
            async move {
                let started_at = Utc::now();
                let started = Instant::now();
                let failure = self
                    .chunked_attempt(path, &filename, chunk_file.size, mtime_ms, plan, rep, correlation_id, merger, progress)
                    .await;
                match &failure {
                    None => tracing::info!(
                        repetition = rep,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "chunked upload and merge done"
                    ),
                    Some(reason) => {
                        tracing::warn!(repetition = rep, reason = %reason, "chunked upload failed")
                    }
                }
                StrategyOutcome {
                    repetition: rep,
                    started_at,
                    finished_at: Utc::now(),
                    elapsed: started.elapsed(),
                    failure,
                }
            }
        }))
        .await;

        progress.finish_and_clear();
        outcomes
    }

    /// Returns the failure reason, or `None` when upload and merge both
    /// landed. The merge runs only after the pool reports full success.
    #[allow(clippy::too_many_arguments)]
    async fn chunked_attempt(
        &self,
        path: &Path,
        filename: &str,
        file_size: u64,
        mtime_ms: u128,
        plan: TransferPlan,
        rep: u32,
        correlation_id: Option<String>,
        merger: &MergeCoordinator,
        progress: ProgressBar,
    ) -> Option<String> {
        let file = match File::open(path) {
            Ok(file) => Arc::new(file),
            Err(err) => return Some(format!("open {}: {err}", path.display())),
        };

        // Unique per repetition so concurrent repetitions never collide
        // server-side.
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let file_id = format!("{filename}-{file_size}-{mtime_ms}-{now_ms}-{rep}");

        let uploader = Arc::new(ChunkUploader::new(
            self.client.clone(),
            self.config.clone(),
            file,
            filename.to_string(),
            plan,
            correlation_id.clone(),
            Some(progress),
        ));

        let pool = WorkerPool::new(self.config.parallelism);
        let pool_outcome = pool.run(plan.total_chunks, uploader).await;
        if !pool_outcome.all_succeeded {
            return pool_outcome
                .failure
                .or_else(|| Some("chunk upload aborted".to_string()));
        }

        match merger
            .merge(&file_id, filename, plan.total_chunks, correlation_id.as_deref())
            .await
        {
            Ok(()) => None,
            Err(err) => Some(err.to_string()),
        }
    }
}

fn file_meta(path: &Path) -> Result<FileMeta> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("cannot stat {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(FileMeta {
        name,
        size: metadata.len(),
    })
}

fn mtime_millis(path: &Path) -> u128 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Split `name.tar.gz` into `("name.tar", "gz")`; a leading dot or no dot
/// keeps the whole name and an empty extension.
fn split_filename(filename: &str) -> (String, String) {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => (
            filename[..dot].to_string(),
            filename[dot + 1..].to_lowercase(),
        ),
        _ => (filename.to_string(), String::new()),
    }
}
