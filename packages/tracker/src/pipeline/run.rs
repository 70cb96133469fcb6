//! Run orchestrator - scrape, dedup, analyze, filter, export, commit.
//!
//! Stage machine per run: SCRAPING -> DEDUPING -> ANALYZING -> EXPORTING ->
//! DONE, with failure reachable from any stage. Per-job errors inside
//! ANALYZING and EXPORTING mark that job FAILED and continue; run-fatal
//! errors stop stage progression but preserve everything already committed.
//! The design is append-forward and idempotent, so a re-run after an
//! interruption resumes where the interrupted run left off.

use std::sync::Mutex;

use chrono::Utc;
use futures::{stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::archive::PayloadArchive;
use crate::error::{Result, TrackerError};
use crate::pipeline::dedup::{self, TrackedListing};
use crate::traits::{
    analyzer::Analyzer,
    cv::CvSource,
    exporter::{ExportRow, Exporter},
    scraper::Scraper,
    store::{RecordFilter, RecordStore},
};
use crate::types::{
    config::{AnalysisConfig, RetryPolicy, SearchConfig},
    listing::RawListing,
    record::JobState,
    run::{RunRecord, RunStage, RunSummary},
};

/// A run-fatal failure, carrying the progress made before it.
#[derive(Debug, Error)]
#[error("run {} failed during {stage}: {source}", .partial.run_id)]
pub struct RunFailure {
    pub stage: RunStage,
    pub partial: RunSummary,
    #[source]
    pub source: TrackerError,
}

/// Orchestrates one end-to-end pipeline run over the five collaborators.
pub struct Runner<St, Sc, An, Ex, Cv> {
    store: St,
    scraper: Sc,
    analyzer: An,
    exporter: Ex,
    cv: Cv,
    archive: Option<PayloadArchive>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl<St, Sc, An, Ex, Cv> Runner<St, Sc, An, Ex, Cv>
where
    St: RecordStore,
    Sc: Scraper,
    An: Analyzer,
    Ex: Exporter,
    Cv: CvSource,
{
    /// Wire up a runner with default retry behavior and no payload archive.
    pub fn new(store: St, scraper: Sc, analyzer: An, exporter: Ex, cv: Cv) -> Self {
        Self {
            store,
            scraper,
            analyzer,
            exporter,
            cv,
            archive: None,
            retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Archive raw scrape payloads under the given archive.
    pub fn with_archive(mut self, archive: PayloadArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Override the scrape retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Token for aborting the run between jobs. Cancellation never leaves a
    /// half-committed job; un-committed jobs are retried on the next run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute one run.
    pub async fn run(
        &self,
        search: &SearchConfig,
        analysis: &AnalysisConfig,
    ) -> std::result::Result<RunSummary, RunFailure> {
        let started_at = Utc::now();
        let run_id = format!("run_{}", started_at.format("%Y%m%d_%H%M%S"));
        let mut summary = RunSummary::new(run_id.clone());

        // CV loads once per run; an empty CV would poison every analysis.
        let cv_text = match self.cv.load().await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                return Err(self
                    .fail(RunStage::Scraping, &summary, started_at, TrackerError::config("CV text is empty"))
                    .await)
            }
            Err(e) => return Err(self.fail(RunStage::Scraping, &summary, started_at, e).await),
        };

        // SCRAPING
        info!(%run_id, stage = %RunStage::Scraping, "starting run");
        let listings = match self.scrape_with_retry(search).await {
            Ok(listings) => listings,
            Err(e) => return Err(self.fail(RunStage::Scraping, &summary, started_at, e).await),
        };
        summary.scraped_count = listings.len();
        info!(%run_id, count = listings.len(), "scrape complete");

        let payload_ref = match &self.archive {
            Some(archive) => match archive.archive_batch(&run_id, &listings) {
                Ok(path) => Some(path),
                Err(e) => return Err(self.fail(RunStage::Scraping, &summary, started_at, e).await),
            },
            None => None,
        };

        // DEDUPING
        info!(%run_id, stage = %RunStage::Deduping, "partitioning batch");
        let outcome = match dedup::partition(
            &self.store,
            &listings,
            &analysis.model_tag,
            started_at,
            payload_ref.as_deref(),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(RunStage::Deduping, &summary, started_at, e).await),
        };
        summary.new_count = outcome.to_analyze.len();
        summary.already_done_count = outcome.already_done.len();
        summary.malformed_count = outcome.malformed_count;

        let mut to_analyze = outcome.to_analyze;
        if to_analyze.len() > analysis.max_jobs_to_analyze {
            warn!(
                %run_id,
                dropped = to_analyze.len() - analysis.max_jobs_to_analyze,
                cap = analysis.max_jobs_to_analyze,
                "analysis cap reached; remaining jobs stay NEW for the next run"
            );
            to_analyze.truncate(analysis.max_jobs_to_analyze);
        }

        // ANALYZING
        info!(%run_id, stage = %RunStage::Analyzing, count = to_analyze.len(), "analyzing jobs");
        if let Err(e) = self
            .analyze_batch(&to_analyze, &cv_text, analysis, &mut summary)
            .await
        {
            return Err(self.fail(RunStage::Analyzing, &summary, started_at, e).await);
        }

        // EXPORTING
        info!(%run_id, stage = %RunStage::Exporting, "exporting matches");
        if let Err(e) = self.export_matches(analysis, &mut summary).await {
            return Err(self.fail(RunStage::Exporting, &summary, started_at, e).await);
        }

        // DONE
        let record = RunRecord::from_summary(&summary, started_at);
        if let Err(e) = self.store.record_run(&record).await {
            return Err(self.fail(RunStage::Done, &summary, started_at, e).await);
        }
        info!(
            %run_id,
            stage = %RunStage::Done,
            scraped = summary.scraped_count,
            new = summary.new_count,
            analyzed = summary.analyzed_count,
            exported = summary.exported_count,
            failed = summary.failed_job_ids.len(),
            "run complete"
        );
        Ok(summary)
    }

    /// Scrape with bounded exponential backoff.
    async fn scrape_with_retry(&self, config: &SearchConfig) -> Result<Vec<RawListing>> {
        let mut attempt = 1;
        loop {
            match self.scraper.scrape(config).await {
                Ok(listings) => return Ok(listings),
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "scrape failed, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancel.cancelled() => return Err(TrackerError::Cancelled),
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Analyze jobs with bounded concurrency, isolating per-job failures.
    ///
    /// A malformed response marks that job FAILED and the batch continues.
    /// Anything else (quota, auth, storage, an illegal transition) is fatal:
    /// in-flight jobs finish, queued jobs are left untouched for the next
    /// run, and the first fatal error is returned.
    async fn analyze_batch(
        &self,
        to_analyze: &[TrackedListing],
        cv_text: &str,
        analysis: &AnalysisConfig,
        summary: &mut RunSummary,
    ) -> Result<()> {
        enum JobOutcome {
            Analyzed,
            Failed(String),
            Aborted,
        }

        // First fatal error wins; later ones are dropped.
        fn set_fatal(slot: &Mutex<Option<TrackerError>>, e: TrackerError) {
            let mut slot = slot.lock().unwrap();
            if slot.is_none() {
                *slot = Some(e);
            }
        }

        let fatal: Mutex<Option<TrackerError>> = Mutex::new(None);
        let fatal_ref = &fatal;

        let outcomes: Vec<JobOutcome> = stream::iter(to_analyze.iter())
            .map(|tracked| async move {
                let job_id = tracked.record.job_id.as_str();

                if fatal_ref.lock().unwrap().is_some() {
                    return JobOutcome::Aborted;
                }
                if self.cancel.is_cancelled() {
                    set_fatal(fatal_ref, TrackerError::Cancelled);
                    return JobOutcome::Aborted;
                }

                match self
                    .analyzer
                    .analyze(&tracked.listing, cv_text, &analysis.model_tag)
                    .await
                {
                    Ok(result) => match self.store.set_analysis(job_id, &result).await {
                        Ok(record) => {
                            info!(job_id, score = result.score, title = %record.title, "job analyzed");
                            JobOutcome::Analyzed
                        }
                        Err(e) => {
                            set_fatal(fatal_ref, e);
                            JobOutcome::Aborted
                        }
                    },
                    Err(e @ TrackerError::AnalysisMalformed { .. }) => {
                        warn!(job_id, error = %e, "analysis failed for job, continuing");
                        // An EXPORTED record on the re-analysis path stays
                        // EXPORTED; the new model tag retries it next run.
                        if tracked.record.state == JobState::Exported {
                            return JobOutcome::Failed(job_id.to_string());
                        }
                        match self.store.mark_failed(job_id, &e.to_string()).await {
                            Ok(_) => JobOutcome::Failed(job_id.to_string()),
                            Err(store_err) => {
                                set_fatal(fatal_ref, store_err);
                                JobOutcome::Aborted
                            }
                        }
                    }
                    Err(e) => {
                        set_fatal(fatal_ref, e);
                        JobOutcome::Aborted
                    }
                }
            })
            .buffered(analysis.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                JobOutcome::Analyzed => summary.analyzed_count += 1,
                JobOutcome::Failed(job_id) => summary.failed_job_ids.push(job_id),
                JobOutcome::Aborted => {}
            }
        }

        match fatal.into_inner().unwrap() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Export every ANALYZED job at or above the threshold for the current
    /// model tag, including jobs analyzed by an earlier interrupted run.
    ///
    /// A job is marked EXPORTED only after the exporter confirms the row,
    /// so a failed export can never be recorded as done. Transport failure
    /// stops the stage; the remaining jobs stay ANALYZED and are retried on
    /// the next run.
    async fn export_matches(
        &self,
        analysis: &AnalysisConfig,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let filter = RecordFilter::for_state(JobState::Analyzed)
            .with_min_score(analysis.match_score_threshold)
            .with_model_tag(analysis.model_tag.clone());
        let matches = self.store.query(&filter).await?;

        for record in matches {
            if self.cancel.is_cancelled() {
                return Err(TrackerError::Cancelled);
            }

            let row = ExportRow::from_record(&record, Utc::now());
            match self.exporter.append_if_absent(std::slice::from_ref(&row)).await {
                Ok(outcome) => {
                    self.store.mark_exported(&record.job_id).await?;
                    summary.exported_count += 1;
                    info!(
                        job_id = %record.job_id,
                        appended = outcome.appended,
                        already_present = outcome.skipped,
                        "job exported"
                    );
                }
                Err(TrackerError::ExportRejected { job_id, reason }) => {
                    warn!(job_id = %job_id, %reason, "export rejected row, continuing");
                    self.store.mark_failed(&job_id, &reason).await?;
                    summary.failed_job_ids.push(job_id);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Record whatever progress was made, then build the failure.
    async fn fail(
        &self,
        stage: RunStage,
        summary: &RunSummary,
        started_at: chrono::DateTime<Utc>,
        source: TrackerError,
    ) -> RunFailure {
        let record = RunRecord::from_summary(summary, started_at);
        if let Err(e) = self.store.record_run(&record).await {
            warn!(error = %e, "could not record failed run");
        }
        RunFailure {
            stage,
            partial: summary.clone(),
            source,
        }
    }
}
