//! Integration tests for the full pipeline: scrape -> dedup -> analyze ->
//! threshold filter -> export -> commit, across repeated and interrupted
//! runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracker::testing::{sample_listing, MockAnalyzer, MockExporter, MockScraper, StaticCv};
use tracker::{
    AnalysisConfig, AnalysisResult, JobState, MemoryStore, PayloadArchive, RecordFilter,
    RecordStore, Recommendation, RetryPolicy, RunStage, Runner, SearchConfig, TrackerError,
};

fn search() -> SearchConfig {
    SearchConfig::for_role("Portugal", "Senior Product Manager")
}

fn analysis_m1() -> AnalysisConfig {
    AnalysisConfig::for_model("m1").with_threshold(7.0)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn test_happy_path_exports_only_above_threshold() {
    let store = Arc::new(MemoryStore::new());
    let scraper = MockScraper::new(vec![
        sample_listing("A"),
        sample_listing("B"),
        sample_listing("C"),
    ]);
    let analyzer = Arc::new(
        MockAnalyzer::new()
            .with_score("A", 8.0)
            .with_score("B", 5.0)
            .with_score("C", 3.0),
    );
    let exporter = Arc::new(MockExporter::new());

    let runner = Runner::new(
        store.clone(),
        scraper,
        analyzer.clone(),
        exporter.clone(),
        StaticCv::sample(),
    );

    let summary = runner.run(&search(), &analysis_m1()).await.unwrap();

    assert_eq!(summary.scraped_count, 3);
    assert_eq!(summary.new_count, 3);
    assert_eq!(summary.analyzed_count, 3);
    assert_eq!(summary.exported_count, 1);
    assert!(summary.failed_job_ids.is_empty());

    assert_eq!(exporter.exported_ids(), ["A"]);
    assert_eq!(store.get("A").await.unwrap().unwrap().state, JobState::Exported);
    assert_eq!(store.get("B").await.unwrap().unwrap().state, JobState::Analyzed);
    assert_eq!(store.get("C").await.unwrap().unwrap().state, JobState::Analyzed);

    // Run history was persisted.
    let history = store.run_history(5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].exported_count, 1);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let batch = vec![sample_listing("A"), sample_listing("B")];
    let analyzer = Arc::new(MockAnalyzer::new().with_score("A", 9.0).with_score("B", 2.0));
    let exporter = Arc::new(MockExporter::new());

    let runner = Runner::new(
        store.clone(),
        MockScraper::new(batch),
        analyzer.clone(),
        exporter.clone(),
        StaticCv::sample(),
    );

    runner.run(&search(), &analysis_m1()).await.unwrap();
    assert_eq!(analyzer.analyzed_ids(), ["A", "B"]);

    // Same batch again: nothing new to analyze, nothing new to export.
    let second = runner.run(&search(), &analysis_m1()).await.unwrap();
    assert_eq!(second.new_count, 0);
    assert_eq!(second.already_done_count, 2);
    assert_eq!(second.analyzed_count, 0);
    assert_eq!(second.exported_count, 0);
    assert_eq!(analyzer.analyzed_ids(), ["A", "B"]);
    assert_eq!(exporter.exported_ids(), ["A"]);
}

#[tokio::test]
async fn test_crash_resume_exports_without_reanalyzing() {
    let store = Arc::new(MemoryStore::new());

    // A previous run analyzed J but was interrupted before the export stage.
    store
        .upsert_seen("J", Utc::now(), None, &sample_listing("J"))
        .await
        .unwrap();
    store
        .set_analysis("J", &AnalysisResult::new(8.0, Recommendation::Pursue, "m1"))
        .await
        .unwrap();

    let analyzer = Arc::new(MockAnalyzer::new());
    let exporter = Arc::new(MockExporter::new());
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![sample_listing("J")]),
        analyzer.clone(),
        exporter.clone(),
        StaticCv::sample(),
    );

    let summary = runner.run(&search(), &analysis_m1()).await.unwrap();

    // J reached EXPORTED exactly once and the analyzer was never re-invoked.
    assert_eq!(summary.exported_count, 1);
    assert!(analyzer.analyzed_ids().is_empty());
    assert_eq!(exporter.exported_ids(), ["J"]);
    assert_eq!(store.get("J").await.unwrap().unwrap().state, JobState::Exported);
}

#[tokio::test]
async fn test_model_change_reanalyzes_and_reexports_idempotently() {
    let store = Arc::new(MemoryStore::new());
    let analyzer = Arc::new(MockAnalyzer::new().with_score("A", 8.0));
    let exporter = Arc::new(MockExporter::new());
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![sample_listing("A")]),
        analyzer.clone(),
        exporter.clone(),
        StaticCv::sample(),
    );

    runner.run(&search(), &analysis_m1()).await.unwrap();
    assert_eq!(exporter.exported_ids(), ["A"]);

    // New model: A is re-analyzed; the exporter's job-id dedup keeps the
    // sheet single-rowed.
    let summary = runner
        .run(&search(), &AnalysisConfig::for_model("m2").with_threshold(7.0))
        .await
        .unwrap();
    assert_eq!(summary.new_count, 1);
    assert_eq!(summary.analyzed_count, 1);
    assert_eq!(analyzer.analyzed_ids(), ["A", "A"]);
    assert_eq!(exporter.exported_ids(), ["A"]);

    let record = store.get("A").await.unwrap().unwrap();
    assert_eq!(record.state, JobState::Exported);
    assert_eq!(record.analysis_model.as_deref(), Some("m2"));
}

#[tokio::test]
async fn test_malformed_analysis_isolates_job() {
    let store = Arc::new(MemoryStore::new());
    let analyzer = Arc::new(
        MockAnalyzer::new()
            .with_score("A", 8.0)
            .with_malformed("B")
            .with_score("C", 7.5),
    );
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![
            sample_listing("A"),
            sample_listing("B"),
            sample_listing("C"),
        ]),
        analyzer.clone(),
        Arc::new(MockExporter::new()),
        StaticCv::sample(),
    );

    let summary = runner.run(&search(), &analysis_m1()).await.unwrap();
    assert_eq!(summary.analyzed_count, 2);
    assert_eq!(summary.failed_job_ids, ["B"]);
    assert_eq!(summary.exported_count, 2);
    assert_eq!(store.get("B").await.unwrap().unwrap().state, JobState::Failed);

    // Next run retries the failed job.
    let second = runner.run(&search(), &analysis_m1()).await.unwrap();
    assert_eq!(second.new_count, 1);
    assert_eq!(store.get("B").await.unwrap().unwrap().state, JobState::Failed);
}

#[tokio::test]
async fn test_analyzer_quota_failure_is_run_fatal_but_preserves_state() {
    let store = Arc::new(MemoryStore::new());
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![sample_listing("A"), sample_listing("B")]),
        Arc::new(MockAnalyzer::new().unavailable()),
        Arc::new(MockExporter::new()),
        StaticCv::sample(),
    );

    let failure = runner.run(&search(), &analysis_m1()).await.unwrap_err();
    assert_eq!(failure.stage, RunStage::Analyzing);
    assert!(matches!(failure.source, TrackerError::AnalysisUnavailable(_)));
    assert_eq!(failure.partial.scraped_count, 2);

    // Jobs stay NEW for the next run.
    for id in ["A", "B"] {
        assert_eq!(store.get(id).await.unwrap().unwrap().state, JobState::New);
    }
}

#[tokio::test]
async fn test_failed_export_stays_analyzed_and_retries_next_run() {
    let store = Arc::new(MemoryStore::new());
    let exporter = Arc::new(MockExporter::new().with_failures(1));
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![sample_listing("A")]),
        Arc::new(MockAnalyzer::new().with_score("A", 9.0)),
        exporter.clone(),
        StaticCv::sample(),
    );

    let failure = runner.run(&search(), &analysis_m1()).await.unwrap_err();
    assert_eq!(failure.stage, RunStage::Exporting);
    assert!(matches!(failure.source, TrackerError::ExportUnavailable(_)));

    // A failed export must never be recorded as EXPORTED.
    assert_eq!(store.get("A").await.unwrap().unwrap().state, JobState::Analyzed);
    assert!(exporter.exported_ids().is_empty());

    // The next run retries the export without re-analysis.
    let summary = runner.run(&search(), &analysis_m1()).await.unwrap();
    assert_eq!(summary.analyzed_count, 0);
    assert_eq!(summary.exported_count, 1);
    assert_eq!(store.get("A").await.unwrap().unwrap().state, JobState::Exported);
}

#[tokio::test]
async fn test_rejected_row_marks_job_failed_and_continues() {
    let store = Arc::new(MemoryStore::new());
    let exporter = Arc::new(MockExporter::new().with_rejected("A"));
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![sample_listing("A"), sample_listing("B")]),
        Arc::new(MockAnalyzer::new().with_score("A", 9.0).with_score("B", 8.0)),
        exporter.clone(),
        StaticCv::sample(),
    );

    let summary = runner.run(&search(), &analysis_m1()).await.unwrap();
    assert_eq!(summary.failed_job_ids, ["A"]);
    assert_eq!(summary.exported_count, 1);
    assert_eq!(exporter.exported_ids(), ["B"]);
    assert_eq!(store.get("A").await.unwrap().unwrap().state, JobState::Failed);
}

#[tokio::test]
async fn test_scrape_retries_then_succeeds() {
    let store = Arc::new(MemoryStore::new());
    let scraper = Arc::new(MockScraper::new(vec![sample_listing("A")]).with_failures(2));
    let runner = Runner::new(
        store.clone(),
        scraper.clone(),
        Arc::new(MockAnalyzer::new().with_score("A", 9.0)),
        Arc::new(MockExporter::new()),
        StaticCv::sample(),
    )
    .with_retry_policy(fast_retry());

    let summary = runner.run(&search(), &analysis_m1()).await.unwrap();
    assert_eq!(scraper.call_count(), 3);
    assert_eq!(summary.exported_count, 1);
}

#[tokio::test]
async fn test_scrape_retry_exhaustion_is_run_fatal() {
    let scraper = Arc::new(MockScraper::new(vec![sample_listing("A")]).with_failures(10));
    let runner = Runner::new(
        Arc::new(MemoryStore::new()),
        scraper.clone(),
        Arc::new(MockAnalyzer::new()),
        Arc::new(MockExporter::new()),
        StaticCv::sample(),
    )
    .with_retry_policy(fast_retry());

    let failure = runner.run(&search(), &analysis_m1()).await.unwrap_err();
    assert_eq!(failure.stage, RunStage::Scraping);
    assert!(matches!(failure.source, TrackerError::ScrapeUnavailable(_)));
    assert_eq!(scraper.call_count(), 3);
}

#[tokio::test]
async fn test_cancellation_between_jobs_leaves_state_consistent() {
    let store = Arc::new(MemoryStore::new());
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![sample_listing("A"), sample_listing("B")]),
        Arc::new(MockAnalyzer::new()),
        Arc::new(MockExporter::new()),
        StaticCv::sample(),
    );

    runner.cancellation_token().cancel();
    let failure = runner.run(&search(), &analysis_m1()).await.unwrap_err();
    assert!(matches!(failure.source, TrackerError::Cancelled));

    // Nothing was half-committed: both jobs remain NEW and are retried
    // by the next (uncancelled) run.
    for id in ["A", "B"] {
        assert_eq!(store.get(id).await.unwrap().unwrap().state, JobState::New);
    }
}

#[tokio::test]
async fn test_archive_ref_recorded_and_replayable() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let archive = PayloadArchive::new(dir.path());
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![sample_listing("A")]),
        Arc::new(MockAnalyzer::new().with_score("A", 9.0)),
        Arc::new(MockExporter::new()),
        StaticCv::sample(),
    )
    .with_archive(archive.clone());

    runner.run(&search(), &analysis_m1()).await.unwrap();

    let record = store.get("A").await.unwrap().unwrap();
    let payload_ref = record.raw_payload_ref.expect("payload ref recorded");
    let batch = archive.load(&payload_ref).unwrap();
    assert_eq!(batch.listings.len(), 1);
    assert_eq!(batch.listings[0].source_id.as_deref(), Some("A"));
}

#[tokio::test]
async fn test_analysis_cap_defers_overflow_to_next_run() {
    let store = Arc::new(MemoryStore::new());
    let runner = Runner::new(
        store.clone(),
        MockScraper::new(vec![
            sample_listing("A"),
            sample_listing("B"),
            sample_listing("C"),
        ]),
        Arc::new(MockAnalyzer::new()),
        Arc::new(MockExporter::new()),
        StaticCv::sample(),
    );

    let mut config = analysis_m1();
    config.max_jobs_to_analyze = 2;
    let summary = runner.run(&search(), &config).await.unwrap();
    assert_eq!(summary.analyzed_count, 2);

    let remaining = store
        .query(&RecordFilter::for_state(JobState::New))
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].job_id, "C");
}
