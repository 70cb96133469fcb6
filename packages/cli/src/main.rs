//! jobscout - daily job-search pipeline.
//!
//! Scrapes LinkedIn job listings through Apify, deduplicates them against a
//! local SQLite store, scores new ones against a markdown CV with Claude,
//! and exports matches to Google Sheets (or a local JSONL file).

mod profile;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tracker::{
    AnalysisConfig, ApifyScraper, ClaudeAnalyzer, Exporter, FileCvSource, JsonlExporter,
    PayloadArchive, RateLimitedAnalyzer, RecordStore, Runner, SearchConfig, SheetsExporter,
    SqliteStore,
};

use profile::{default_search_config, Profile};

#[derive(Parser)]
#[command(name = "jobscout", about = "Job search scrape/analyze/export pipeline")]
struct Cli {
    /// Directory for the database, payload archive, and local exports.
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once.
    Run(RunArgs),

    /// Run the pipeline on a fixed interval.
    Schedule(ScheduleArgs),

    /// Show store statistics and recent run history.
    Stats,
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Configuration profile name (from <data-dir>/profiles/<name>.yaml).
    #[arg(long)]
    profile: Option<String>,

    /// Path to the markdown CV (default: <data-dir>/cv.md).
    #[arg(long)]
    cv_file: Option<PathBuf>,

    /// Countries to search (overrides profile and defaults).
    #[arg(long)]
    countries: Vec<String>,

    /// Job roles to search (overrides profile and defaults).
    #[arg(long)]
    roles: Vec<String>,

    /// Minimum match score (0-10) for export.
    #[arg(long)]
    match_threshold: Option<f64>,

    /// LLM model tag for analysis.
    #[arg(long)]
    model: Option<String>,

    /// Maximum jobs to analyze per run.
    #[arg(long)]
    max_analyze: Option<usize>,

    /// Concurrent analyzer calls.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Export to a local JSONL file instead of Google Sheets.
    #[arg(long)]
    local_export: bool,
}

#[derive(Args)]
struct ScheduleArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Hours between runs.
    #[arg(long, default_value_t = 24)]
    every_hours: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("cannot create data dir {}", cli.data_dir.display()))?;

    match &cli.command {
        Command::Run(args) => {
            let ok = run_once(&cli.data_dir, args).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Command::Schedule(args) => {
            info!(every_hours = args.every_hours, "starting scheduler");
            loop {
                if let Err(e) = run_once(&cli.data_dir, &args.run).await {
                    error!(error = %e, "scheduled run errored");
                }
                info!(hours = args.every_hours, "sleeping until next run");
                tokio::time::sleep(Duration::from_secs(args.every_hours * 3600)).await;
            }
        }
        Command::Stats => show_stats(&cli.data_dir).await?,
    }

    Ok(())
}

/// Build configs, wire collaborators, execute one run.
///
/// Returns false when the run failed (partial progress is already printed).
async fn run_once(data_dir: &PathBuf, args: &RunArgs) -> Result<bool> {
    let (search, analysis, cv_path) = build_configs(data_dir, args)?;
    info!(
        countries = search.countries.len(),
        searches = search.search_urls().len(),
        model = %analysis.model_tag,
        threshold = analysis.match_score_threshold,
        "configuration resolved"
    );

    let store = open_store(data_dir).await?;
    let scraper = ApifyScraper::from_env().context("scraper setup failed")?;
    let analyzer = RateLimitedAnalyzer::with_default_quota(
        ClaudeAnalyzer::from_env().context("analyzer setup failed")?,
    );
    let exporter = build_exporter(data_dir, args.local_export)?;
    let cv = FileCvSource::new(cv_path);
    let archive = PayloadArchive::new(data_dir.join("archive"));

    let runner = Runner::new(store, scraper, analyzer, exporter, cv).with_archive(archive);

    // Ctrl-C aborts between jobs; committed state survives.
    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current job then stopping");
            cancel.cancel();
        }
    });

    match runner.run(&search, &analysis).await {
        Ok(summary) => {
            println!(
                "Run {} complete: {} scraped, {} new, {} analyzed, {} exported, {} failed",
                summary.run_id,
                summary.scraped_count,
                summary.new_count,
                summary.analyzed_count,
                summary.exported_count,
                summary.failed_job_ids.len()
            );
            if !summary.failed_job_ids.is_empty() {
                println!("Failed job ids: {}", summary.failed_job_ids.join(", "));
            }
            Ok(true)
        }
        Err(failure) => {
            let partial = &failure.partial;
            eprintln!("Run {} failed during {}: {}", partial.run_id, failure.stage, failure.source);
            eprintln!(
                "Partial progress: {} scraped, {} new, {} analyzed, {} exported, {} failed",
                partial.scraped_count,
                partial.new_count,
                partial.analyzed_count,
                partial.exported_count,
                partial.failed_job_ids.len()
            );
            Ok(false)
        }
    }
}

fn build_configs(
    data_dir: &PathBuf,
    args: &RunArgs,
) -> Result<(SearchConfig, AnalysisConfig, PathBuf)> {
    let mut search = default_search_config();
    let mut analysis = AnalysisConfig::default();
    let mut cv_path = data_dir.join("cv.md");

    if let Some(name) = &args.profile {
        let profile = Profile::load(data_dir, name)?;
        if let Some(path) = &profile.cv_file {
            cv_path = path.clone();
        }
        profile.apply(&mut search, &mut analysis);
        info!(profile = %name, "loaded configuration profile");
    }

    if !args.countries.is_empty() {
        search.countries = args.countries.clone();
    }
    if !args.roles.is_empty() {
        search.roles.clear();
        search.roles.insert("Custom".to_string(), args.roles.clone());
    }
    if let Some(threshold) = args.match_threshold {
        analysis.match_score_threshold = threshold;
    }
    if let Some(model) = &args.model {
        analysis.model_tag = model.clone();
    }
    if let Some(max) = args.max_analyze {
        analysis.max_jobs_to_analyze = max;
    }
    if let Some(concurrency) = args.concurrency {
        analysis = analysis.with_concurrency(concurrency);
    }
    if let Some(path) = &args.cv_file {
        cv_path = path.clone();
    }

    Ok((search, analysis, cv_path))
}

async fn open_store(data_dir: &PathBuf) -> Result<SqliteStore> {
    let db_path = data_dir.join("jobs.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    SqliteStore::new(&url)
        .await
        .with_context(|| format!("cannot open job database at {}", db_path.display()))
}

/// Google Sheets when configured, local JSONL otherwise.
fn build_exporter(data_dir: &PathBuf, local_export: bool) -> Result<Box<dyn Exporter>> {
    if !local_export {
        let sheet_id = std::env::var("GOOGLE_SHEET_ID").ok();
        let token = std::env::var("GOOGLE_SHEETS_TOKEN").ok();
        if let (Some(sheet_id), Some(token)) = (sheet_id, token) {
            let sheet_name =
                std::env::var("GOOGLE_SHEET_NAME").unwrap_or_else(|_| "Job Matches".to_string());
            info!(sheet_id = %sheet_id, sheet = %sheet_name, "exporting to Google Sheets");
            return Ok(Box::new(SheetsExporter::new(token, sheet_id, sheet_name)));
        }
        warn!("GOOGLE_SHEET_ID/GOOGLE_SHEETS_TOKEN not set, falling back to local export");
    }

    let path = data_dir.join("matches.jsonl");
    info!(path = %path.display(), "exporting to local JSONL file");
    Ok(Box::new(JsonlExporter::new(path)))
}

async fn show_stats(data_dir: &PathBuf) -> Result<()> {
    let store = open_store(data_dir).await?;
    let week_ago = Utc::now() - chrono::Duration::days(7);
    let stats = store.stats(week_ago).await?;

    println!("Job database statistics:");
    println!("  Total jobs tracked: {}", stats.total_jobs);
    println!(
        "  By state: {} new, {} analyzed, {} exported, {} skipped, {} failed",
        stats.new, stats.analyzed, stats.exported, stats.skipped, stats.failed
    );
    println!("  First seen in last 7 days: {}", stats.seen_since);
    println!("  Runs in last 7 days: {}", stats.runs_since);

    let history = store.run_history(10).await?;
    if !history.is_empty() {
        println!("Recent runs:");
        for run in history {
            println!(
                "  {} ({}): {} scraped, {} new, {} analyzed, {} exported, {} failed",
                run.run_id,
                run.started_at.format("%Y-%m-%d %H:%M"),
                run.scraped_count,
                run.new_count,
                run.analyzed_count,
                run.exported_count,
                run.failed_count
            );
        }
    }
    Ok(())
}
