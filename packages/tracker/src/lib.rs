//! Job Tracking & Analysis Pipeline Library
//!
//! A library for running a personal job-search pipeline: scrape listings,
//! deduplicate them against a durable record store, score the new ones
//! against a CV with an LLM, and export matches to a spreadsheet.
//!
//! # Design Philosophy
//!
//! **At-most-once, resumable by construction**
//!
//! - Every job moves forward through NEW -> ANALYZED -> EXPORTED, never back
//! - All collaborators sit behind narrow traits; the store owns correctness
//! - Per-job failures are isolated; run-fatal failures preserve progress
//! - A re-run after any interruption resumes instead of re-doing work
//!
//! # Usage
//!
//! ```rust,ignore
//! use tracker::{MemoryStore, Runner, SearchConfig, AnalysisConfig};
//! use tracker::testing::{MockScraper, MockAnalyzer, MockExporter, StaticCv, sample_listing};
//!
//! let runner = Runner::new(
//!     MemoryStore::new(),
//!     MockScraper::new(vec![sample_listing("1")]),
//!     MockAnalyzer::new(),
//!     MockExporter::new(),
//!     StaticCv::sample(),
//! );
//!
//! let search = SearchConfig::for_role("Germany", "Senior Product Manager");
//! let summary = runner.run(&search, &AnalysisConfig::default()).await?;
//! println!("exported {} jobs", summary.exported_count);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (RecordStore, Scraper, Analyzer, Exporter, CvSource)
//! - [`types`] - Records, listings, configs, run summaries
//! - [`pipeline`] - Dedup gate and run orchestrator
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore)
//! - [`analyzers`] - Analyzer implementations and prompt/response plumbing
//! - [`exporters`] - Exporter implementations (JSONL, Google Sheets)
//! - [`scrapers`] - Scraper implementations (Apify LinkedIn actor)
//! - [`archive`] - Raw scrape payload archive
//! - [`cv`] - Markdown CV parsing
//! - [`testing`] - Mock collaborators for testing

pub mod analyzers;
pub mod archive;
pub mod cv;
pub mod error;
pub mod exporters;
pub mod pipeline;
pub mod scrapers;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{Result, TrackerError};
pub use traits::{
    analyzer::Analyzer,
    cv::CvSource,
    exporter::{ExportOutcome, ExportRow, Exporter},
    scraper::Scraper,
    store::{RecordFilter, RecordStore},
};
pub use types::{
    analysis::AnalysisResult,
    config::{AnalysisConfig, RetryPolicy, SearchConfig},
    listing::RawListing,
    record::{JobRecord, JobState, Recommendation},
    run::{RunRecord, RunStage, RunSummary, StoreStats},
};

// Re-export pipeline components
pub use pipeline::{
    classify_record, partition, Disposition, PartitionOutcome, RunFailure, Runner, TrackedListing,
};

// Re-export the payload archive
pub use archive::PayloadArchive;

// Re-export CV helpers
pub use cv::{format_cv_for_prompt, parse_markdown_cv, FileCvSource};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

// Re-export analyzers
pub use analyzers::{build_prompt, parse_analysis_response, RateLimitedAnalyzer};

#[cfg(feature = "claude")]
pub use analyzers::ClaudeAnalyzer;

// Re-export exporters
pub use exporters::JsonlExporter;

#[cfg(feature = "sheets")]
pub use exporters::SheetsExporter;

// Re-export scrapers
#[cfg(feature = "apify")]
pub use scrapers::ApifyScraper;
