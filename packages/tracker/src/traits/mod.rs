//! Core trait abstractions for collaborators and storage.

pub mod analyzer;
pub mod cv;
pub mod exporter;
pub mod scraper;
pub mod store;

pub use analyzer::Analyzer;
pub use cv::CvSource;
pub use exporter::{ExportOutcome, ExportRow, Exporter};
pub use scraper::Scraper;
pub use store::{RecordFilter, RecordStore};
