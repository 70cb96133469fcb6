//! Exporter implementations.

pub mod jsonl;

#[cfg(feature = "sheets")]
pub mod sheets;

pub use jsonl::JsonlExporter;

#[cfg(feature = "sheets")]
pub use sheets::SheetsExporter;
