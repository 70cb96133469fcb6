//! Pipeline components: dedup gate and run orchestrator.

pub mod dedup;
pub mod run;

pub use dedup::{classify_record, partition, Disposition, PartitionOutcome, TrackedListing};
pub use run::{RunFailure, Runner};
