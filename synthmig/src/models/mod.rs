//! Data models shared across the migration pipeline.
//!
//! - [`monitor`]: normalized snapshot of a source (Uptrends) monitor
//! - [`classification`]: output of the classification stage
//! - [`generated`]: the Elastic Synthetics configuration produced for a monitor
//! - [`validation`]: pass/fail results with ordered violation lists
//! - [`report`]: per-run migration report

pub mod classification;
pub mod generated;
pub mod monitor;
pub mod report;
pub mod validation;

pub use classification::{Archetype, Classification, ClassificationOrigin, RecommendedConfig};
pub use generated::{ArchetypeFields, GeneratedConfig};
pub use monitor::{MonitorRecord, MonitorSummary, RequestHeader, SourceMonitorType};
pub use report::{MigrationReport, MonitorOutcome, MonitorStats};
pub use validation::ValidationResult;
