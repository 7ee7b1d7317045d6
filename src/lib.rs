//! Ethobout - Batch engine for reconstructing behavioral bouts from
//! START/STOP observation logs
//!
//! Ethobout turns timestamped observation events into continuous behavioral
//! episodes through a deterministic pipeline: label normalization →
//! start/stop matching → bout merging → statistics aggregation → result
//! assembly. Each subject's pipeline is independent; a failing subject is
//! reported without aborting the batch.
//!
//! ## Modules
//!
//! - **schema**: input record contract, delimited-text and JSON readers
//! - **normalizer / matcher / merger / stats**: the pipeline stages
//! - **assembler / pipeline**: report packaging and orchestration

pub mod assembler;
pub mod config;
pub mod error;
pub mod matcher;
pub mod merger;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod stats;
pub mod table;
pub mod types;

pub use assembler::{AnalysisReport, SubjectBundle, SubjectFailure};
pub use config::{EngineConfig, InterboutGrouping, MergeScope};
pub use error::EngineError;
pub use pipeline::{analyze_events, BoutEngine};

// Schema exports
pub use schema::{EventKind, RawEvent, RecordReader, REQUIRED_COLUMNS};

// Core data model exports
pub use table::{Cell, Table};
pub use types::{Bout, MatchedInterval, SummaryStats};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report provenance
pub const PRODUCER_NAME: &str = "ethobout";
