//! # tuxid-core
//!
//! **How identifying is each signal your machine leaks, and how long does it stick?**
//!
//! `tuxid-core` is the signal scoring engine behind tuxid. It takes a corpus of
//! machine-identifying signal observations (hostname, MAC address, board
//! serials, kernel version, ...) collected from many devices across several
//! boots and computes, per signal:
//!
//! - **entropy**: normalized Shannon entropy in `[0, 1]` of the signal's
//!   values across devices. 1 means every device reports a different value.
//! - **stability**: the percentage of repeat samples that match the device's
//!   reference sample, or undefined when no device was sampled twice.
//!
//! ## Quick Start
//!
//! ```
//! use tuxid_core::{IngestConfig, ScoringConfig, SignalRegistry, assemble, ingest_csv};
//!
//! let corpus = "Device ID,Sequence,Signal Name,Value\n\
//!               d1,1,Hostname,alpha\n\
//!               d1,2,Hostname,alpha\n\
//!               d2,1,Hostname,beta\n";
//! let set = ingest_csv(corpus.as_bytes(), &IngestConfig::default()).unwrap();
//! let report = assemble(&set, SignalRegistry::builtin(), &ScoringConfig::default());
//!
//! let host = report.row("Hostname").unwrap();
//! assert_eq!(host.entropy, 1.0);
//! assert_eq!(host.stability, Some(100.0));
//! ```
//!
//! ## Architecture
//!
//! Ingestion → {Entropy, Stability} (in parallel) → Report
//!
//! The engine is a pure batch computation: it never collects signals, never
//! persists anything, and holds no state between runs. Reading the corpus
//! from disk is the only I/O, and it finishes before scoring starts.

pub mod config;
pub mod entropy;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod report;
pub mod stability;

pub use config::{ReferenceMode, ScoringConfig};
pub use entropy::{SignalEntropy, compute_entropy, normalized_entropy, shannon_entropy};
pub use error::{Result, Statistic, TuxidError, Warning};
pub use ingest::{
    ColumnNames, IngestConfig, IngestStats, Observation, ObservationSet, ingest_csv, ingest_path,
    ingest_samples_dir,
};
pub use registry::{ReadPrivilege, SignalCategory, SignalDefinition, SignalRegistry};
pub use report::{
    CSV_COLUMNS, DEFAULT_PRECISION, NULL_MARKER, OutputFormat, Report, ReportRow, assemble,
};
pub use stability::{SignalStability, compute_stability, load_stability_table};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
