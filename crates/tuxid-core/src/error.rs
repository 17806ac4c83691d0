//! Fatal errors and non-fatal warnings raised by the scoring engine.
//!
//! Fatal conditions abort a run and surface as [`TuxidError`]. Everything
//! else is a [`Warning`]: accumulated on the report, logged where it is
//! raised, and never allowed to stop processing of the other signals.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, TuxidError>;

/// Fatal errors. Any of these aborts the computation.
#[derive(Error, Debug)]
pub enum TuxidError {
    /// The corpus is missing columns the engine cannot work without.
    #[error("malformed input: missing required column(s): {}", .missing.join(", "))]
    MalformedInput { missing: Vec<String> },

    /// The CSV reader failed before any row could be read (e.g. bad header).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// An input path could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Report could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Registry override or stability table could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Which statistic an [`Warning::InsufficientData`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Entropy,
    Stability,
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entropy => write!(f, "entropy"),
            Self::Stability => write!(f, "stability"),
        }
    }
}

/// Non-fatal conditions attached to a [`crate::Report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A row (or sample file) was skipped.
    MalformedRow { location: String, reason: String },
    /// Two observations for the same device, sequence and signal; one kept.
    DuplicateObservation {
        device_id: String,
        sequence_index: u32,
        signal: String,
    },
    /// Signal name not present in the registry; metadata left blank.
    UnknownSignal { signal: String },
    /// Too little data for a statistic; its degenerate value was reported.
    InsufficientData {
        signal: String,
        statistic: Statistic,
        detail: String,
    },
    /// Devices whose representative value was empty (unknown).
    MissingValues { signal: String, devices: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRow { location, reason } => {
                write!(f, "skipped malformed row at {location}: {reason}")
            }
            Self::DuplicateObservation {
                device_id,
                sequence_index,
                signal,
            } => write!(
                f,
                "duplicate observation of '{signal}' for device {device_id} at sample {sequence_index}"
            ),
            Self::UnknownSignal { signal } => {
                write!(f, "unknown signal '{signal}': metadata left blank")
            }
            Self::InsufficientData {
                signal,
                statistic,
                detail,
            } => write!(f, "insufficient data for {statistic} of '{signal}': {detail}"),
            Self::MissingValues { signal, devices } => {
                write!(f, "'{signal}' has an empty value on {devices} device(s)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_input_names_missing_columns() {
        let err = TuxidError::MalformedInput {
            missing: vec!["Signal Name".into(), "Value".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Signal Name"));
        assert!(msg.contains("Value"));
    }

    #[test]
    fn test_warning_display() {
        let w = Warning::InsufficientData {
            signal: "Hostname".into(),
            statistic: Statistic::Stability,
            detail: "no device sampled more than once".into(),
        };
        assert_eq!(
            w.to_string(),
            "insufficient data for stability of 'Hostname': no device sampled more than once"
        );
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let w = Warning::UnknownSignal {
            signal: "GPU Serial".into(),
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "unknown_signal");
        assert_eq!(json["signal"], "GPU Serial");
    }
}
