//! Scoring configuration.

use serde::Serialize;

use crate::ingest::Observation;

/// How the reference observation of a device timeline is chosen.
///
/// The reference is both the device's representative value for entropy and
/// the baseline that stability compares the other samples against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    /// Earliest sample (lowest sequence index).
    #[default]
    First,
    /// Most frequent value; ties go to the value seen earliest.
    Modal,
}

impl std::fmt::Display for ReferenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Modal => write!(f, "modal"),
        }
    }
}

impl std::str::FromStr for ReferenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "modal" => Ok(Self::Modal),
            other => Err(format!("unknown reference mode '{other}' (expected first|modal)")),
        }
    }
}

impl ReferenceMode {
    /// Index of the reference observation within one device's timeline.
    ///
    /// `timeline` must be non-empty and sorted by sequence index.
    pub fn reference_index(self, timeline: &[Observation]) -> usize {
        match self {
            Self::First => 0,
            Self::Modal => {
                let mut best = 0;
                let mut best_count = 0;
                for (i, obs) in timeline.iter().enumerate() {
                    // Only the first occurrence of a value competes.
                    if timeline[..i].iter().any(|o| o.value == obs.value) {
                        continue;
                    }
                    let count = timeline.iter().filter(|o| o.value == obs.value).count();
                    if count > best_count {
                        best = i;
                        best_count = count;
                    }
                }
                best
            }
        }
    }
}

/// Knobs for the entropy and stability calculators.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScoringConfig {
    pub reference: ReferenceMode,
}
