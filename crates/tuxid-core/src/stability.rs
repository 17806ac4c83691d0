//! Reboot stability per signal.
//!
//! For every device sampled at least twice, each non-reference sample is
//! compared with the device's reference sample by exact string equality.
//! Stability is the percentage of those comparisons that matched, pooled
//! across devices. Empty (unknown) values take part as-is: the question is
//! whether the reported value changed, not whether it is meaningful.

use std::collections::BTreeMap;
use std::io::Read;

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::error::{Result, Statistic, TuxidError, Warning};
use crate::ingest::{Observation, ObservationSet, device_timelines};

/// Stability result for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalStability {
    pub signal_name: String,
    /// Percentage in `[0, 100]`; `None` when no device was sampled twice.
    pub stability: Option<f64>,
    /// Repeat samples equal to their device's reference.
    pub matches: u64,
    /// Repeat samples compared.
    pub comparisons: u64,
    /// Devices with at least two samples.
    pub repeat_devices: usize,
}

/// Stability of one signal given its observations sorted by device and sequence.
pub fn signal_stability(
    signal: &str,
    observations: &[Observation],
    config: &ScoringConfig,
) -> (SignalStability, Vec<Warning>) {
    let mut matches = 0u64;
    let mut comparisons = 0u64;
    let mut repeat_devices = 0usize;

    for timeline in device_timelines(observations) {
        if timeline.len() < 2 {
            continue;
        }
        repeat_devices += 1;
        let ref_idx = config.reference.reference_index(timeline);
        let reference = &timeline[ref_idx].value;
        for (i, obs) in timeline.iter().enumerate() {
            if i == ref_idx {
                continue;
            }
            comparisons += 1;
            if obs.value == *reference {
                matches += 1;
            }
        }
    }

    let mut warnings = Vec::new();
    let stability = if comparisons == 0 {
        log::warn!("stability: '{signal}' has no repeat-sampled device, reporting undefined");
        warnings.push(Warning::InsufficientData {
            signal: signal.to_string(),
            statistic: Statistic::Stability,
            detail: "no device was sampled more than once".to_string(),
        });
        None
    } else {
        Some(100.0 * matches as f64 / comparisons as f64)
    };

    (
        SignalStability {
            signal_name: signal.to_string(),
            stability,
            matches,
            comparisons,
            repeat_devices,
        },
        warnings,
    )
}

/// Stability for every signal in the set, in signal-name order.
pub fn compute_stability(
    set: &ObservationSet,
    config: &ScoringConfig,
) -> (Vec<SignalStability>, Vec<Warning>) {
    let mut results = Vec::with_capacity(set.len());
    let mut warnings = Vec::new();
    for (signal, observations) in set.iter() {
        let (result, w) = signal_stability(signal, observations, config);
        results.push(result);
        warnings.extend(w);
    }
    (results, warnings)
}

// ---------------------------------------------------------------------------
// Precomputed stability tables
// ---------------------------------------------------------------------------

fn parse_stability_cell(cell: &str) -> std::result::Result<Option<f64>, String> {
    let cell = cell.trim().trim_end_matches('%').trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if (0.0..=100.0).contains(&v) => Ok(Some(v)),
        Ok(v) => Err(format!("stability {v} outside [0, 100]")),
        Err(e) => Err(format!("'{cell}': {e}")),
    }
}

/// Read a precomputed `Signal Name,Stability` CSV table.
///
/// Blank, `NA` and `NaN` cells are undefined. Any other unparsable or
/// out-of-range cell makes the whole table invalid.
pub fn load_stability_table<R: Read>(reader: R) -> Result<BTreeMap<String, Option<f64>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |want: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(want));
    let (Some(name_col), Some(value_col)) = (position("Signal Name"), position("Stability"))
    else {
        let missing = ["Signal Name", "Stability"]
            .into_iter()
            .filter(|c| position(*c).is_none())
            .map(String::from)
            .collect();
        return Err(TuxidError::MalformedInput { missing });
    };

    let mut table = BTreeMap::new();
    for record in rdr.records() {
        let record = record?;
        let name = record.get(name_col).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        let value = parse_stability_cell(record.get(value_col).unwrap_or(""))
            .map_err(|e| TuxidError::Config(format!("stability table, '{name}': {e}")))?;
        table.insert(name.to_string(), value);
    }
    log::info!("stability: loaded {} precomputed value(s)", table.len());
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
