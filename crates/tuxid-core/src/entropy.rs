//! Normalized cross-device entropy per signal.
//!
//! A signal's entropy measures how far observing its value narrows down
//! which device produced it. Each device contributes exactly one value (its
//! reference observation), so per-device repeat noise never inflates the
//! score. Shannon entropy of the value distribution is divided by
//! `log2(N)`, the entropy of `N` devices that all report distinct values,
//! giving a score in `[0, 1]` that is comparable across corpus sizes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::error::{Statistic, Warning};
use crate::ingest::{Observation, ObservationSet, device_timelines};

/// Entropy result for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalEntropy {
    pub signal_name: String,
    /// Normalized entropy in `[0, 1]`.
    pub entropy: f64,
    /// Devices with a known (non-empty) representative value.
    pub devices: usize,
    /// Distinct known values across those devices.
    pub distinct_values: usize,
    /// Devices whose representative value was empty.
    pub missing: usize,
}

/// Shannon entropy in bits of a frequency distribution.
///
/// Zero counts are ignored. An empty distribution has entropy 0.
pub fn shannon_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let mut h = 0.0;
    for &c in counts {
        if c > 0 {
            let p = c as f64 / n;
            h -= p * p.log2();
        }
    }
    h
}

/// Shannon entropy divided by `log2(total)`, clamped to `[0, 1]`.
///
/// Defined as 0 when `total <= 1` and when one value holds every count;
/// exactly 1 when every count is 1.
pub fn normalized_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    let distinct = counts.iter().filter(|&&c| c > 0).count();
    if total <= 1 || distinct <= 1 {
        return 0.0;
    }
    if distinct == total {
        return 1.0;
    }
    (shannon_entropy(counts) / (total as f64).log2()).clamp(0.0, 1.0)
}

/// Entropy of one signal given its observations sorted by device and sequence.
pub fn signal_entropy(
    signal: &str,
    observations: &[Observation],
    config: &ScoringConfig,
) -> (SignalEntropy, Vec<Warning>) {
    // BTreeMap keeps the summation order fixed, so the float result does not
    // depend on hash seeds.
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut missing = 0;
    for timeline in device_timelines(observations) {
        let reference = &timeline[config.reference.reference_index(timeline)];
        if reference.is_unknown() {
            missing += 1;
        } else {
            *counts.entry(reference.value.as_str()).or_insert(0) += 1;
        }
    }

    let freq: Vec<usize> = counts.values().copied().collect();
    let devices: usize = freq.iter().sum();
    let entropy = normalized_entropy(&freq);

    let mut warnings = Vec::new();
    if missing > 0 {
        log::debug!("entropy: '{signal}' has {missing} device(s) with an unknown value");
        warnings.push(Warning::MissingValues {
            signal: signal.to_string(),
            devices: missing,
        });
    }
    if devices <= 1 {
        log::warn!("entropy: '{signal}' has {devices} device(s) with a known value, reporting 0");
        warnings.push(Warning::InsufficientData {
            signal: signal.to_string(),
            statistic: Statistic::Entropy,
            detail: format!("{devices} device(s) with a known value, need at least 2"),
        });
    }

    (
        SignalEntropy {
            signal_name: signal.to_string(),
            entropy,
            devices,
            distinct_values: freq.len(),
            missing,
        },
        warnings,
    )
}

/// Entropy for every signal in the set, in signal-name order.
pub fn compute_entropy(
    set: &ObservationSet,
    config: &ScoringConfig,
) -> (Vec<SignalEntropy>, Vec<Warning>) {
    let mut results = Vec::with_capacity(set.len());
    let mut warnings = Vec::new();
    for (signal, observations) in set.iter() {
        let (result, w) = signal_entropy(signal, observations, config);
        results.push(result);
        warnings.extend(w);
    }
    (results, warnings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceMode;

    fn one_per_device(values: &[&str]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(format!("dev{i:03}"), 1, "Hostname", *v))
            .collect()
    }

    #[test]
    fn test_shannon_uniform() {
        assert!((shannon_entropy(&[1, 1, 1, 1]) - 2.0).abs() < 1e-12);
        assert!((shannon_entropy(&[5, 5]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shannon_degenerate() {
        assert_eq!(shannon_entropy(&[]), 0.0);
        assert_eq!(shannon_entropy(&[7]), 0.0);
        assert_eq!(shannon_entropy(&[0, 3, 0]), 0.0);
    }

    #[test]
    fn test_normalized_bounds() {
        assert_eq!(normalized_entropy(&[1, 1, 1, 1, 1]), 1.0);
        assert_eq!(normalized_entropy(&[9]), 0.0);
        assert_eq!(normalized_entropy(&[1]), 0.0);
        assert_eq!(normalized_entropy(&[]), 0.0);
    }

    #[test]
    fn test_normalized_skewed() {
        // 4 devices: values {a, a, a, b}. H = 0.8113 bits, log2(4) = 2.
        let e = normalized_entropy(&[3, 1]);
        assert!((e - 0.811278 / 2.0).abs() < 1e-5, "got {e}");
    }

    #[test]
    fn test_all_distinct_is_one() {
        let obs = one_per_device(&["a", "b", "c", "d", "e", "f", "g"]);
        let (r, w) = signal_entropy("Hostname", &obs, &ScoringConfig::default());
        assert_eq!(r.entropy, 1.0);
        assert_eq!(r.devices, 7);
        assert_eq!(r.distinct_values, 7);
        assert!(w.is_empty());
    }

    #[test]
    fn test_all_identical_is_zero() {
        let obs = one_per_device(&["x", "x", "x"]);
        let (r, _) = signal_entropy("Hostname", &obs, &ScoringConfig::default());
        assert_eq!(r.entropy, 0.0);
        assert_eq!(r.distinct_values, 1);
    }

    #[test]
    fn test_single_device_is_zero_with_warning() {
        let obs = one_per_device(&["only"]);
        let (r, w) = signal_entropy("Hostname", &obs, &ScoringConfig::default());
        assert_eq!(r.entropy, 0.0);
        assert!(!r.entropy.is_nan());
        assert!(matches!(
            w[0],
            Warning::InsufficientData {
                statistic: Statistic::Entropy,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_values_excluded_and_counted() {
        let obs = one_per_device(&["a", "", "b"]);
        let (r, w) = signal_entropy("Hostname", &obs, &ScoringConfig::default());
        assert_eq!(r.devices, 2);
        assert_eq!(r.missing, 1);
        assert_eq!(r.entropy, 1.0);
        assert_eq!(
            w,
            vec![Warning::MissingValues {
                signal: "Hostname".into(),
                devices: 1
            }]
        );
    }

    #[test]
    fn test_repeat_samples_do_not_inflate() {
        // d1 changes value on its second boot; only the reference counts.
        let obs = vec![
            Observation::new("d1", 1, "Hostname", "a"),
            Observation::new("d1", 2, "Hostname", "z"),
            Observation::new("d2", 1, "Hostname", "a"),
        ];
        let (r, _) = signal_entropy("Hostname", &obs, &ScoringConfig::default());
        assert_eq!(r.devices, 2);
        assert_eq!(r.entropy, 0.0);
    }

    #[test]
    fn test_modal_reference_changes_representative() {
        let obs = vec![
            Observation::new("d1", 1, "Hostname", "a"),
            Observation::new("d1", 2, "Hostname", "b"),
            Observation::new("d1", 3, "Hostname", "b"),
            Observation::new("d2", 1, "Hostname", "b"),
        ];
        let first = ScoringConfig::default();
        let modal = ScoringConfig {
            reference: ReferenceMode::Modal,
        };
        assert_eq!(signal_entropy("Hostname", &obs, &first).0.entropy, 1.0);
        assert_eq!(signal_entropy("Hostname", &obs, &modal).0.entropy, 0.0);
    }
}
