//! Report assembly and rendering.
//!
//! Joins registry metadata with the entropy and stability results into one
//! row per observed signal, sorted by signal name. The CSV rendering has a
//! fixed column set that downstream chart tooling joins on:
//!
//! ```text
//! Signal Name,Entropy,Stability,user_resettable,read_privileges
//! Hostname,1.0000,NA,Yes,local
//! Kernel Version,1.0000,66.6667,No,local
//! ```

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::config::{ReferenceMode, ScoringConfig};
use crate::entropy::{SignalEntropy, compute_entropy};
use crate::error::{Result, Warning};
use crate::ingest::{IngestStats, ObservationSet};
use crate::registry::{ReadPrivilege, SignalCategory, SignalRegistry};
use crate::stability::{SignalStability, compute_stability};

/// CSV column names, in output order.
pub const CSV_COLUMNS: [&str; 5] = [
    "Signal Name",
    "Entropy",
    "Stability",
    "user_resettable",
    "read_privileges",
];

/// CSV marker for an undefined stability.
pub const NULL_MARKER: &str = "NA";

/// Default number of decimals for entropy and stability.
pub const DEFAULT_PRECISION: usize = 4;

/// One signal's joined metadata and statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub signal_name: String,
    /// Normalized entropy in `[0, 1]`.
    pub entropy: f64,
    /// Percentage in `[0, 100]`, `None` when undefined.
    pub stability: Option<f64>,
    /// `None` for signals missing from the registry.
    pub user_resettable: Option<bool>,
    pub read_privilege: Option<ReadPrivilege>,
    pub category: Option<SignalCategory>,
    pub devices: usize,
    pub distinct_values: usize,
    pub missing_values: usize,
    pub repeat_devices: usize,
    pub matches: u64,
    pub comparisons: u64,
}

impl ReportRow {
    fn join(
        entropy: SignalEntropy,
        stability: Option<SignalStability>,
        registry: &SignalRegistry,
    ) -> Self {
        let def = registry.lookup(&entropy.signal_name);
        let (repeat_devices, matches, comparisons, pct) = match stability {
            Some(s) => (s.repeat_devices, s.matches, s.comparisons, s.stability),
            None => (0, 0, 0, None),
        };
        Self {
            entropy: entropy.entropy,
            stability: pct,
            user_resettable: def.map(|d| d.user_resettable),
            read_privilege: def.map(|d| d.read_privilege),
            category: def.map(|d| d.category),
            devices: entropy.devices,
            distinct_values: entropy.distinct_values,
            missing_values: entropy.missing,
            repeat_devices,
            matches,
            comparisons,
            signal_name: entropy.signal_name,
        }
    }

    /// `Yes` / `No`, or empty for unknown signals.
    pub fn user_resettable_label(&self) -> &'static str {
        match self.user_resettable {
            Some(true) => "Yes",
            Some(false) => "No",
            None => "",
        }
    }

    /// `local` / `local root`, or empty for unknown signals.
    pub fn read_privilege_label(&self) -> String {
        self.read_privilege
            .map(|p| p.to_string())
            .unwrap_or_default()
    }
}

/// The engine's output: rows sorted by signal name plus every warning raised.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub reference: ReferenceMode,
    pub rows: Vec<ReportRow>,
    pub warnings: Vec<Warning>,
    pub stats: IngestStats,
}

/// Run both calculators over `set` and join the results with `registry`.
///
/// Entropy and stability run on separate threads; both only read `set`.
pub fn assemble(set: &ObservationSet, registry: &SignalRegistry, config: &ScoringConfig) -> Report {
    let ((entropies, entropy_warnings), (stabilities, stability_warnings)) =
        std::thread::scope(|s| {
            let entropy = s.spawn(|| compute_entropy(set, config));
            let stability = s.spawn(|| compute_stability(set, config));
            (
                entropy
                    .join()
                    .unwrap_or_else(|e| std::panic::resume_unwind(e)),
                stability
                    .join()
                    .unwrap_or_else(|e| std::panic::resume_unwind(e)),
            )
        });

    let mut warnings: Vec<Warning> = set.warnings().to_vec();
    warnings.extend(entropy_warnings);
    warnings.extend(stability_warnings);

    let mut stability_by_name: BTreeMap<String, SignalStability> = stabilities
        .into_iter()
        .map(|s| (s.signal_name.clone(), s))
        .collect();

    let mut rows = Vec::with_capacity(entropies.len());
    for entropy in entropies {
        if registry.lookup(&entropy.signal_name).is_none() {
            log::warn!(
                "report: unknown signal '{}', metadata left blank",
                entropy.signal_name
            );
            warnings.push(Warning::UnknownSignal {
                signal: entropy.signal_name.clone(),
            });
        }
        let stability = stability_by_name.remove(&entropy.signal_name);
        rows.push(ReportRow::join(entropy, stability, registry));
    }
    rows.sort_by(|a, b| a.signal_name.cmp(&b.signal_name));

    log::info!(
        "report: {} signal(s), {} warning(s), reference={}",
        rows.len(),
        warnings.len(),
        config.reference
    );

    Report {
        reference: config.reference,
        rows,
        warnings,
        stats: set.stats(),
    }
}

fn fmt_fixed(v: f64, precision: usize) -> String {
    format!("{v:.precision$}")
}

impl Report {
    /// Row for `signal`, if it was observed.
    pub fn row(&self, signal: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.signal_name == signal)
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.signal_name.as_str())
    }

    /// Replace computed stability with precomputed values for the signals
    /// the table names. Returns how many rows changed.
    pub fn apply_stability_overrides(&mut self, table: &BTreeMap<String, Option<f64>>) -> usize {
        let mut applied = 0;
        for row in &mut self.rows {
            if let Some(&value) = table.get(&row.signal_name) {
                log::debug!(
                    "report: stability of '{}' overridden: {:?} -> {:?}",
                    row.signal_name,
                    row.stability,
                    value
                );
                row.stability = value;
                applied += 1;
            }
        }
        applied
    }

    /// Write the fixed-schema CSV.
    pub fn write_csv<W: Write>(&self, writer: W, precision: usize) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_COLUMNS)?;
        for row in &self.rows {
            let entropy = fmt_fixed(row.entropy, precision);
            let stability = row
                .stability
                .map(|s| fmt_fixed(s, precision))
                .unwrap_or_else(|| NULL_MARKER.to_string());
            let privilege = row.read_privilege_label();
            wtr.write_record([
                row.signal_name.as_str(),
                entropy.as_str(),
                stability.as_str(),
                row.user_resettable_label(),
                privilege.as_str(),
            ])?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_csv(&self, precision: usize) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf, precision)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Pretty JSON of the whole report. Undefined stability is `null`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Aligned table for terminals.
    pub fn to_table(&self, precision: usize) -> String {
        let name_width = self
            .rows
            .iter()
            .map(|r| r.signal_name.chars().count())
            .max()
            .unwrap_or(0)
            .max("Signal".len());
        let mut out = String::new();
        out.push_str(&format!(
            "{:<name_width$}  {:>8}  {:>9}  {:>10}  {:<10}  {:>7}\n",
            "Signal", "Entropy", "Stability", "Resettable", "Privilege", "Devices"
        ));
        out.push_str(&format!("{}\n", "-".repeat(name_width + 54)));
        for row in &self.rows {
            let stability = row
                .stability
                .map(|s| fmt_fixed(s, precision.min(2)))
                .unwrap_or_else(|| "—".to_string());
            out.push_str(&format!(
                "{:<name_width$}  {:>8}  {:>9}  {:>10}  {:<10}  {:>7}\n",
                row.signal_name,
                fmt_fixed(row.entropy, precision),
                stability,
                row.user_resettable_label(),
                row.read_privilege_label(),
                row.devices
            ));
        }
        out
    }
}

/// Output rendering for a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            other => Err(format!("unknown format '{other}' (expected csv|json|table)")),
        }
    }
}

impl Report {
    pub fn render(&self, format: OutputFormat, precision: usize) -> Result<String> {
        match format {
            OutputFormat::Csv => self.to_csv(precision),
            OutputFormat::Json => self.to_json(),
            OutputFormat::Table => Ok(self.to_table(precision)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Observation;

    fn sample_set() -> ObservationSet {
        ObservationSet::from_observations(vec![
            Observation::new("d1", 1, "Kernel Version", "v1"),
            Observation::new("d1", 2, "Kernel Version", "v1"),
            Observation::new("d2", 1, "Kernel Version", "v2"),
            Observation::new("d2", 2, "Kernel Version", "v2"),
            Observation::new("d3", 1, "Kernel Version", "v3"),
            Observation::new("d3", 2, "Kernel Version", "v4"),
            Observation::new("d1", 1, "GPU Serial", "g1"),
            Observation::new("d2", 1, "GPU Serial", "g2"),
        ])
    }

    fn sample_report() -> Report {
        assemble(
            &sample_set(),
            SignalRegistry::builtin(),
            &ScoringConfig::default(),
        )
    }

    #[test]
    fn test_rows_sorted_and_joined() {
        let report = sample_report();
        let names: Vec<_> = report.signal_names().collect();
        assert_eq!(names, vec!["GPU Serial", "Kernel Version"]);

        let kernel = report.row("Kernel Version").unwrap();
        assert_eq!(kernel.user_resettable, Some(false));
        assert_eq!(kernel.read_privilege, Some(ReadPrivilege::Local));
        assert_eq!(kernel.entropy, 1.0);
        assert!((kernel.stability.unwrap() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_signal_blank_metadata() {
        let report = sample_report();
        let gpu = report.row("GPU Serial").unwrap();
        assert_eq!(gpu.user_resettable, None);
        assert_eq!(gpu.read_privilege, None);
        assert_eq!(gpu.stability, None);
        assert!(report.warnings.contains(&Warning::UnknownSignal {
            signal: "GPU Serial".into()
        }));
    }

    #[test]
    fn test_registry_signals_not_observed_are_absent() {
        let report = sample_report();
        assert!(report.row("Hostname").is_none());
        assert_eq!(report.rows.len(), 2);
    }

    #[test]
    fn test_csv_schema_and_null_marker() {
        let csv = sample_report().to_csv(4).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Signal Name,Entropy,Stability,user_resettable,read_privileges"
        );
        assert_eq!(lines[1], "GPU Serial,1.0000,NA,,");
        assert_eq!(lines[2], "Kernel Version,1.0000,66.6667,No,local");
    }

    #[test]
    fn test_csv_precision() {
        let csv = sample_report().to_csv(2).unwrap();
        assert!(csv.contains("Kernel Version,1.00,66.67,No,local"));
    }

    #[test]
    fn test_json_null_stability() {
        let json: serde_json::Value =
            serde_json::from_str(&sample_report().to_json().unwrap()).unwrap();
        assert!(json["rows"][0]["stability"].is_null());
        assert_eq!(json["rows"][1]["read_privilege"], "local");
        assert_eq!(json["reference"], "first");
    }

    #[test]
    fn test_table_render() {
        let table = sample_report().to_table(4);
        assert!(table.starts_with("Signal"));
        assert!(table.contains("Kernel Version"));
        assert!(table.contains("66.67"));
    }

    #[test]
    fn test_table_columns_aligned() {
        let table = sample_report().to_table(4);
        let lines: Vec<_> = table.lines().collect();
        let kernel = lines
            .iter()
            .find(|l| l.starts_with("Kernel Version"))
            .unwrap();
        assert_eq!(lines[0].find("Privilege"), kernel.find("local"));
        assert_eq!(lines[0].len(), lines[1].len());
    }

    #[test]
    fn test_stability_overrides() {
        let mut report = sample_report();
        let mut table = BTreeMap::new();
        table.insert("GPU Serial".to_string(), Some(90.0));
        table.insert("Hostname".to_string(), Some(10.0));
        assert_eq!(report.apply_stability_overrides(&table), 1);
        assert_eq!(report.row("GPU Serial").unwrap().stability, Some(90.0));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
