//! Observation ingestion.
//!
//! Turns a raw corpus into an [`ObservationSet`]: per-signal lists of
//! [`Observation`]s ordered by device and sample index. Two corpus shapes are
//! understood:
//!
//! - a CSV table with device, sequence, signal and value columns
//!   ([`ingest_csv`]);
//! - a samples directory as written by the collection server
//!   ([`ingest_samples_dir`]):
//!
//! ```text
//! samples/
//!   <install_id>/
//!     boot1.json   {"Hostname": "...", "Kernel Version": "...", ...}
//!     boot2.json
//! ```
//!
//! Structural problems (missing required columns) are fatal. A bad row is
//! never fatal: it is skipped, counted, and reported as a warning.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, TuxidError, Warning};

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// One reported value of one signal on one device at one sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Observation {
    pub device_id: String,
    /// Boot or sample ordinal, starting at 1.
    pub sequence_index: u32,
    pub signal_name: String,
    /// Reported value. Empty means unknown.
    pub value: String,
}

impl Observation {
    pub fn new(
        device_id: impl Into<String>,
        sequence_index: u32,
        signal_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            sequence_index,
            signal_name: signal_name.into(),
            value: value.into(),
        }
    }

    /// True when the collector could not determine a value.
    pub fn is_unknown(&self) -> bool {
        self.value.is_empty()
    }
}

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Rows (or signal entries) seen.
    pub rows_read: u64,
    /// Observations kept.
    pub rows_accepted: u64,
    /// Rows or sample files skipped as malformed.
    pub rows_skipped: u64,
    /// Observations dropped as duplicates of an accepted one.
    pub duplicates: u64,
}

/// Ingested corpus, grouped by signal name.
///
/// Each signal's observations are sorted by `(device_id, sequence_index)`,
/// so the set is identical whatever order the input rows arrived in.
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    by_signal: BTreeMap<String, Vec<Observation>>,
    stats: IngestStats,
    warnings: Vec<Warning>,
}

impl ObservationSet {
    /// Build a set from already-parsed observations. Invalid observations
    /// (empty device or signal, sequence index 0) are skipped with a warning.
    pub fn from_observations(observations: impl IntoIterator<Item = Observation>) -> Self {
        let mut builder = Builder::default();
        for (i, obs) in observations.into_iter().enumerate() {
            let location = format!("observation {}", i + 1);
            builder.stats.rows_read += 1;
            if obs.device_id.trim().is_empty() {
                builder.skip(location, "empty device id");
            } else if obs.signal_name.trim().is_empty() {
                builder.skip(location, "empty signal name");
            } else if obs.sequence_index == 0 {
                builder.skip(location, "sequence index must be >= 1");
            } else {
                builder.accept(obs);
            }
        }
        builder.finish()
    }

    /// Signal names in sorted order.
    pub fn signals(&self) -> impl Iterator<Item = &str> {
        self.by_signal.keys().map(String::as_str)
    }

    /// Observations for one signal, sorted by device then sequence index.
    pub fn observations(&self, signal: &str) -> &[Observation] {
        self.by_signal.get(signal).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(signal, observations)` pairs in signal-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Observation])> {
        self.by_signal
            .iter()
            .map(|(name, obs)| (name.as_str(), obs.as_slice()))
    }

    /// Number of distinct signals.
    pub fn len(&self) -> usize {
        self.by_signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signal.is_empty()
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Warnings raised while ingesting.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Split one signal's sorted observations into per-device timelines.
///
/// Each returned slice holds a single device's samples in ascending
/// sequence order.
pub fn device_timelines(observations: &[Observation]) -> impl Iterator<Item = &[Observation]> {
    observations.chunk_by(|a, b| a.device_id == b.device_id)
}

// ---------------------------------------------------------------------------
// Builder: validation, de-duplication and grouping
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Builder {
    accepted: Vec<Observation>,
    stats: IngestStats,
    warnings: Vec<Warning>,
}

impl Builder {
    fn accept(&mut self, mut obs: Observation) {
        obs.device_id = obs.device_id.trim().to_string();
        obs.signal_name = obs.signal_name.trim().to_string();
        self.accepted.push(obs);
    }

    fn skip(&mut self, location: String, reason: impl Into<String>) {
        let reason = reason.into();
        log::debug!("ingest: skipping {location}: {reason}");
        self.stats.rows_skipped += 1;
        self.warnings.push(Warning::MalformedRow { location, reason });
    }

    /// Sample files of one device directory, or `None` (with a warning) when
    /// the directory cannot be listed.
    fn list_device(&mut self, device_dir: &Path) -> Option<Vec<std::path::PathBuf>> {
        match sorted_entries(device_dir) {
            Ok(files) => Some(files),
            Err(e) => {
                self.stats.rows_read += 1;
                self.skip(device_dir.display().to_string(), e.to_string());
                None
            }
        }
    }

    fn finish(mut self) -> ObservationSet {
        // Sorting on the full tuple makes the duplicate winner (smallest
        // value) independent of input order.
        self.accepted.sort_by(|a, b| {
            (&a.signal_name, &a.device_id, a.sequence_index, &a.value).cmp(&(
                &b.signal_name,
                &b.device_id,
                b.sequence_index,
                &b.value,
            ))
        });

        let mut by_signal: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
        for obs in self.accepted {
            let list = by_signal.entry(obs.signal_name.clone()).or_default();
            let is_duplicate = list.last().is_some_and(|last| {
                last.device_id == obs.device_id && last.sequence_index == obs.sequence_index
            });
            if is_duplicate {
                log::warn!(
                    "duplicate observation of '{}' for device {} at sample {}",
                    obs.signal_name,
                    obs.device_id,
                    obs.sequence_index
                );
                self.stats.duplicates += 1;
                self.warnings.push(Warning::DuplicateObservation {
                    device_id: obs.device_id,
                    sequence_index: obs.sequence_index,
                    signal: obs.signal_name,
                });
                continue;
            }
            self.stats.rows_accepted += 1;
            list.push(obs);
        }

        if self.stats.rows_skipped > 0 {
            log::warn!(
                "ingest: skipped {} malformed row(s) of {}",
                self.stats.rows_skipped,
                self.stats.rows_read
            );
        }
        log::info!(
            "ingest: {} observation(s) across {} signal(s)",
            self.stats.rows_accepted,
            by_signal.len()
        );

        ObservationSet {
            by_signal,
            stats: self.stats,
            warnings: self.warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// CSV tables
// ---------------------------------------------------------------------------

/// Accepted header names for each column, matched after trimming and
/// ignoring ASCII case. The first candidate present in the header wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub device: Vec<String>,
    /// Optional column. When absent, samples are numbered in input order.
    pub sequence: Vec<String>,
    pub signal: Vec<String>,
    pub value: Vec<String>,
}

impl Default for ColumnNames {
    fn default() -> Self {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            device: names(&["Device ID", "device_id", "install_id", "Install ID"]),
            sequence: names(&["Sequence", "sequence_index", "Boot"]),
            signal: names(&["Signal Name"]),
            value: names(&["Value"]),
        }
    }
}

/// Ingestion configuration.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    pub columns: ColumnNames,
}

fn find_column(headers: &csv::StringRecord, candidates: &[String]) -> Option<usize> {
    candidates.iter().find_map(|want| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(want.trim()))
    })
}

/// Ingest a CSV corpus.
///
/// Fails with [`TuxidError::MalformedInput`] when the device, signal or value
/// column is absent. Rows with missing cells, empty device or signal, or a
/// sequence cell that is not a positive integer are skipped with a warning.
pub fn ingest_csv<R: Read>(reader: R, config: &IngestConfig) -> Result<ObservationSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let cols = &config.columns;

    let device_col = find_column(&headers, &cols.device);
    let signal_col = find_column(&headers, &cols.signal);
    let value_col = find_column(&headers, &cols.value);
    let sequence_col = find_column(&headers, &cols.sequence);

    let (Some(device_col), Some(signal_col), Some(value_col)) = (device_col, signal_col, value_col)
    else {
        let mut missing = Vec::new();
        for (found, names) in [
            (device_col, &cols.device),
            (signal_col, &cols.signal),
            (value_col, &cols.value),
        ] {
            if found.is_none() {
                missing.push(names.first().cloned().unwrap_or_default());
            }
        }
        return Err(TuxidError::MalformedInput { missing });
    };
    if sequence_col.is_none() {
        log::info!("ingest: no sequence column, numbering samples in input order");
    }

    let mut builder = Builder::default();
    let mut next_seq: HashMap<(String, String), u32> = HashMap::new();

    for (i, result) in rdr.records().enumerate() {
        builder.stats.rows_read += 1;
        let fallback_line = i as u64 + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                builder.skip(format!("line {line}"), e.to_string());
                continue;
            }
        };
        let location = format!(
            "line {}",
            record.position().map(|p| p.line()).unwrap_or(fallback_line)
        );

        let (Some(device), Some(signal), Some(value)) = (
            record.get(device_col),
            record.get(signal_col),
            record.get(value_col),
        ) else {
            builder.skip(
                location,
                format!("row has {} field(s), expected {}", record.len(), headers.len()),
            );
            continue;
        };
        let device = device.trim();
        let signal = signal.trim();
        if device.is_empty() {
            builder.skip(location, "empty device id");
            continue;
        }
        if signal.is_empty() {
            builder.skip(location, "empty signal name");
            continue;
        }

        let sequence_index = match sequence_col {
            Some(idx) => {
                let cell = record.get(idx).unwrap_or("").trim();
                match cell.parse::<u32>() {
                    Ok(n) if n >= 1 => n,
                    _ => {
                        builder.skip(location, format!("invalid sequence index '{cell}'"));
                        continue;
                    }
                }
            }
            None => {
                let counter = next_seq
                    .entry((device.to_string(), signal.to_string()))
                    .or_insert(0);
                *counter += 1;
                *counter
            }
        };

        builder.accept(Observation::new(device, sequence_index, signal, value));
    }

    Ok(builder.finish())
}

// ---------------------------------------------------------------------------
// Samples directories
// ---------------------------------------------------------------------------

/// Parse `boot<N>.json` into `N`.
fn boot_index(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("boot")?
        .strip_suffix(".json")?
        .parse::<u32>()
        .ok()
        .filter(|&n| n >= 1)
}

fn json_to_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let io_err = |source| TuxidError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_err)?;
    paths.sort();
    Ok(paths)
}

/// Ingest a samples directory: one subdirectory per device, one
/// `boot<N>.json` per sample.
///
/// Each file holds a JSON object mapping signal name to value, or an upload
/// envelope `{"install_id": ..., "data": {...}}`. Files that cannot be read
/// or parsed are skipped with a warning; other file names are ignored.
pub fn ingest_samples_dir(root: &Path) -> Result<ObservationSet> {
    let mut builder = Builder::default();

    for device_dir in sorted_entries(root)? {
        if !device_dir.is_dir() {
            continue;
        }
        let device_id = device_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let Some(files) = builder.list_device(&device_dir) else {
            continue;
        };
        for file in files {
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let Some(sequence_index) = boot_index(&file_name) else {
                log::debug!("ingest: ignoring {}", file.display());
                continue;
            };
            let location = file.display().to_string();

            let contents = match fs::read_to_string(&file) {
                Ok(c) => c,
                Err(e) => {
                    builder.stats.rows_read += 1;
                    builder.skip(location, e.to_string());
                    continue;
                }
            };
            let parsed: serde_json::Value = match serde_json::from_str(&contents) {
                Ok(v) => v,
                Err(e) => {
                    builder.stats.rows_read += 1;
                    builder.skip(location, format!("invalid JSON: {e}"));
                    continue;
                }
            };
            let signals = match parsed.get("data") {
                Some(data) if parsed.get("install_id").is_some() => data,
                _ => &parsed,
            };
            let Some(signals) = signals.as_object() else {
                builder.stats.rows_read += 1;
                builder.skip(location, "expected a JSON object of signal values");
                continue;
            };

            for (name, value) in signals {
                builder.stats.rows_read += 1;
                if name.trim().is_empty() {
                    builder.skip(location.clone(), "empty signal name");
                    continue;
                }
                builder.accept(Observation::new(
                    device_id.as_str(),
                    sequence_index,
                    name.as_str(),
                    json_to_value(value),
                ));
            }
        }
    }

    Ok(builder.finish())
}

/// Ingest either a samples directory or a CSV file.
pub fn ingest_path(path: &Path, config: &IngestConfig) -> Result<ObservationSet> {
    if path.is_dir() {
        log::info!("ingest: reading samples directory {}", path.display());
        return ingest_samples_dir(path);
    }
    log::info!("ingest: reading CSV {}", path.display());
    let file = fs::File::open(path).map_err(|source| TuxidError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ingest_csv(file, config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest(csv: &str) -> ObservationSet {
        ingest_csv(csv.as_bytes(), &IngestConfig::default()).unwrap()
    }

    #[test]
    fn test_basic_csv() {
        let set = ingest(
            "Device ID,Sequence,Signal Name,Value\n\
             d1,1,Hostname,alpha\n\
             d1,2,Hostname,alpha\n\
             d2,1,Hostname,beta\n\
             d2,1,Kernel Version,6.8\n",
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.observations("Hostname").len(), 3);
        assert_eq!(set.observations("Kernel Version").len(), 1);
        assert_eq!(set.stats().rows_accepted, 4);
        assert!(set.warnings().is_empty());
    }

    #[test]
    fn test_header_whitespace_and_case() {
        let set = ingest(
            " device_id , BOOT ,  signal name ,value \n\
             d1,1,Hostname,alpha\n",
        );
        let obs = &set.observations("Hostname")[0];
        assert_eq!(obs.device_id, "d1");
        assert_eq!(obs.sequence_index, 1);
        assert_eq!(obs.value, "alpha");
    }

    #[test]
    fn test_missing_required_columns_is_fatal() {
        let err = ingest_csv(
            "Device ID,Sequence,Value\nd1,1,x\n".as_bytes(),
            &IngestConfig::default(),
        )
        .unwrap_err();
        match err {
            TuxidError::MalformedInput { missing } => assert_eq!(missing, vec!["Signal Name"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let err = ingest_csv("".as_bytes(), &IngestConfig::default()).unwrap_err();
        match err {
            TuxidError::MalformedInput { missing } => assert_eq!(missing.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_rows_skipped_and_counted() {
        let set = ingest(
            "Device ID,Sequence,Signal Name,Value\n\
             d1,1,Hostname,alpha\n\
             ,1,Hostname,beta\n\
             d3,1,,gamma\n\
             d4,zero,Hostname,delta\n\
             d5,0,Hostname,eps\n\
             d6,1\n\
             d7,1,Hostname,zeta\n",
        );
        assert_eq!(set.observations("Hostname").len(), 2);
        let stats = set.stats();
        assert_eq!(stats.rows_read, 7);
        assert_eq!(stats.rows_skipped, 5);
        assert_eq!(set.warnings().len(), 5);
        assert!(matches!(
            &set.warnings()[0],
            Warning::MalformedRow { location, .. } if location == "line 3"
        ));
    }

    #[test]
    fn test_empty_value_kept_verbatim() {
        let set = ingest(
            "Device ID,Sequence,Signal Name,Value\n\
             d1,1,Public IP Address,\n\
             d2,1,Public IP Address, 10.0.0.1 \n",
        );
        let obs = set.observations("Public IP Address");
        assert!(obs[0].is_unknown());
        assert_eq!(obs[1].value, " 10.0.0.1 ");
    }

    #[test]
    fn test_sequence_defaults_to_input_order() {
        let set = ingest(
            "Device ID,Signal Name,Value\n\
             d1,Hostname,a\n\
             d2,Hostname,x\n\
             d1,Hostname,b\n",
        );
        let obs = set.observations("Hostname");
        assert_eq!(obs[0].device_id, "d1");
        assert_eq!((obs[0].sequence_index, obs[0].value.as_str()), (1, "a"));
        assert_eq!((obs[1].sequence_index, obs[1].value.as_str()), (2, "b"));
        assert_eq!(obs[2].device_id, "d2");
    }

    #[test]
    fn test_observations_sorted_by_device_then_sequence() {
        let set = ingest(
            "Device ID,Sequence,Signal Name,Value\n\
             d2,2,Hostname,b2\n\
             d1,3,Hostname,a3\n\
             d2,1,Hostname,b1\n\
             d1,1,Hostname,a1\n",
        );
        let order: Vec<_> = set
            .observations("Hostname")
            .iter()
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(order, vec!["a1", "a3", "b1", "b2"]);
    }

    #[test]
    fn test_duplicates_keep_smallest_value() {
        let set = ingest(
            "Device ID,Sequence,Signal Name,Value\n\
             d1,1,Hostname,zulu\n\
             d1,1,Hostname,alpha\n",
        );
        let obs = set.observations("Hostname");
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].value, "alpha");
        assert_eq!(set.stats().duplicates, 1);
        assert!(matches!(
            set.warnings()[0],
            Warning::DuplicateObservation { sequence_index: 1, .. }
        ));
    }

    #[test]
    fn test_custom_column_names() {
        let config = IngestConfig {
            columns: ColumnNames {
                device: vec!["host".into()],
                sequence: vec!["run".into()],
                signal: vec!["key".into()],
                value: vec!["val".into()],
            },
        };
        let set = ingest_csv("host,run,key,val\nh1,4,Hostname,x\n".as_bytes(), &config).unwrap();
        assert_eq!(set.observations("Hostname")[0].sequence_index, 4);
    }

    #[test]
    fn test_device_timelines_split_by_device() {
        let set = ingest(
            "Device ID,Sequence,Signal Name,Value\n\
             d1,1,Hostname,a\n\
             d1,2,Hostname,a\n\
             d2,1,Hostname,b\n",
        );
        let timelines: Vec<_> = device_timelines(set.observations("Hostname")).collect();
        assert_eq!(timelines.len(), 2);
        assert_eq!(timelines[0].len(), 2);
        assert_eq!(timelines[1][0].device_id, "d2");
    }

    #[test]
    fn test_from_observations_validates() {
        let set = ObservationSet::from_observations(vec![
            Observation::new("d1", 1, "Hostname", "a"),
            Observation::new("", 1, "Hostname", "b"),
            Observation::new("d2", 0, "Hostname", "c"),
        ]);
        assert_eq!(set.observations("Hostname").len(), 1);
        assert_eq!(set.stats().rows_skipped, 2);
    }

    #[test]
    fn test_boot_index() {
        assert_eq!(boot_index("boot1.json"), Some(1));
        assert_eq!(boot_index("boot12.json"), Some(12));
        assert_eq!(boot_index("boot0.json"), None);
        assert_eq!(boot_index("boot.json"), None);
        assert_eq!(boot_index("notes.txt"), None);
    }

    #[test]
    fn test_json_to_value() {
        assert_eq!(json_to_value(&serde_json::json!("x")), "x");
        assert_eq!(json_to_value(&serde_json::json!(null)), "");
        assert_eq!(json_to_value(&serde_json::json!(16384)), "16384");
        assert_eq!(json_to_value(&serde_json::json!(true)), "true");
    }

    #[test]
    fn test_unlistable_device_dir_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good");
        fs::create_dir(&good).unwrap();
        fs::write(good.join("boot1.json"), r#"{"Hostname": "a"}"#).unwrap();

        let mut builder = Builder::default();
        assert!(builder.list_device(&dir.path().join("gone")).is_none());
        let files = builder.list_device(&good).unwrap();
        assert_eq!(files.len(), 1);

        let set = builder.finish();
        assert_eq!(set.stats().rows_skipped, 1);
        assert!(matches!(
            &set.warnings()[0],
            Warning::MalformedRow { location, .. } if location.ends_with("gone")
        ));
    }
}
