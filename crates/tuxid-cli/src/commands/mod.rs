pub mod entropy;
pub mod report;
pub mod signals;
pub mod stability;

use std::path::Path;

use tuxid_core::{
    ColumnNames, IngestConfig, ObservationSet, ReferenceMode, ScoringConfig, SignalRegistry,
    Warning,
};

/// How many individual warnings to print before summarizing.
const MAX_LISTED_WARNINGS: usize = 10;

/// Corpus-related flags shared by `report`, `entropy` and `stability`.
pub struct CorpusOptions<'a> {
    pub input: &'a str,
    pub reference: &'a str,
    pub device_column: Option<&'a str>,
    pub sequence_column: Option<&'a str>,
    pub signal_column: Option<&'a str>,
    pub value_column: Option<&'a str>,
    pub strict: bool,
}

/// Parse a reference mode string into the enum.
pub fn parse_reference(s: &str) -> ReferenceMode {
    s.parse().unwrap_or_else(|e| {
        eprintln!("{e}, using first");
        ReferenceMode::First
    })
}

pub fn scoring_config(opts: &CorpusOptions<'_>) -> ScoringConfig {
    ScoringConfig {
        reference: parse_reference(opts.reference),
    }
}

/// Column names from flags; an explicit flag replaces the default aliases.
pub fn ingest_config(opts: &CorpusOptions<'_>) -> IngestConfig {
    let mut columns = ColumnNames::default();
    let pick = |flag: Option<&str>, defaults: &mut Vec<String>| {
        if let Some(name) = flag {
            *defaults = vec![name.to_string()];
        }
    };
    pick(opts.device_column, &mut columns.device);
    pick(opts.sequence_column, &mut columns.sequence);
    pick(opts.signal_column, &mut columns.signal);
    pick(opts.value_column, &mut columns.value);
    IngestConfig { columns }
}

/// Read and ingest the corpus, exiting on fatal errors.
///
/// An empty set is not fatal: the report is still written, with the
/// ingestion warnings explaining why it has no rows.
pub fn load_corpus(opts: &CorpusOptions<'_>) -> ObservationSet {
    let config = ingest_config(opts);
    let result = if opts.input == "-" {
        tuxid_core::ingest_csv(std::io::stdin().lock(), &config)
    } else {
        tuxid_core::ingest_path(Path::new(opts.input), &config)
    };
    match result {
        Ok(set) => {
            if set.is_empty() {
                log::warn!("no observations accepted from {}", opts.input);
            }
            set
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Built-in registry, extended by an override file when given.
pub fn load_registry(path: Option<&str>) -> SignalRegistry {
    let Some(path) = path else {
        return SignalRegistry::builtin().clone();
    };
    let json = match std::fs::read_to_string(path) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Failed to read registry {path}: {e}");
            std::process::exit(1);
        }
    };
    match SignalRegistry::with_overrides(&json) {
        Ok(reg) => reg,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Print warnings to stderr: the first few verbatim, then a count.
pub fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("{} warning(s):", warnings.len());
    for w in warnings.iter().take(MAX_LISTED_WARNINGS) {
        eprintln!("  - {w}");
    }
    if warnings.len() > MAX_LISTED_WARNINGS {
        eprintln!(
            "  ... and {} more (use -v for the full log)",
            warnings.len() - MAX_LISTED_WARNINGS
        );
    }
}

/// In strict mode, any warning turns into exit status 2.
pub fn exit_if_strict(strict: bool, warnings: &[Warning]) {
    if strict && !warnings.is_empty() {
        eprintln!("--strict: {} warning(s) raised", warnings.len());
        std::process::exit(2);
    }
}

/// Write `contents` to `path`, or stdout when no path is given.
pub fn write_output(contents: &str, path: Option<&str>) {
    match path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, contents) {
                eprintln!("Failed to write {path}: {e}");
                std::process::exit(1);
            }
            eprintln!("Report saved to: {path}");
        }
        None => print!("{contents}"),
    }
}
