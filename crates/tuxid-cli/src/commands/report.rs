//! `tuxid report`: the full per-signal report.

use tuxid_core::{OutputFormat, assemble, load_stability_table};

use super::CorpusOptions;

pub struct ReportCommandConfig<'a> {
    pub corpus: CorpusOptions<'a>,
    pub registry_path: Option<&'a str>,
    pub format: &'a str,
    pub precision: usize,
    pub stability_table: Option<&'a str>,
    pub output_path: Option<&'a str>,
}

pub fn run(config: ReportCommandConfig<'_>) {
    let format: OutputFormat = config.format.parse().unwrap_or_else(|e| {
        eprintln!("{e}, using csv");
        OutputFormat::Csv
    });
    let registry = super::load_registry(config.registry_path);
    let set = super::load_corpus(&config.corpus);
    let scoring = super::scoring_config(&config.corpus);

    let mut report = assemble(&set, &registry, &scoring);

    if let Some(path) = config.stability_table {
        let table = std::fs::File::open(path)
            .map_err(|e| e.to_string())
            .and_then(|f| load_stability_table(f).map_err(|e| e.to_string()));
        match table {
            Ok(table) => {
                let applied = report.apply_stability_overrides(&table);
                log::info!("applied {applied} precomputed stability value(s) from {path}");
            }
            Err(e) => {
                eprintln!("Failed to load stability table {path}: {e}");
                std::process::exit(1);
            }
        }
    }

    let rendered = match report.render(format, config.precision) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to render report: {e}");
            std::process::exit(1);
        }
    };
    super::write_output(&rendered, config.output_path);

    let stats = report.stats;
    eprintln!(
        "{} signal(s) from {} observation(s) ({} skipped, {} duplicate(s)), reference: {}",
        report.rows.len(),
        stats.rows_accepted,
        stats.rows_skipped,
        stats.duplicates,
        report.reference
    );
    super::print_warnings(&report.warnings);
    super::exit_if_strict(config.corpus.strict, &report.warnings);
}
