//! `tuxid stability`: per-signal stability breakdown.

use tuxid_core::compute_stability;

use super::CorpusOptions;

pub fn run(opts: &CorpusOptions<'_>) {
    let set = super::load_corpus(opts);
    let scoring = super::scoring_config(opts);
    let (results, mut warnings) = compute_stability(&set, &scoring);
    warnings.splice(0..0, set.warnings().iter().cloned());

    let width = results
        .iter()
        .map(|r| r.signal_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Signal".len());
    println!(
        "  {:<width$} {:>9} {:>8} {:>12}",
        "Signal", "Stability", "Devices", "Matched"
    );
    println!("  {}", "-".repeat(width + 32));
    for r in &results {
        let pct = r
            .stability
            .map(|s| format!("{s:.2}%"))
            .unwrap_or_else(|| "—".to_string());
        println!(
            "  {:<width$} {:>9} {:>8} {:>12}",
            r.signal_name,
            pct,
            r.repeat_devices,
            format!("{}/{}", r.matches, r.comparisons)
        );
    }

    println!("\nReference sample: {}. '—' means no device was sampled twice.", scoring.reference);

    super::print_warnings(&warnings);
    super::exit_if_strict(opts.strict, &warnings);
}
