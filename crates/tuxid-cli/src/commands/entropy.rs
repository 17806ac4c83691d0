//! `tuxid entropy`: per-signal entropy breakdown.

use tuxid_core::compute_entropy;

use super::CorpusOptions;

pub fn run(opts: &CorpusOptions<'_>) {
    let set = super::load_corpus(opts);
    let scoring = super::scoring_config(opts);
    let (mut results, mut warnings) = compute_entropy(&set, &scoring);
    warnings.splice(0..0, set.warnings().iter().cloned());

    // Most identifying first.
    results.sort_by(|a, b| {
        b.entropy
            .total_cmp(&a.entropy)
            .then_with(|| a.signal_name.cmp(&b.signal_name))
    });

    let width = results
        .iter()
        .map(|r| r.signal_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Signal".len());
    println!(
        "  {:<width$} {:>8} {:>8} {:>9} {:>8}",
        "Signal", "Entropy", "Devices", "Distinct", "Unknown"
    );
    println!("  {}", "-".repeat(width + 37));
    for r in &results {
        println!(
            "  {:<width$} {:>8.4} {:>8} {:>9} {:>8}",
            r.signal_name, r.entropy, r.devices, r.distinct_values, r.missing
        );
    }

    println!("\nEntropy is normalized by log2(devices): 1.0 = every device reports a");
    println!("different value, 0.0 = the signal cannot tell devices apart.");

    super::print_warnings(&warnings);
    super::exit_if_strict(opts.strict, &warnings);
}
