//! CLI for tuxid: how identifying, and how sticky, is each signal your machine leaks?

mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tuxid")]
#[command(about = "tuxid: score machine-identifying signals by entropy and reboot stability")]
#[command(version = tuxid_core::VERSION)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Signal registry overrides (JSON array of definitions)
    #[arg(long, global = true)]
    registry: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads a corpus.
#[derive(Args)]
struct CorpusArgs {
    /// Corpus: a CSV file, a samples directory (<device>/boot<N>.json), or "-" for CSV on stdin
    input: String,

    /// Reference sample per device: first (earliest boot) or modal (most frequent value)
    #[arg(long, default_value = "first", value_parser = ["first", "modal"])]
    reference: String,

    /// Header name of the device column (CSV input)
    #[arg(long)]
    device_column: Option<String>,

    /// Header name of the sequence/boot column (CSV input)
    #[arg(long)]
    sequence_column: Option<String>,

    /// Header name of the signal name column (CSV input)
    #[arg(long)]
    signal_column: Option<String>,

    /// Header name of the value column (CSV input)
    #[arg(long)]
    value_column: Option<String>,

    /// Exit with status 2 if any warning was raised
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every observed signal: entropy, stability, resettability, privilege
    Report {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Output format
        #[arg(long, default_value = "csv", value_parser = ["csv", "json", "table"])]
        format: String,

        /// Decimal places for entropy and stability
        #[arg(long, default_value_t = tuxid_core::DEFAULT_PRECISION)]
        precision: usize,

        /// Precomputed stability table (CSV: Signal Name,Stability) overriding computed values
        #[arg(long)]
        stability_table: Option<String>,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Per-signal entropy detail: devices, distinct values, unknown values
    Entropy {
        #[command(flatten)]
        corpus: CorpusArgs,
    },

    /// Per-signal stability detail: repeat-sampled devices, matches, comparisons
    Stability {
        #[command(flatten)]
        corpus: CorpusArgs,
    },

    /// List the signal registry
    Signals {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

impl CorpusArgs {
    fn options(&self) -> commands::CorpusOptions<'_> {
        commands::CorpusOptions {
            input: &self.input,
            reference: &self.reference,
            device_column: self.device_column.as_deref(),
            sequence_column: self.sequence_column.as_deref(),
            signal_column: self.signal_column.as_deref(),
            value_column: self.value_column.as_deref(),
            strict: self.strict,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let registry = cli.registry.as_deref();

    match cli.command {
        Commands::Report {
            corpus,
            format,
            precision,
            stability_table,
            output,
        } => commands::report::run(commands::report::ReportCommandConfig {
            corpus: corpus.options(),
            registry_path: registry,
            format: &format,
            precision,
            stability_table: stability_table.as_deref(),
            output_path: output.as_deref(),
        }),
        Commands::Entropy { corpus } => commands::entropy::run(&corpus.options()),
        Commands::Stability { corpus } => commands::stability::run(&corpus.options()),
        Commands::Signals { json } => commands::signals::run(registry, json),
    }
}
