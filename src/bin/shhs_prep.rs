/// shhs_prep: turn an SHHS download into an epoch-aligned CSV.
///
/// Columns:
///   subject_id  in_cohort1  in_cohort2  cohort  sleep_stage
///   interspersed: eeg1_0 … eeg1_{b-1}  eeg2_0 … eeg2_{b-1}
///   separate:     eeg_0 … eeg_{b-1}    eeg_signal
///
/// Log verbosity follows RUST_LOG (default: info).
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use shhs_prep::config::{parse_count_or, parse_limit_or, DEFAULT_BATCH_SIZE, DEFAULT_POPULATION_SIZE};
use shhs_prep::{export_dataset, BatchConfig, ExportConfig, LastBatch, Layout};

#[derive(Parser, Debug)]
#[command(name = "shhs_prep", about = "Turns an SHHS dataset into a useful dataframe/CSV set")]
struct Args {
    /// How many EDF samples to batch together.  Affects column count.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE.to_string(), allow_hyphen_values = true)]
    batch_size: String,

    /// How many patients to export.  0 writes only the header.
    #[arg(long, default_value_t = DEFAULT_POPULATION_SIZE.to_string(), allow_hyphen_values = true)]
    population_size: String,

    /// Put both EEG channels into the same row (the default).
    #[arg(long, conflicts_with = "separate")]
    interspersed: bool,

    /// Emit one row per EEG channel, told apart by `eeg_signal`.
    #[arg(long)]
    separate: bool,

    /// What to do with a short final window: keep, pad or drop.
    #[arg(long, default_value_t = LastBatch::Keep)]
    last_batch: LastBatch,

    /// Read channel 2 right after channel 1 in interspersed rows, as older
    /// exports did.
    #[arg(long)]
    shared_cursor: bool,

    /// Only export these patient ids.
    #[arg(long, num_args = 1..)]
    patient_ids: Vec<String>,

    /// Path to the SHHS folder.
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Path of the CSV to write.
    #[arg(long, default_value = "./results.csv")]
    dump_path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let layout = match (args.interspersed, args.separate) {
        (false, true) => Layout::Separate,
        _ => Layout::Interspersed,
    };
    let cfg = ExportConfig {
        batch: BatchConfig {
            batch_size: parse_count_or("batch size", &args.batch_size, DEFAULT_BATCH_SIZE),
            layout,
            last_batch: args.last_batch,
            shared_cursor: args.shared_cursor,
        },
        population_size: parse_limit_or("population size", &args.population_size, DEFAULT_POPULATION_SIZE),
        patient_ids: args.patient_ids,
    };

    let root = std::path::absolute(&args.path)?;
    let dump_path = std::path::absolute(&args.dump_path)?;
    info!(
        root = %root.display(),
        batch_size = cfg.batch.batch_size,
        population_size = cfg.population_size,
        layout = ?cfg.batch.layout,
        last_batch = %cfg.batch.last_batch,
        "exporting"
    );

    let summary = export_dataset(&root, &dump_path, &cfg)?;
    eprintln!(
        "{} patients, {} sessions ({} skipped), {} rows → {}",
        summary.patients,
        summary.sessions,
        summary.skipped_sessions,
        summary.rows,
        dump_path.display()
    );
    Ok(())
}
