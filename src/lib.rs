//! # shhs-prep: SHHS polysomnography → epoch-aligned CSV
//!
//! Turns the EEG channels of Sleep Heart Health Study recordings and their
//! 30 s sleep-stage annotations into one flat table, ready for a dataframe
//! or a model's data loader.
//!
//! ## Pipeline overview
//!
//! ```text
//! <root>/polysomnography/…
//!   │
//!   ├─ dataset::DatasetIndex::scan()   pair shhs{1,2}-<id>-profusion.xml with shhs{1,2}-<id>.edf
//!   ├─ dataset::Patients               lazy: labels + EDF signals 2 and 7, file closed after read
//!   ├─ batch::SessionRows              windows of batch_size samples, one sleep stage per window
//!   └─ schema::RowWriter               + subject_id / in_cohort1 / in_cohort2 / cohort → CSV
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use shhs_prep::{export_dataset, ExportConfig};
//! use std::path::Path;
//!
//! let summary = export_dataset(
//!     Path::new("/data/shhs"),
//!     Path::new("results.csv"),
//!     &ExportConfig::default(),
//! ).unwrap();
//! println!("{} rows from {} patients", summary.rows, summary.patients);
//! ```
//!
//! ## Batching a session by hand
//!
//! ```
//! use shhs_prep::{BatchConfig, Layout, SessionRows};
//! use shhs_prep::session::{Channel, Cohort, Session, SignalData};
//!
//! let labels = (0..10).map(|i| i.to_string()).collect();
//! let session = Session::new("200001", Cohort::Shhs1, labels).with_signal(SignalData::new(
//!     Some(Channel::new("EEG(sec)", 125.0, vec![0.0; 300])),
//!     Some(Channel::new("EEG", 125.0, vec![0.0; 300])),
//! ));
//!
//! let cfg = BatchConfig { batch_size: 100, layout: Layout::Separate, ..BatchConfig::default() };
//! let stages: Vec<String> = SessionRows::new(&session, &cfg)
//!     .map(|row| row.label().unwrap().to_string())
//!     .collect();
//! assert_eq!(stages, ["0", "0", "3", "3", "6", "6"]);
//! ```

pub mod annotation;
pub mod batch;
pub mod config;
pub mod dataset;
pub mod discover;
pub mod edf;
pub mod schema;
pub mod session;

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tracing::info;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{BatchConfig, ExportConfig, LastBatch, Layout};

// batch
pub use batch::{label_index, window_count, Cell, Row, SessionRows, Window, Windows};

// dataset
pub use dataset::{DatasetIndex, Patients, ShhsLayout};

// schema
pub use schema::{RowWriter, Schema, SchemaError, SessionMeta};

// session
pub use session::{Channel, Cohort, Patient, Session, SignalData};

/// Counters of one export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Patients pulled from the dataset (at most `population_size`).
    pub patients: usize,
    /// Sessions loaded and batched.
    pub sessions: usize,
    /// Sessions left out because their files could not be read.
    pub skipped_sessions: usize,
    /// Rows written.
    pub rows: usize,
}

/// Export up to `cfg.population_size` patients of `index` into `writer`.
///
/// Patients are visited in id order.  `writer` must have been built from
/// `cfg.batch`; a row that does not match its schema aborts the run.
pub fn export<W: Write>(
    index: &DatasetIndex,
    cfg: &ExportConfig,
    writer: &mut RowWriter<W>,
) -> Result<ExportSummary> {
    cfg.batch.validate()?;
    let ids = index.patient_ids(&cfg.patient_ids);
    let mut patients = index.patients(ids);
    let mut summary = ExportSummary::default();

    for patient in patients.by_ref().take(cfg.population_size) {
        summary.patients += 1;
        summary.sessions += patient.sessions.len();
        for (meta, row) in patient.rows(&cfg.batch) {
            writer.write_row(&meta, &row)?;
            summary.rows += 1;
        }
    }
    summary.skipped_sessions = patients.skipped_sessions();
    Ok(summary)
}

/// Scan the SHHS tree at `root` and write the CSV to `dump_path`.
pub fn export_dataset(root: &Path, dump_path: &Path, cfg: &ExportConfig) -> Result<ExportSummary> {
    cfg.batch.validate()?;
    let index = DatasetIndex::scan(&ShhsLayout::new(root))?;
    let mut writer = RowWriter::create(dump_path, Schema::new(&cfg.batch))?;
    let summary = export(&index, cfg, &mut writer)?;
    writer.finish()?;
    info!(
        patients = summary.patients,
        sessions = summary.sessions,
        skipped = summary.skipped_sessions,
        rows = summary.rows,
        "wrote {}",
        dump_path.display()
    );
    Ok(summary)
}
