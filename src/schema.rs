//! Row materialisation: the fixed column set of a run and the CSV sink.
//!
//! Columns (in order):
//!
//! ```text
//! subject_id  in_cohort1  in_cohort2  cohort  sleep_stage  <value columns>
//!
//! Interspersed:  eeg1_0 … eeg1_{b-1}  eeg2_0 … eeg2_{b-1}
//! Separate:      eeg_0 … eeg_{b-1}    eeg_signal
//! ```
//!
//! The set is derived once from the [`BatchConfig`] and every row written
//! during the run must match it exactly.  A mismatch is a configuration or
//! programming error and fails the run with [`SchemaError`].
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::batch::{value_column, value_prefix, Cell, Row, EEG_SIGNAL, SLEEP_STAGE};
use crate::config::{BatchConfig, Layout};
use crate::session::Cohort;

pub const SUBJECT_ID: &str = "subject_id";
pub const IN_COHORT1: &str = "in_cohort1";
pub const IN_COHORT2: &str = "in_cohort2";
pub const COHORT: &str = "cohort";

/// A row did not carry exactly the run's columns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("row does not match the run's column set (missing: {missing:?}, unexpected: {unexpected:?})")]
    Mismatch { missing: Vec<String>, unexpected: Vec<String> },
}

/// Per-session constants merged into every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMeta {
    pub subject_id: String,
    /// Whether the patient has a session in cohort 1 / cohort 2.
    pub in_cohort: [bool; 2],
    /// Cohort of the session the row came from.
    pub cohort: Cohort,
}

impl SessionMeta {
    fn cells(&self) -> [(&'static str, Cell); 4] {
        [
            (SUBJECT_ID, Cell::Text(self.subject_id.clone())),
            (IN_COHORT1, Cell::Bool(self.in_cohort[0])),
            (IN_COHORT2, Cell::Bool(self.in_cohort[1])),
            (COHORT, Cell::Text(self.cohort.tag().to_string())),
        ]
    }
}

/// Ordered column set of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(cfg: &BatchConfig) -> Self {
        let mut columns: Vec<String> = [SUBJECT_ID, IN_COHORT1, IN_COHORT2, COHORT, SLEEP_STAGE]
            .into_iter()
            .map(String::from)
            .collect();
        match cfg.layout {
            Layout::Interspersed => {
                for slot in 0..2 {
                    let prefix = value_prefix(cfg.layout, slot);
                    columns.extend((0..cfg.batch_size).map(|k| value_column(prefix, k)));
                }
            }
            Layout::Separate => {
                let prefix = value_prefix(cfg.layout, 0);
                columns.extend((0..cfg.batch_size).map(|k| value_column(prefix, k)));
                columns.push(EEG_SIGNAL.to_string());
            }
        }
        let index = columns.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect();
        Self { columns, index }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Merge `meta` into `row` and render the fields in column order.
    ///
    /// Fails if any column is missing, unknown or given twice.
    pub fn record(&self, meta: &SessionMeta, row: &Row) -> Result<Vec<String>, SchemaError> {
        let mut fields: Vec<Option<String>> = vec![None; self.columns.len()];
        let mut unexpected = Vec::new();

        let meta_cells = meta.cells();
        let cells = meta_cells.iter().map(|(c, v)| (*c, v)).chain(row.iter());
        for (column, cell) in cells {
            match self.index.get(column) {
                Some(&i) if fields[i].is_none() => fields[i] = Some(cell.to_string()),
                _ => unexpected.push(column.to_string()),
            }
        }

        let missing: Vec<String> = fields
            .iter()
            .zip(&self.columns)
            .filter(|(f, _)| f.is_none())
            .map(|(_, c)| c.clone())
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(SchemaError::Mismatch { missing, unexpected });
        }
        Ok(fields.into_iter().flatten().collect())
    }
}

/// CSV sink that writes the header once, then one validated line per row.
pub struct RowWriter<W: Write> {
    schema: Schema,
    inner: csv::Writer<W>,
    rows: usize,
}

impl RowWriter<File> {
    /// Create (truncate) `path` and write the header.
    pub fn create(path: &Path, schema: Schema) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("create {}", path.display()))?;
        Self::new(file, schema)
    }
}

impl<W: Write> RowWriter<W> {
    pub fn new(sink: W, schema: Schema) -> Result<Self> {
        let mut inner = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
        inner.write_record(schema.columns()).context("write CSV header")?;
        Ok(Self { schema, inner, rows: 0 })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rows written so far (header excluded).
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Validate and write one row.  Nothing is written if validation fails.
    pub fn write_row(&mut self, meta: &SessionMeta, row: &Row) -> Result<()> {
        let record = self.schema.record(meta, row)?;
        self.inner.write_record(&record).context("write CSV row")?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and hand back the underlying sink.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().context("flush CSV sink")?;
        self.inner
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flush CSV sink: {}", e.error()))
    }
}
