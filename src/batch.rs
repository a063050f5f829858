//! Epoch-aligned batching.
//!
//! Cuts a session's co-sampled channels into windows of `batch_size`
//! samples and tags every window with the sleep stage in force at its first
//! sample.  Labels are recorded per 30 s epoch, so there are far fewer
//! labels (`L`) than samples (`N`); the mapping is proportional:
//!
//! ```text
//! label_index(i) = floor(i · L / N)        0 ≤ i < N   ⇒   label_index < L
//!
//! samples  |0 ─────────── 100 ────────── 200 ──────── 300|     N = 300, b = 100
//! labels   |0 1 2 3 4 5 6 7 8 9|                              L = 10
//! window 0 → i =   0 → labels[0]
//! window 1 → i = 100 → labels[3]
//! window 2 → i = 200 → labels[6]
//! ```
//!
//! Samples later in a window that fall into the next epoch keep the
//! window's label; windows are never re-split at epoch boundaries.
//!
//! [`SessionRows`] is the lazy row sequence for one session.  It borrows the
//! session and never mutates it; iterating the same session twice with the
//! same [`BatchConfig`] yields identical rows.
use std::fmt;
use std::iter::FusedIterator;

use crate::config::{BatchConfig, LastBatch, Layout};
use crate::session::{Channel, Session};

/// Output column holding the window's label.
pub const SLEEP_STAGE: &str = "sleep_stage";
/// Output column holding the channel discriminator in [`Layout::Separate`].
pub const EEG_SIGNAL: &str = "eeg_signal";

/// Value-column prefix for channel slot `slot` in `layout`.
pub fn value_prefix(layout: Layout, slot: usize) -> &'static str {
    match (layout, slot) {
        (Layout::Separate, _) => "eeg",
        (Layout::Interspersed, 0) => "eeg1",
        (Layout::Interspersed, _) => "eeg2",
    }
}

/// Name of the `k`-th value column with `prefix`.
#[inline]
pub fn value_column(prefix: &str, k: usize) -> String {
    format!("{prefix}_{k}")
}

// ── Cells and rows ────────────────────────────────────────────────────────

/// One scalar in an output row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Bool(bool),
    Float(f64),
    /// Explicitly absent (past the end of a short window, or a missing
    /// channel).  Written as an empty field.
    Empty,
}

impl Cell {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Cell::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Empty => Ok(()),
        }
    }
}

/// A flat column-name → cell mapping, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn with_capacity(n: usize) -> Self {
        Self { cells: Vec::with_capacity(n) }
    }

    pub fn push(&mut self, column: impl Into<String>, cell: Cell) {
        self.cells.push((column.into(), cell));
    }

    /// First cell stored under `column`.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> + '_ {
        self.cells.iter().map(|(c, v)| (c.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The window's label (`sleep_stage`).
    pub fn label(&self) -> Option<&str> {
        self.get(SLEEP_STAGE).and_then(Cell::as_str)
    }

    /// Values of the columns starting with `prefix_`, in order; empty cells
    /// are `None`.
    pub fn values(&self, prefix: &str) -> Vec<Option<f64>> {
        self.cells
            .iter()
            .filter(|(c, _)| {
                c.strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .is_some_and(|k| k.bytes().all(|b| b.is_ascii_digit()))
            })
            .map(|(_, v)| v.as_f64())
            .collect()
    }
}

// ── Label alignment ──────────────────────────────────────────────────────

/// Label index for the window starting at sample `start`.
///
/// Computes `floor(start · n_labels / n_samples)` exactly in integer
/// arithmetic.  Requires `start < n_samples`, which makes the result
/// `< n_labels`.
#[inline]
pub fn label_index(start: usize, n_samples: usize, n_labels: usize) -> usize {
    debug_assert!(start < n_samples, "window start {start} outside {n_samples} samples");
    ((start as u128 * n_labels as u128) / n_samples as u128) as usize
}

/// Number of windows produced for `n_samples` at `batch_size` under `last`.
///
/// `ceil(N / b)` for [`LastBatch::Keep`] and [`LastBatch::Pad`],
/// `floor(N / b)` for [`LastBatch::Drop`].
pub fn window_count(n_samples: usize, batch_size: usize, last: LastBatch) -> usize {
    if batch_size == 0 {
        return 0;
    }
    match last {
        LastBatch::Drop => n_samples / batch_size,
        LastBatch::Keep | LastBatch::Pad => n_samples.div_ceil(batch_size),
    }
}

// ── Windows ──────────────────────────────────────────────────────────────

/// One window of consecutive sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Ordinal of the window within its session.
    pub index: usize,
    /// First sample index.
    pub start: usize,
    /// Samples actually available (`batch_size`, or less for the last one).
    pub len: usize,
    /// Index into the session's label sequence.
    pub label: usize,
}

/// Iterator over the windows of one session.
#[derive(Debug, Clone)]
pub struct Windows {
    n_samples: usize,
    n_labels: usize,
    batch_size: usize,
    next: usize,
    count: usize,
}

impl Windows {
    /// Windows over `n_samples` samples labelled by `n_labels` labels.
    ///
    /// Empty when either count is zero: such a session cannot be labelled.
    pub fn new(n_samples: usize, n_labels: usize, batch_size: usize, last: LastBatch) -> Self {
        let count = if n_samples == 0 || n_labels == 0 {
            0
        } else {
            window_count(n_samples, batch_size, last)
        };
        Self { n_samples, n_labels, batch_size, next: 0, count }
    }
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let start = index * self.batch_size;
        Some(Window {
            index,
            start,
            len: self.batch_size.min(self.n_samples - start),
            label: label_index(start, self.n_samples, self.n_labels),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.count - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Windows {}
impl FusedIterator for Windows {}

// ── Rows ─────────────────────────────────────────────────────────────────

/// Lazy row sequence for one session.
///
/// Finite and fused: once exhausted it stays exhausted.  Call
/// [`SessionRows::new`] again for a fresh pass.
#[derive(Debug, Clone)]
pub struct SessionRows<'a> {
    session: &'a Session,
    cfg: BatchConfig,
    windows: Windows,
    n_samples: usize,
    /// Legacy interspersed read position (see [`BatchConfig::shared_cursor`]).
    cursor: usize,
    /// Second row of a [`Layout::Separate`] window.
    pending: Option<Row>,
}

impl<'a> SessionRows<'a> {
    pub fn new(session: &'a Session, cfg: &BatchConfig) -> Self {
        let n_samples = session.n_samples();
        Self {
            session,
            cfg: cfg.clone(),
            windows: Windows::new(n_samples, session.n_labels(), cfg.batch_size, cfg.last_batch),
            n_samples,
            cursor: 0,
            pending: None,
        }
    }

    fn channel(&self, slot: usize) -> Option<&'a Channel> {
        self.session.signal.as_ref().and_then(|s| s.channel(slot))
    }

    fn label_cell(&self, w: &Window) -> Cell {
        Cell::Text(self.session.labels[w.label].clone())
    }

    /// Append `batch_size` value cells for `channel`, read from `start`.
    ///
    /// Padding only applies to aligned reads; legacy shared-cursor reads
    /// past the data stay empty.
    fn push_values(&self, row: &mut Row, prefix: &str, channel: Option<&Channel>, start: usize) {
        let pad = self.cfg.last_batch == LastBatch::Pad && !self.cfg.shared_cursor;
        for k in 0..self.cfg.batch_size {
            let idx = start + k;
            let cell = match channel {
                Some(ch) if idx < self.n_samples => Cell::Float(ch.samples[idx]),
                Some(_) if pad => Cell::Float(0.0),
                _ => Cell::Empty,
            };
            row.push(value_column(prefix, k), cell);
        }
    }

    fn interspersed_row(&mut self, w: &Window) -> Row {
        let (start1, start2) = if self.cfg.shared_cursor {
            let s = self.cursor;
            self.cursor += 2 * self.cfg.batch_size;
            (s, s + self.cfg.batch_size)
        } else {
            (w.start, w.start)
        };
        let mut row = Row::with_capacity(2 * self.cfg.batch_size + 1);
        self.push_values(&mut row, value_prefix(Layout::Interspersed, 0), self.channel(0), start1);
        self.push_values(&mut row, value_prefix(Layout::Interspersed, 1), self.channel(1), start2);
        row.push(SLEEP_STAGE, self.label_cell(w));
        row
    }

    fn separate_row(&self, w: &Window, slot: usize) -> Row {
        let mut row = Row::with_capacity(self.cfg.batch_size + 2);
        self.push_values(&mut row, value_prefix(Layout::Separate, slot), self.channel(slot), w.start);
        row.push(EEG_SIGNAL, Cell::Text((slot + 1).to_string()));
        row.push(SLEEP_STAGE, self.label_cell(w));
        row
    }

    fn rows_per_window(&self) -> usize {
        match self.cfg.layout {
            Layout::Interspersed => 1,
            Layout::Separate => (0..2).filter(|&s| self.channel(s).is_some()).count(),
        }
    }
}

impl Iterator for SessionRows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if let Some(row) = self.pending.take() {
            return Some(row);
        }
        let w = self.windows.next()?;
        match self.cfg.layout {
            Layout::Interspersed => Some(self.interspersed_row(&w)),
            Layout::Separate => {
                let mut rows = (0..2)
                    .filter(|&slot| self.channel(slot).is_some())
                    .map(|slot| self.separate_row(&w, slot))
                    .collect::<Vec<_>>()
                    .into_iter();
                let first = rows.next();
                self.pending = rows.next();
                first
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.windows.len() * self.rows_per_window() + usize::from(self.pending.is_some());
        (n, Some(n))
    }
}

impl ExactSizeIterator for SessionRows<'_> {}
impl FusedIterator for SessionRows<'_> {}
