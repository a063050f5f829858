//! Run configuration.
//!
//! [`BatchConfig`] holds everything the batching engine needs to turn one
//! session into rows; [`ExportConfig`] wraps it with the dataset-level knobs
//! (population cutoff, patient allowlist).  Both are plain values passed
//! explicitly to each call: there is no global settings object.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Default number of samples per window.
pub const DEFAULT_BATCH_SIZE: usize = 125;

/// Default maximum number of patients exported in one run.
pub const DEFAULT_POPULATION_SIZE: usize = 200;

/// Row layout of the batching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// One row per window, channel 1 and channel 2 as separate column groups
    /// (`eeg1_*`, `eeg2_*`).
    #[default]
    Interspersed,
    /// One row per window *and* channel (`eeg_*` plus an `eeg_signal`
    /// discriminator).
    Separate,
}

/// What to do with a final window shorter than `batch_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastBatch {
    /// Emit it; value cells past the end of the data are empty.
    #[default]
    Keep,
    /// Emit it with the missing values set to `0.0`.
    Pad,
    /// Do not emit it.
    Drop,
}

impl FromStr for LastBatch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "pad" => Ok(Self::Pad),
            "drop" => Ok(Self::Drop),
            other => anyhow::bail!("unknown last-batch policy {other:?} (expected keep, pad or drop)"),
        }
    }
}

impl fmt::Display for LastBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keep => "keep",
            Self::Pad => "pad",
            Self::Drop => "drop",
        })
    }
}

/// Configuration of the epoch-aligned batching engine.
///
/// All fields are `pub`, so struct-update syntax works:
///
/// ```
/// use shhs_prep::{BatchConfig, Layout};
///
/// let cfg = BatchConfig {
///     batch_size: 250,
///     layout: Layout::Separate,
///     ..BatchConfig::default()
/// };
/// assert_eq!(cfg.batch_size, 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Samples per window.  Must be positive; see [`BatchConfig::validate`].
    ///
    /// Default: `125`.
    pub batch_size: usize,

    /// Row layout.
    ///
    /// Default: [`Layout::Interspersed`].
    pub layout: Layout,

    /// Policy for a short final window.
    ///
    /// Default: [`LastBatch::Keep`].
    pub last_batch: LastBatch,

    /// Reproduce the legacy interspersed read pattern, where channel 2's
    /// window starts right after channel 1's window instead of at the same
    /// offset.  Only affects [`Layout::Interspersed`].
    ///
    /// Default: `false`.
    pub shared_cursor: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            layout: Layout::Interspersed,
            last_batch: LastBatch::Keep,
            shared_cursor: false,
        }
    }
}

impl BatchConfig {
    /// Reject a zero batch size.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be positive");
        }
        Ok(())
    }
}

/// Dataset-level configuration for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub batch: BatchConfig,

    /// Maximum number of patients (with at least one recording) to export.
    ///
    /// Default: `200`.
    pub population_size: usize,

    /// Restrict the run to these patient ids.  Empty means "all patients".
    pub patient_ids: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            population_size: DEFAULT_POPULATION_SIZE,
            patient_ids: vec![],
        }
    }
}

/// Parse a positive count, falling back to `default` with a warning.
///
/// Used for the user-facing numeric options: a malformed value must never
/// abort a run.
///
/// ```
/// use shhs_prep::config::parse_count_or;
///
/// assert_eq!(parse_count_or("batch size", "250", 125), 250);
/// assert_eq!(parse_count_or("batch size", "-3", 125), 125);
/// assert_eq!(parse_count_or("batch size", "lots", 125), 125);
/// ```
pub fn parse_count_or(what: &str, raw: &str, default: usize) -> usize {
    parse_at_least(what, raw, default, 1)
}

/// Like [`parse_count_or`], but `0` is accepted.
///
/// A population size of zero exports nothing and writes only the header.
pub fn parse_limit_or(what: &str, raw: &str, default: usize) -> usize {
    parse_at_least(what, raw, default, 0)
}

fn parse_at_least(what: &str, raw: &str, default: usize, min: usize) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= min => n,
        _ => {
            warn!("{what} {raw:?} invalid, using default of {default}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ExportConfig::default();
        assert_eq!(cfg.batch.batch_size, 125);
        assert_eq!(cfg.population_size, 200);
        assert_eq!(cfg.batch.layout, Layout::Interspersed);
        assert_eq!(cfg.batch.last_batch, LastBatch::Keep);
        assert!(!cfg.batch.shared_cursor);
        assert!(cfg.patient_ids.is_empty());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let cfg = BatchConfig { batch_size: 0, ..BatchConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_count_falls_back() {
        assert_eq!(parse_count_or("batch size", "0", 125), 125);
        assert_eq!(parse_count_or("batch size", " 17 ", 125), 17);
    }

    #[test]
    fn zero_limit_is_kept() {
        assert_eq!(parse_limit_or("population size", "0", 200), 0);
        assert_eq!(parse_limit_or("population size", "-1", 200), 200);
        assert_eq!(parse_limit_or("population size", "x", 200), 200);
    }

    #[test]
    fn last_batch_parses() {
        assert_eq!("PAD".parse::<LastBatch>().unwrap(), LastBatch::Pad);
        assert_eq!("drop".parse::<LastBatch>().unwrap(), LastBatch::Drop);
        assert!("trim".parse::<LastBatch>().is_err());
        assert_eq!(LastBatch::Keep.to_string(), "keep");
    }
}
