//! EDF header parsing.
//!
//! On-disk layout (ASCII, space padded):
//!
//! ```text
//! fixed part, 256 bytes
//!   8  version            80  patient id         80  recording id
//!   8  start date          8  start time          8  header bytes
//!  44  reserved            8  n data records      8  record duration (s)
//!   4  n signals (ns)
//!
//! signal part, ns × 256 bytes, stored field by field:
//!  16  label              80  transducer          8  physical dimension
//!   8  physical min        8  physical max        8  digital min
//!   8  digital max        80  prefiltering        8  samples per record
//!  32  reserved
//! ```
//!
//! The data records follow: each holds `samples_per_record` little-endian
//! `i16` values for signal 0, then signal 1, and so on.
use std::io::Read;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Size of the fixed header part.
pub const FIXED_HEADER_BYTES: usize = 256;
/// Size of the header part per signal.
pub const SIGNAL_HEADER_BYTES: usize = 256;

/// Field widths of the per-signal header, in on-disk order.
const SIGNAL_FIELDS: [usize; 10] = [16, 80, 8, 8, 8, 8, 8, 80, 8, 32];

// ── Signal header ─────────────────────────────────────────────────────────

/// Header of one signal (channel).
#[derive(Debug, Clone, PartialEq)]
pub struct SignalHeader {
    pub label:              String,
    pub transducer:         String,
    pub physical_dimension: String,
    pub physical_min:       f64,
    pub physical_max:       f64,
    pub digital_min:        i32,
    pub digital_max:        i32,
    pub prefiltering:       String,
    pub samples_per_record: usize,
}

impl SignalHeader {
    /// Physical units per digital step.
    #[inline]
    pub fn gain(&self) -> f64 {
        let span = (self.digital_max - self.digital_min) as f64;
        if span == 0.0 {
            1.0
        } else {
            (self.physical_max - self.physical_min) / span
        }
    }

    /// Convert one digital sample to physical units.
    #[inline]
    pub fn to_physical(&self, digital: i16) -> f64 {
        (digital as f64 - self.digital_min as f64) * self.gain() + self.physical_min
    }
}

// ── File header ───────────────────────────────────────────────────────────

/// Parsed EDF header.
#[derive(Debug, Clone, PartialEq)]
pub struct EdfHeader {
    pub version:      String,
    pub patient:      String,
    pub recording:    String,
    pub start_date:   String,
    pub start_time:   String,
    /// Offset of the first data record.
    pub header_bytes: usize,
    /// Number of data records; `-1` in the file means "unknown" and is
    /// resolved from the file size by the reader.
    pub n_records:    i64,
    /// Duration of one data record in seconds.
    pub record_secs:  f64,
    pub signals:      Vec<SignalHeader>,
}

impl EdfHeader {
    /// Read and parse the complete header from the start of `reader`.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut fixed = [0u8; FIXED_HEADER_BYTES];
        reader.read_exact(&mut fixed).context("read EDF fixed header")?;

        let mut off = 0;
        let mut field = |width: usize| {
            let s = ascii(&fixed[off..off + width]);
            off += width;
            s
        };
        let version    = field(8);
        let patient    = field(80);
        let recording  = field(80);
        let start_date = field(8);
        let start_time = field(8);
        let header_bytes: usize = number(&field(8), "header bytes")?;
        let _reserved  = field(44);
        let n_records: i64 = number(&field(8), "number of data records")?;
        let record_secs: f64 = number(&field(8), "data record duration")?;
        let n_signals: usize = number(&field(4), "number of signals")?;

        let expected = FIXED_HEADER_BYTES + n_signals * SIGNAL_HEADER_BYTES;
        if header_bytes != expected {
            bail!("EDF header size {header_bytes} does not match {n_signals} signals (expected {expected})");
        }

        let mut raw = vec![0u8; n_signals * SIGNAL_HEADER_BYTES];
        reader.read_exact(&mut raw).context("read EDF signal headers")?;
        let signals = parse_signal_headers(&raw, n_signals)?;

        Ok(Self {
            version,
            patient,
            recording,
            start_date,
            start_time,
            header_bytes,
            n_records,
            record_secs,
            signals,
        })
    }

    #[inline]
    pub fn n_signals(&self) -> usize {
        self.signals.len()
    }

    /// Bytes occupied by one data record.
    pub fn record_bytes(&self) -> usize {
        self.signals.iter().map(|s| s.samples_per_record * 2).sum()
    }

    /// Byte offset of signal `idx` inside a data record.
    pub fn signal_offset(&self, idx: usize) -> usize {
        self.signals[..idx].iter().map(|s| s.samples_per_record * 2).sum()
    }

    /// Sampling frequency of signal `idx` in Hz.
    pub fn sample_frequency(&self, idx: usize) -> f64 {
        self.signals[idx].samples_per_record as f64 / self.record_secs
    }
}

/// Signal headers are stored field-major: all labels, then all transducers…
fn parse_signal_headers(raw: &[u8], n_signals: usize) -> Result<Vec<SignalHeader>> {
    let mut columns: Vec<Vec<String>> = Vec::with_capacity(SIGNAL_FIELDS.len());
    let mut off = 0;
    for width in SIGNAL_FIELDS {
        columns.push(
            (0..n_signals)
                .map(|i| ascii(&raw[off + i * width..off + (i + 1) * width]))
                .collect(),
        );
        off += width * n_signals;
    }

    (0..n_signals)
        .map(|i| -> Result<SignalHeader> {
            let ctx = |what: &str| format!("signal {i}: {what}");
            Ok(SignalHeader {
                label:              columns[0][i].clone(),
                transducer:         columns[1][i].clone(),
                physical_dimension: columns[2][i].clone(),
                physical_min:       number(&columns[3][i], &ctx("physical minimum"))?,
                physical_max:       number(&columns[4][i], &ctx("physical maximum"))?,
                digital_min:        number(&columns[5][i], &ctx("digital minimum"))?,
                digital_max:        number(&columns[6][i], &ctx("digital maximum"))?,
                prefiltering:       columns[7][i].clone(),
                samples_per_record: number(&columns[8][i], &ctx("samples per record"))?,
            })
        })
        .collect()
}

/// Latin-1 field → trimmed `String`.
fn ascii(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect::<String>().trim().to_string()
}

fn number<T>(field: &str, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    field
        .parse::<T>()
        .with_context(|| format!("invalid EDF {what}: {field:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn signal(spr: usize) -> SignalHeader {
        SignalHeader {
            label:              "EEG".into(),
            transducer:         String::new(),
            physical_dimension: "uV".into(),
            physical_min:       -125.0,
            physical_max:       125.0,
            digital_min:        -128,
            digital_max:        127,
            prefiltering:       String::new(),
            samples_per_record: spr,
        }
    }

    #[test]
    fn physical_conversion_hits_range_ends() {
        let s = signal(125);
        assert_abs_diff_eq!(s.to_physical(-128), -125.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.to_physical(127), 125.0, epsilon = 1e-9);
    }

    #[test]
    fn record_layout() {
        let h = EdfHeader {
            version:      "0".into(),
            patient:      String::new(),
            recording:    String::new(),
            start_date:   String::new(),
            start_time:   String::new(),
            header_bytes: 256 * 3,
            n_records:    10,
            record_secs:  1.0,
            signals:      vec![signal(125), signal(1), signal(125)],
        };
        assert_eq!(h.record_bytes(), 502);
        assert_eq!(h.signal_offset(2), 252);
        assert_abs_diff_eq!(h.sample_frequency(1), 1.0);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut short: &[u8] = &[b' '; 100];
        assert!(EdfHeader::read(&mut short).is_err());
    }
}
