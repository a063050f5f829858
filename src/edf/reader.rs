//! EDF signal reader.
//!
//! # Algorithm
//! 1. Open the file and parse the header.
//! 2. Resolve the record count (`-1` ⇒ derive from the file size).
//! 3. For a requested signal, visit every data record, seek to the signal's
//!    slice and decode `samples_per_record` little-endian `i16` samples.
//!
//! # Calibration
//! ```text
//! physical = (digital − digital_min) × (physical_max − physical_min)
//!                                     / (digital_max − digital_min) + physical_min
//! ```
//!
//! The file handle lives inside [`EdfReader`] and is closed when the reader
//! is dropped.
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::Array1;

use super::header::{EdfHeader, SignalHeader};

/// An open EDF recording.
#[derive(Debug)]
pub struct EdfReader {
    pub header: EdfHeader,
    /// File this was read from.
    pub path:   PathBuf,
    reader:     BufReader<File>,
    n_records:  usize,
}

impl EdfReader {
    /// Open `path` and parse its header.  No samples are read yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("open {}", path.display()))?;
        let file_len = file.metadata()
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        let mut reader = BufReader::new(file);
        let header = EdfHeader::read(&mut reader)
            .with_context(|| format!("parse EDF header of {}", path.display()))?;

        if header.record_secs <= 0.0 {
            bail!("{}: non-positive data record duration {}", path.display(), header.record_secs);
        }

        let record_bytes = header.record_bytes() as u64;
        let available = if record_bytes == 0 {
            0
        } else {
            file_len.saturating_sub(header.header_bytes as u64) / record_bytes
        };
        let n_records = if header.n_records < 0 {
            available as usize
        } else if (header.n_records as u64) > available {
            bail!(
                "{}: header declares {} data records but the file holds {available}",
                path.display(),
                header.n_records,
            );
        } else {
            header.n_records as usize
        };

        Ok(Self { header, path: path.to_path_buf(), reader, n_records })
    }

    /// Number of data records actually readable.
    #[inline]
    pub fn n_records(&self) -> usize {
        self.n_records
    }

    /// Header of signal `idx`.
    pub fn signal(&self, idx: usize) -> Result<&SignalHeader> {
        self.header.signals.get(idx).with_context(|| {
            format!(
                "{}: signal {idx} requested but the file has {} signals",
                self.path.display(),
                self.header.n_signals(),
            )
        })
    }

    /// Samples of signal `idx` over the whole recording.
    pub fn signal_len(&self, idx: usize) -> Result<usize> {
        Ok(self.signal(idx)?.samples_per_record * self.n_records)
    }

    /// Sampling frequency of signal `idx` in Hz.
    pub fn sample_frequency(&self, idx: usize) -> Result<f64> {
        self.signal(idx)?;
        Ok(self.header.sample_frequency(idx))
    }

    /// Read signal `idx` in physical units.
    pub fn read_signal(&mut self, idx: usize) -> Result<Array1<f64>> {
        let sig = self.signal(idx)?.clone();
        let spr = sig.samples_per_record;
        let record_bytes = self.header.record_bytes() as u64;
        let base = self.header.header_bytes as u64 + self.header.signal_offset(idx) as u64;

        let mut out = Vec::with_capacity(spr * self.n_records);
        let mut buf = vec![0u8; spr * 2];
        for r in 0..self.n_records as u64 {
            let pos = base + r * record_bytes;
            self.reader
                .seek(SeekFrom::Start(pos))
                .with_context(|| format!("seek to record {r} @ {pos:#x}"))?;
            self.reader
                .read_exact(&mut buf)
                .with_context(|| format!("{}: read record {r} of signal {idx}", self.path.display()))?;
            out.extend(
                buf.chunks_exact(2)
                    .map(|b| sig.to_physical(i16::from_le_bytes([b[0], b[1]]))),
            );
        }
        Ok(Array1::from(out))
    }
}

/// Open an EDF file.  Shorthand for [`EdfReader::open`].
pub fn open_edf<P: AsRef<Path>>(path: P) -> Result<EdfReader> {
    EdfReader::open(path)
}
