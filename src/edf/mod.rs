//! EDF (European Data Format) reader.
//!
//! Reads the fixed header, the per-signal headers and individual signals of
//! an `.edf` polysomnography recording.  Only what the exporter needs is
//! implemented: no EDF+ annotation channels and no writing.
//!
//! # Quick start
//! ```no_run
//! use shhs_prep::edf::EdfReader;
//!
//! let mut edf = EdfReader::open("shhs1-200001.edf").unwrap();
//! println!("{} signals, {} records", edf.header.n_signals(), edf.header.n_records);
//! let eeg = edf.read_signal(2).unwrap();   // physical units, f64
//! ```
pub mod header;
pub mod reader;

pub use header::{EdfHeader, SignalHeader, FIXED_HEADER_BYTES, SIGNAL_HEADER_BYTES};
pub use reader::{open_edf, EdfReader};
