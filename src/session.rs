//! Sessions: one patient, one cohort, one recording plus its sleep stages.
use std::fmt;

use ndarray::Array1;

use crate::batch::{Row, SessionRows};
use crate::config::BatchConfig;
use crate::schema::SessionMeta;

/// SHHS visit a recording belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cohort {
    Shhs1,
    Shhs2,
}

impl Cohort {
    pub const ALL: [Cohort; 2] = [Cohort::Shhs1, Cohort::Shhs2];

    /// Value of the `cohort` output column.
    pub fn tag(self) -> &'static str {
        match self {
            Cohort::Shhs1 => "1",
            Cohort::Shhs2 => "2",
        }
    }

    /// Directory / file-name stem used by the dataset (`shhs1`, `shhs2`).
    pub fn dir_name(self) -> &'static str {
        match self {
            Cohort::Shhs1 => "shhs1",
            Cohort::Shhs2 => "shhs2",
        }
    }

    /// Position in per-cohort arrays (`[_; 2]`).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Cohort::Shhs1 => 0,
            Cohort::Shhs2 => 1,
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One named sample stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Signal label as found in the recording (e.g. `"EEG(sec)"`).
    pub name: String,
    /// Sampling frequency in Hz.
    pub sfreq: f64,
    /// Samples in physical units.
    pub samples: Array1<f64>,
}

impl Channel {
    pub fn new(name: impl Into<String>, sfreq: f64, samples: impl Into<Array1<f64>>) -> Self {
        Self { name: name.into(), sfreq, samples: samples.into() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The two EEG channel slots of a session.  Either slot may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalData {
    pub channels: [Option<Channel>; 2],
}

impl SignalData {
    pub fn new(first: Option<Channel>, second: Option<Channel>) -> Self {
        Self { channels: [first, second] }
    }

    /// Shared sample count: the shortest present channel, 0 if none.
    pub fn n_samples(&self) -> usize {
        self.channels.iter().flatten().map(Channel::len).min().unwrap_or(0)
    }

    /// Channel in slot `slot` (0 or 1).
    #[inline]
    pub fn channel(&self, slot: usize) -> Option<&Channel> {
        self.channels.get(slot).and_then(Option::as_ref)
    }
}

/// One recording of one patient in one cohort, with its sleep stages.
///
/// `signal` is `None` until (or unless) the recording has been loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub patient_id: String,
    pub cohort: Cohort,
    /// One label per 30 s epoch, in recording order.
    pub labels: Vec<String>,
    pub signal: Option<SignalData>,
}

impl Session {
    pub fn new(patient_id: impl Into<String>, cohort: Cohort, labels: Vec<String>) -> Self {
        Self { patient_id: patient_id.into(), cohort, labels, signal: None }
    }

    pub fn with_signal(mut self, signal: SignalData) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Total sample count `N` (minimum across present channels).
    pub fn n_samples(&self) -> usize {
        self.signal.as_ref().map_or(0, SignalData::n_samples)
    }

    /// Number of labels `L`.
    #[inline]
    pub fn n_labels(&self) -> usize {
        self.labels.len()
    }

    /// Implied epoch duration in seconds, from the first present channel's
    /// sampling rate.  `None` when it cannot be computed.
    pub fn epoch_secs(&self) -> Option<f64> {
        let ch = self.signal.as_ref()?.channels.iter().flatten().next()?;
        if self.labels.is_empty() || ch.sfreq <= 0.0 {
            return None;
        }
        Some(self.n_samples() as f64 / ch.sfreq / self.labels.len() as f64)
    }
}

/// A patient and the sessions loaded for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: String,
    /// Whether the dataset has a session (annotation + recording) for
    /// cohort 1 / cohort 2.
    pub in_cohort: [bool; 2],
    /// Loaded sessions in cohort order.  A session that failed to load is
    /// absent even though its `in_cohort` flag is set.
    pub sessions: Vec<Session>,
}

impl Patient {
    /// Row metadata for this patient's session in `cohort`.
    pub fn meta(&self, cohort: Cohort) -> SessionMeta {
        SessionMeta { subject_id: self.id.clone(), in_cohort: self.in_cohort, cohort }
    }

    /// Rows of every session, one session after the other.
    pub fn rows<'a>(&'a self, cfg: &'a BatchConfig) -> impl Iterator<Item = (SessionMeta, Row)> + 'a {
        self.sessions.iter().flat_map(move |session| {
            let meta = self.meta(session.cohort);
            SessionRows::new(session, cfg).map(move |row| (meta.clone(), row))
        })
    }
}
