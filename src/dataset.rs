//! SHHS dataset layout and lazy patient loading.
//!
//! ```text
//! <root>/polysomnography/
//!   annotations-events-profusion/shhs1/shhs1-<id>-profusion.xml
//!   annotations-events-profusion/shhs2/shhs2-<id>-profusion.xml
//!   edfs/shhs1/shhs1-<id>.edf
//!   edfs/shhs2/shhs2-<id>.edf
//! ```
//!
//! A session exists for a cohort when both its annotation file and its
//! recording are present.  [`Patients`] opens files only when the next
//! patient is pulled, and every EDF handle is closed before the patient is
//! handed out, so stopping early never leaves files open.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, error, warn};

use crate::annotation::read_sleep_stages;
use crate::discover::matching_files;
use crate::edf::EdfReader;
use crate::session::{Channel, Cohort, Patient, Session, SignalData};

/// EDF signal indices of the two EEG channels in SHHS recordings
/// (`EEG(sec)` and `EEG`).
pub const EEG_SIGNALS: [usize; 2] = [2, 7];

pub const ANNOTATION_SUFFIX: &str = "-profusion.xml";
pub const RECORDING_SUFFIX: &str = ".edf";

/// Directory layout of an SHHS download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShhsLayout {
    pub root: PathBuf,
}

impl ShhsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn annotations_dir(&self, cohort: Cohort) -> PathBuf {
        self.root
            .join("polysomnography")
            .join("annotations-events-profusion")
            .join(cohort.dir_name())
    }

    pub fn recordings_dir(&self, cohort: Cohort) -> PathBuf {
        self.root.join("polysomnography").join("edfs").join(cohort.dir_name())
    }

    /// File-name prefix of `cohort` (`shhs1-`).
    pub fn prefix(cohort: Cohort) -> String {
        format!("{}-", cohort.dir_name())
    }
}

/// Discovered annotation and recording files, per cohort, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct DatasetIndex {
    annotations: [BTreeMap<String, PathBuf>; 2],
    recordings:  [BTreeMap<String, PathBuf>; 2],
}

impl DatasetIndex {
    /// List the dataset directories.  Missing directories count as empty.
    pub fn scan(layout: &ShhsLayout) -> Result<Self> {
        let mut index = Self::default();
        for cohort in Cohort::ALL {
            let prefix = ShhsLayout::prefix(cohort);
            let c = cohort.index();
            index.annotations[c] =
                matching_files(&layout.annotations_dir(cohort), &prefix, ANNOTATION_SUFFIX)?;
            index.recordings[c] =
                matching_files(&layout.recordings_dir(cohort), &prefix, RECORDING_SUFFIX)?;
            debug!(
                %cohort,
                annotations = index.annotations[c].len(),
                recordings = index.recordings[c].len(),
                "scanned cohort"
            );
        }
        Ok(index)
    }

    /// Annotation and recording of `id` in `cohort`, if both exist.
    pub fn session_files(&self, id: &str, cohort: Cohort) -> Option<(&Path, &Path)> {
        let c = cohort.index();
        let labels = self.annotations[c].get(id)?;
        let recording = self.recordings[c].get(id)?;
        Some((labels.as_path(), recording.as_path()))
    }

    /// Ids with a session in at least one cohort, sorted.
    ///
    /// A non-empty `allowlist` restricts the result to those ids.
    pub fn patient_ids(&self, allowlist: &[String]) -> Vec<String> {
        let all: BTreeSet<&String> = self.annotations.iter().flat_map(BTreeMap::keys).collect();
        let ids: Vec<String> = all
            .into_iter()
            .filter(|id| Cohort::ALL.iter().any(|&c| self.session_files(id, c).is_some()))
            .cloned()
            .collect();
        if allowlist.is_empty() {
            return ids;
        }
        for wanted in allowlist {
            if !ids.contains(wanted) {
                warn!(patient = %wanted, "requested patient has no session, skipping");
            }
        }
        ids.into_iter().filter(|id| allowlist.contains(id)).collect()
    }

    /// Lazy patient loader over `ids`.
    pub fn patients(&self, ids: Vec<String>) -> Patients<'_> {
        Patients { index: self, ids: ids.into_iter(), skipped: 0 }
    }
}

/// Iterator that loads one [`Patient`] per step.
///
/// A session whose files cannot be read is logged and left out; the patient
/// is still produced with its remaining sessions.
#[derive(Debug)]
pub struct Patients<'a> {
    index:    &'a DatasetIndex,
    ids:      std::vec::IntoIter<String>,
    skipped:  usize,
}

impl Patients<'_> {
    /// Sessions dropped so far because their files could not be read.
    pub fn skipped_sessions(&self) -> usize {
        self.skipped
    }

    fn load(&mut self, id: String) -> Patient {
        let index = self.index;
        let mut in_cohort = [false; 2];
        let mut sessions = Vec::new();
        for cohort in Cohort::ALL {
            let Some((labels, recording)) = index.session_files(&id, cohort) else {
                continue;
            };
            in_cohort[cohort.index()] = true;
            match load_session(&id, cohort, labels, recording, EEG_SIGNALS) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    error!(patient = %id, %cohort, "skipping session: {e:#}");
                    self.skipped += 1;
                }
            }
        }
        Patient { id, in_cohort, sessions }
    }
}

impl Iterator for Patients<'_> {
    type Item = Patient;

    fn next(&mut self) -> Option<Patient> {
        let id = self.ids.next()?;
        Some(self.load(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

/// Load labels and both EEG channels of one session.
pub fn load_session(
    id: &str,
    cohort: Cohort,
    labels: &Path,
    recording: &Path,
    channels: [usize; 2],
) -> Result<Session> {
    let labels = read_sleep_stages(labels)?;
    let signal = read_signal_data(recording, channels)?;
    let session = Session::new(id, cohort, labels).with_signal(signal);
    debug!(
        patient = id,
        %cohort,
        n_samples = session.n_samples(),
        n_labels = session.n_labels(),
        epoch_secs = session.epoch_secs(),
        "loaded session"
    );
    Ok(session)
}

/// Read two signals of an EDF file into channel slots.
///
/// A signal index past the end of the file leaves its slot empty.  The file
/// is closed before returning.
pub fn read_signal_data(path: &Path, signals: [usize; 2]) -> Result<SignalData> {
    let mut edf = EdfReader::open(path)?;
    let mut data = SignalData::default();
    for (slot, &idx) in signals.iter().enumerate() {
        if idx >= edf.header.n_signals() {
            warn!(
                "{}: has {} signals, channel {} (signal {idx}) absent",
                path.display(),
                edf.header.n_signals(),
                slot + 1
            );
            continue;
        }
        let samples = edf.read_signal(idx)?;
        let name = edf.signal(idx)?.label.clone();
        data.channels[slot] = Some(Channel::new(name, edf.sample_frequency(idx)?, samples));
    }
    Ok(data)
}
