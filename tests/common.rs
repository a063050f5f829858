/// Shared helpers: synthetic EDF recordings, Profusion annotations and SHHS
/// directory trees written into a temp dir.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use shhs_prep::{Cohort, ShhsLayout};
use tempfile::TempDir;

/// One signal of a synthetic EDF file.
#[allow(unused)]
pub struct TestSignal {
    pub label:    String,
    pub spr:      usize,
    pub samples:  Vec<i16>,
    pub physical: (f64, f64),
    pub digital:  (i32, i32),
}

#[allow(unused)]
impl TestSignal {
    /// Signal whose physical values equal its digital values.
    pub fn identity(label: &str, spr: usize, samples: Vec<i16>) -> Self {
        Self {
            label: label.to_string(),
            spr,
            samples,
            physical: (-32768.0, 32767.0),
            digital: (-32768, 32767),
        }
    }
}

fn field(out: &mut Vec<u8>, value: &str, width: usize) {
    let mut bytes: Vec<u8> = value.bytes().take(width).collect();
    bytes.resize(width, b' ');
    out.extend(bytes);
}

/// Write an EDF file.  All signals must cover the same number of records.
#[allow(unused)]
pub fn write_edf(path: &Path, record_secs: f64, signals: &[TestSignal], declared_records: Option<i64>) {
    let n_records = signals.first().map_or(0, |s| s.samples.len() / s.spr);
    for s in signals {
        assert_eq!(s.samples.len(), s.spr * n_records, "signal {} length", s.label);
    }
    let ns = signals.len();

    let mut out = Vec::new();
    field(&mut out, "0", 8);
    field(&mut out, "X X X X", 80);
    field(&mut out, "Startdate 01-JAN-2001 X X X", 80);
    field(&mut out, "01.01.01", 8);
    field(&mut out, "22.00.00", 8);
    field(&mut out, &(256 + 256 * ns).to_string(), 8);
    field(&mut out, "", 44);
    field(&mut out, &declared_records.unwrap_or(n_records as i64).to_string(), 8);
    field(&mut out, &record_secs.to_string(), 8);
    field(&mut out, &ns.to_string(), 4);

    for s in signals { field(&mut out, &s.label, 16); }
    for _ in signals { field(&mut out, "", 80); }
    for _ in signals { field(&mut out, "uV", 8); }
    for s in signals { field(&mut out, &s.physical.0.to_string(), 8); }
    for s in signals { field(&mut out, &s.physical.1.to_string(), 8); }
    for s in signals { field(&mut out, &s.digital.0.to_string(), 8); }
    for s in signals { field(&mut out, &s.digital.1.to_string(), 8); }
    for _ in signals { field(&mut out, "", 80); }
    for s in signals { field(&mut out, &s.spr.to_string(), 8); }
    for _ in signals { field(&mut out, "", 32); }

    for r in 0..n_records {
        for s in signals {
            for v in &s.samples[r * s.spr..(r + 1) * s.spr] {
                out.extend(v.to_le_bytes());
            }
        }
    }

    let mut f = fs::File::create(path).unwrap();
    f.write_all(&out).unwrap();
}

/// Value of EEG channel 1 at sample `i` in [`write_shhs_edf`] recordings.
#[allow(unused)]
pub fn eeg1_value(i: usize) -> f64 {
    (i % 20_000) as f64
}

/// Value of EEG channel 2 at sample `i` in [`write_shhs_edf`] recordings.
#[allow(unused)]
pub fn eeg2_value(i: usize) -> f64 {
    -((i % 20_000) as f64)
}

/// SHHS-shaped recording: `n_signals` signals, EEG at indices 2 and 7
/// (when present), `spr` EEG samples per 1 s record.
#[allow(unused)]
pub fn write_shhs_edf(path: &Path, n_records: usize, spr: usize, n_signals: usize) {
    let n = n_records * spr;
    let signals: Vec<TestSignal> = (0..n_signals)
        .map(|idx| match idx {
            2 => TestSignal::identity("EEG(sec)", spr, (0..n).map(|i| eeg1_value(i) as i16).collect()),
            7 => TestSignal::identity("EEG", spr, (0..n).map(|i| eeg2_value(i) as i16).collect()),
            _ => TestSignal::identity(&format!("AUX{idx}"), 1, vec![idx as i16; n_records]),
        })
        .collect();
    write_edf(path, 1.0, &signals, None);
}

/// Profusion annotation with the given sleep stages.
#[allow(unused)]
pub fn write_profusion(path: &Path, stages: &[&str]) {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n<CMPStudyConfig>\n  <EpochLength>30</EpochLength>\n  <SleepStages>\n",
    );
    for s in stages {
        xml.push_str(&format!("    <SleepStage>{s}</SleepStage>\n"));
    }
    xml.push_str("  </SleepStages>\n</CMPStudyConfig>\n");
    fs::write(path, xml).unwrap();
}

/// Temporary SHHS directory tree.
#[allow(unused)]
pub struct ShhsFixture {
    pub dir:    TempDir,
    pub layout: ShhsLayout,
}

#[allow(unused)]
impl ShhsFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = ShhsLayout::new(dir.path());
        for cohort in Cohort::ALL {
            fs::create_dir_all(layout.annotations_dir(cohort)).unwrap();
            fs::create_dir_all(layout.recordings_dir(cohort)).unwrap();
        }
        Self { dir, layout }
    }

    pub fn annotation_path(&self, cohort: Cohort, id: &str) -> PathBuf {
        self.layout
            .annotations_dir(cohort)
            .join(format!("{}-{id}-profusion.xml", cohort.dir_name()))
    }

    pub fn recording_path(&self, cohort: Cohort, id: &str) -> PathBuf {
        self.layout
            .recordings_dir(cohort)
            .join(format!("{}-{id}.edf", cohort.dir_name()))
    }

    pub fn add_annotation(&self, cohort: Cohort, id: &str, stages: &[&str]) {
        write_profusion(&self.annotation_path(cohort, id), stages);
    }

    pub fn add_recording(&self, cohort: Cohort, id: &str, n_records: usize, spr: usize) {
        write_shhs_edf(&self.recording_path(cohort, id), n_records, spr, 8);
    }

    /// Annotation + 8-signal recording of `n_records` one-second records.
    pub fn add_session(&self, cohort: Cohort, id: &str, n_records: usize, spr: usize, stages: &[&str]) {
        self.add_annotation(cohort, id, stages);
        self.add_recording(cohort, id, n_records, spr);
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.path().join("results.csv")
    }
}

/// Parse a CSV written by the exporter into (header, records).
#[allow(unused)]
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let text = fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap().split(',').map(String::from).collect();
    let records = lines.map(|l| l.split(',').map(String::from).collect()).collect();
    (header, records)
}
