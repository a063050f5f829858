//! File discovery by naming convention.
//!
//! SHHS names every file `<prefix><id><suffix>`, e.g.
//! `shhs1-200001-profusion.xml` or `shhs2-200077.edf`.  The stripped `id` is
//! the join key between annotation and recording files and across cohorts.
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

/// Normalised id of `name`, or `None` if it does not follow the convention.
///
/// ```
/// use shhs_prep::discover::strip_id;
///
/// assert_eq!(strip_id("shhs1-200001.edf", "shhs1-", ".edf"), Some("200001"));
/// assert_eq!(strip_id("shhs1-200001.xml", "shhs1-", ".edf"), None);
/// ```
pub fn strip_id<'a>(name: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?
        .strip_suffix(suffix)
        .filter(|id| !id.is_empty())
}

/// Files in `dir` named `<prefix><id><suffix>`, keyed by `id`.
///
/// A missing directory is not an error: the cohort simply has no files.
pub fn matching_files(dir: &Path, prefix: &str, suffix: &str) -> Result<BTreeMap<String, PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("{} does not exist, no {prefix}*{suffix} files", dir.display());
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(e).with_context(|| format!("list {}", dir.display())),
    };

    let mut out = BTreeMap::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list {}", dir.display()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(id) = strip_id(name, prefix, suffix) {
            out.insert(id.to_string(), entry.path());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_both_ends_only() {
        assert_eq!(strip_id("shhs2-200077-profusion.xml", "shhs2-", "-profusion.xml"), Some("200077"));
        assert_eq!(strip_id("shhs2--profusion.xml", "shhs2-", "-profusion.xml"), None);
        assert_eq!(strip_id("xshhs2-1.edf", "shhs2-", ".edf"), None);
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = matching_files(&dir.path().join("nope"), "shhs1-", ".edf").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn only_matching_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["shhs1-200001.edf", "shhs1-200002.edf", "shhs1-200003.xml", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("shhs1-200009.edf")).unwrap();

        let files = matching_files(dir.path(), "shhs1-", ".edf").unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["200001", "200002"]);
        assert_eq!(files["200002"], dir.path().join("shhs1-200002.edf"));
    }
}
