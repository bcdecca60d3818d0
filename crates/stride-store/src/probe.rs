//! Storage capability probe.
//!
//! Before the first connection is made the store checks that the database
//! directory can be created and written to, and which journal mode SQLite
//! settles on. A failed probe means the caller should run without
//! persistence.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

/// Journal modes under which committed data survives a process exit.
const DURABLE_JOURNAL_MODES: &[&str] = &["wal", "delete", "truncate", "persist"];

/// Result of probing a database location.
#[derive(Debug, Clone, Serialize)]
pub struct StorageProbe {
    /// Database file that was probed.
    pub path: PathBuf,
    /// Whether the parent directory exists (or was created) and accepts writes.
    pub directory_writable: bool,
    /// Journal mode reported by SQLite, if a connection could be made.
    pub journal_mode: Option<String>,
    /// Version of the linked SQLite library.
    pub sqlite_version: &'static str,
    /// First problem encountered, if any.
    pub problem: Option<String>,
}

impl StorageProbe {
    /// True when the location can hold durable data.
    pub fn is_available(&self) -> bool {
        self.problem.is_none()
    }

    /// True when the journal mode keeps committed data on disk.
    pub fn is_durable(&self) -> bool {
        self.journal_mode
            .as_deref()
            .is_some_and(|mode| DURABLE_JOURNAL_MODES.contains(&mode))
    }
}

/// Probe `path` for use as a database file.
///
/// Creates missing parent directories and the database file itself. Never
/// fails; problems are reported in [`StorageProbe::problem`].
pub fn probe(path: &Path) -> StorageProbe {
    let mut report = StorageProbe {
        path: path.to_path_buf(),
        directory_writable: false,
        journal_mode: None,
        sqlite_version: rusqlite::version(),
        problem: None,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if let Err(e) = check_directory(&dir) {
        report.problem = Some(format!("{}: {}", dir.display(), e));
        return report;
    }
    report.directory_writable = true;

    match journal_mode(path) {
        Ok(mode) => {
            if !DURABLE_JOURNAL_MODES.contains(&mode.as_str()) {
                report.problem = Some(format!("journal mode '{}' does not persist data", mode));
            }
            report.journal_mode = Some(mode);
        }
        Err(e) => report.problem = Some(format!("cannot open {}: {}", path.display(), e)),
    }

    debug!(
        "Probed {}: available={}, journal={:?}",
        path.display(),
        report.is_available(),
        report.journal_mode
    );
    report
}

fn check_directory(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let marker = dir.join(format!(".stride-probe-{}", std::process::id()));
    fs::write(&marker, b"probe")?;
    fs::remove_file(&marker)
}

fn journal_mode(path: &Path) -> rusqlite::Result<String> {
    let conn = Connection::open(path)?;
    conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("steps.db");

        let report = probe(&path);

        assert!(report.is_available(), "{:?}", report.problem);
        assert!(report.directory_writable);
        assert!(report.is_durable());
        assert_eq!(report.journal_mode.as_deref(), Some("wal"));
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_probe_leaves_no_marker_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.db");

        probe(&path);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".stride-probe"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_probe_reports_unusable_directory() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let report = probe(&blocker.join("steps.db"));

        assert!(!report.is_available());
        assert!(!report.directory_writable);
        assert!(report.journal_mode.is_none());
    }
}
