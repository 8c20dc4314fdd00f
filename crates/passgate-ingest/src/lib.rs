//! Import JUnit XML test reports as passgate test records.
//!
//! A run is a directory tree of report files (one per test shard, usually).
//! Every `*.xml` below it is read, in path order, and flattened into one list.

mod junit;

pub use junit::{parse_junit_str, JunitOptions, ParseError};

use passgate_types::TestRecord;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("report directory {} does not exist or is not a directory", dir.display())]
    NotADirectory { dir: PathBuf },

    #[error("no JUnit reports (*.xml) found under {}", dir.display())]
    NoReports { dir: PathBuf },

    #[error("invalid report search pattern for {}", dir.display())]
    Pattern {
        dir: PathBuf,
        #[source]
        source: glob::PatternError,
    },

    #[error(transparent)]
    Walk(#[from] glob::GlobError),

    #[error("read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// All `*.xml` files under `dir`, recursively, sorted by path.
pub fn find_reports(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !dir.is_dir() {
        return Err(IngestError::NotADirectory {
            dir: dir.to_path_buf(),
        });
    }

    let pattern = format!(
        "{}/**/*.xml",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern).map_err(|source| IngestError::Pattern {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut reports = Vec::new();
    for entry in paths {
        let path = entry?;
        if path.is_file() {
            reports.push(path);
        }
    }
    reports.sort();
    Ok(reports)
}

pub fn read_report_file(path: &Path, opts: &JunitOptions) -> Result<Vec<TestRecord>, IngestError> {
    let xml = fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_junit_str(&xml, opts).map_err(|source| IngestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read every report under `dir` into a single run.
///
/// A directory with no reports is an error: an empty run almost always means
/// the artifacts were not downloaded, not that zero tests exist.
pub fn read_report_dir(dir: &Path, opts: &JunitOptions) -> Result<Vec<TestRecord>, IngestError> {
    let reports = find_reports(dir)?;
    if reports.is_empty() {
        return Err(IngestError::NoReports {
            dir: dir.to_path_buf(),
        });
    }

    let mut records = Vec::new();
    for path in &reports {
        records.extend(read_report_file(path, opts)?);
    }
    Ok(records)
}
