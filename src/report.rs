/*!
 * Durable result records
 *
 * Each finished search can be written as a pretty-printed JSON audit record
 * under a caller-chosen directory. A write failure is reported to the caller
 * and never changes the outcome it describes.
 */

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::bruteforce::{SearchOutcome, SearchStats};
use crate::crypto::Placement;
use crate::error::{CrackError, ErrorKind, Result};

const REPORT_TYPE: &str = "Hash recovery - security audit";
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Serialize)]
struct Report<'a> {
    report_type: &'static str,
    generated_by: String,
    executed_at: String,
    timestamp_unix: f64,
    status: &'static str,
    details: ReportDetails<'a>,
    stats: SearchStats,
}

#[derive(Debug, Serialize)]
struct ReportDetails<'a> {
    target_hash: &'a str,
    algorithm: String,
    salt: Option<&'a str>,
    placement: Option<Placement>,
    recovered_secret: &'a str,
    error: Option<ErrorKind>,
}

impl<'a> Report<'a> {
    fn new(outcome: &'a SearchOutcome) -> Self {
        let now = Local::now();
        Self {
            report_type: REPORT_TYPE,
            generated_by: format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            executed_at: now.format("%d/%m/%Y %H:%M:%S").to_string(),
            timestamp_unix: now.timestamp_millis() as f64 / 1000.0,
            status: if outcome.success { "SUCCESS" } else { "FAILURE" },
            details: ReportDetails {
                target_hash: &outcome.target,
                algorithm: outcome.algorithm.to_string(),
                salt: outcome.salt.as_deref(),
                placement: outcome.placement,
                recovered_secret: outcome
                    .recovered_secret
                    .as_deref()
                    .filter(|_| outcome.success)
                    .unwrap_or(NOT_AVAILABLE),
                error: outcome.error,
            },
            stats: outcome.stats,
        }
    }
}

/// Open a fresh `crack_<timestamp>[_n].json` file without clobbering older records
fn create_unique(dir: &Path, stamp: &str) -> io::Result<(PathBuf, fs::File)> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("crack_{}.json", stamp)
        } else {
            format!("crack_{}_{}.json", stamp, attempt)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Write the outcome as a JSON record under `dir`, creating it if needed
pub fn persist_outcome(outcome: &SearchOutcome, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let failure = |path: &Path, source: io::Error| CrackError::PersistenceFailure {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(|e| failure(dir, e))?;

    let report = Report::new(outcome);
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| failure(dir, io::Error::new(io::ErrorKind::InvalidData, e)))?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let (path, mut file) = create_unique(dir, &stamp).map_err(|e| failure(dir, e))?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| failure(path.as_path(), e))?;

    info!("Result saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Algorithm;

    fn outcome(success: bool) -> SearchOutcome {
        SearchOutcome {
            success,
            recovered_secret: success.then(|| "password123".to_string()),
            target: "482c811da5d5b4bc6d497ffa98491e38".to_string(),
            algorithm: Algorithm::Md5,
            salt: None,
            placement: None,
            error: (!success).then_some(ErrorKind::NotFound),
            message: None,
            stats: SearchStats {
                attempts: 3,
                duration_secs: 0.5,
                rate: 6.0,
            },
        }
    }

    #[test]
    fn test_persist_creates_directory_and_record() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");

        let path = persist_outcome(&outcome(true), &dir).unwrap();
        assert!(path.starts_with(&dir));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["status"], "SUCCESS");
        assert_eq!(value["details"]["algorithm"], "MD5");
        assert_eq!(value["details"]["recovered_secret"], "password123");
        assert_eq!(value["stats"]["attempts"], 3);
    }

    #[test]
    fn test_failure_record_uses_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let path = persist_outcome(&outcome(false), tmp.path()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["status"], "FAILURE");
        assert_eq!(value["details"]["recovered_secret"], "N/A");
        assert_eq!(value["details"]["error"], "not_found");
    }

    #[test]
    fn test_names_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let first = persist_outcome(&outcome(true), tmp.path()).unwrap();
        let second = persist_outcome(&outcome(true), tmp.path()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_unwritable_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let err = persist_outcome(&outcome(true), blocker.join("logs")).unwrap_err();
        assert!(matches!(err, CrackError::PersistenceFailure { .. }));
    }
}
