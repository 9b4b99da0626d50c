/*!
 * Error types for the hash recovery engine
 *
 * Every failure a search can hit is represented here. Search entry points
 * never return these directly: they fold them into a `SearchOutcome` via
 * `CrackError::kind()`. Only persistence, benchmarking and config loading
 * hand a `CrackError` back to the caller.
 */

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algorithm::Algorithm;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum CrackError {
    #[error("wordlist unavailable: {}: {}", .path.display(), .source)]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not identify hash algorithm for {digest:?}")]
    AlgorithmUnidentified { digest: String },

    #[error("{algorithm} is not supported by this build")]
    UnsupportedAlgorithm { algorithm: Algorithm },

    #[error("no candidate reproduced the target digest")]
    NotFound,

    #[error("failed to persist result to {}: {}", .path.display(), .source)]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("search stopped by caller")]
    Cancelled,

    #[error("invalid config {}: {}", .path.display(), .message)]
    Config { path: PathBuf, message: String },
}

impl CrackError {
    /// Serializable discriminant stored in outcomes and reports
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrackError::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            CrackError::AlgorithmUnidentified { .. } => ErrorKind::AlgorithmUnidentified,
            CrackError::UnsupportedAlgorithm { .. } => ErrorKind::UnsupportedAlgorithm,
            CrackError::NotFound => ErrorKind::NotFound,
            CrackError::PersistenceFailure { .. } => ErrorKind::PersistenceFailure,
            CrackError::Cancelled => ErrorKind::Cancelled,
            CrackError::Config { .. } => ErrorKind::Config,
        }
    }
}

/// Error category carried by a `SearchOutcome`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ResourceUnavailable,
    AlgorithmUnidentified,
    UnsupportedAlgorithm,
    NotFound,
    PersistenceFailure,
    Cancelled,
    Config,
}

pub type Result<T> = std::result::Result<T, CrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = CrackError::ResourceUnavailable {
            path: PathBuf::from("missing.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
        assert!(err.to_string().contains("missing.txt"));

        assert_eq!(CrackError::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            CrackError::UnsupportedAlgorithm {
                algorithm: Algorithm::Bcrypt
            }
            .to_string(),
            "BCRYPT is not supported by this build"
        );
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::AlgorithmUnidentified).unwrap();
        assert_eq!(json, "\"algorithm_unidentified\"");
    }
}
