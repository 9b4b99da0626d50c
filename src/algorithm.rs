/*!
 * Hash algorithm identification
 *
 * Infers the algorithm from the literal form of a target digest:
 * - bcrypt strings are recognized by their version prefix
 * - hex digests are classified by length (32/40/64/128)
 */

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CrackError, Result};

/// Version tags that open a modular-crypt bcrypt string
const BCRYPT_PREFIXES: [&str; 5] = ["$2a$", "$2b$", "$2x$", "$2y$", "$2$"];

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Bcrypt,
    Unknown,
}

impl Algorithm {
    /// Every concrete algorithm, in benchmark display order
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha512,
        Algorithm::Bcrypt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha512 => "SHA512",
            Algorithm::Bcrypt => "BCRYPT",
            Algorithm::Unknown => "UNKNOWN",
        }
    }

    /// Length of the lowercase hex digest, `None` for non-hex schemes
    pub fn hex_len(self) -> Option<usize> {
        match self {
            Algorithm::Md5 => Some(32),
            Algorithm::Sha1 => Some(40),
            Algorithm::Sha256 => Some(64),
            Algorithm::Sha512 => Some(128),
            Algorithm::Bcrypt | Algorithm::Unknown => None,
        }
    }

    /// Slow, self-salting verification (batch size shrinks to keep cancellation prompt)
    #[inline]
    pub fn is_expensive(self) -> bool {
        matches!(self, Algorithm::Bcrypt)
    }

    /// Whether this build can verify candidates for the algorithm
    pub fn is_supported(self) -> bool {
        match self {
            Algorithm::Bcrypt => cfg!(feature = "bcrypt"),
            Algorithm::Unknown => false,
            _ => true,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha1" | "sha-1" => Ok(Algorithm::Sha1),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            "sha512" | "sha-512" => Ok(Algorithm::Sha512),
            "bcrypt" => Ok(Algorithm::Bcrypt),
            other => Err(format!(
                "unknown algorithm '{}' (expected md5, sha1, sha256, sha512 or bcrypt)",
                other
            )),
        }
    }
}

/// Whether the digest carries a recognized bcrypt version prefix
pub fn is_bcrypt(digest: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|p| digest.starts_with(p))
}

/// Detect the algorithm from the literal form of a digest
pub fn detect(digest: &str) -> Algorithm {
    let digest = digest.trim();

    if is_bcrypt(digest) {
        return Algorithm::Bcrypt;
    }

    if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Algorithm::Unknown;
    }

    match digest.len() {
        32 => Algorithm::Md5,
        40 => Algorithm::Sha1,
        64 => Algorithm::Sha256,
        128 => Algorithm::Sha512,
        _ => Algorithm::Unknown,
    }
}

/// Trim the digest and lower-case it unless it is a bcrypt string
pub fn normalize(digest: &str) -> String {
    let digest = digest.trim();
    if is_bcrypt(digest) {
        digest.to_string()
    } else {
        digest.to_ascii_lowercase()
    }
}

/// Settle the algorithm for one invocation
///
/// An explicit, concrete algorithm wins over detection. Fails before any
/// worker is started when nothing usable is found or the build lacks the
/// capability.
pub fn resolve(explicit: Option<Algorithm>, digest: &str) -> Result<Algorithm> {
    let algorithm = match explicit {
        Some(algo) if algo != Algorithm::Unknown => {
            let detected = detect(digest);
            if detected != Algorithm::Unknown && detected != algo {
                warn!(
                    "Digest looks like {} but {} was requested; continuing with {}",
                    detected, algo, algo
                );
            }
            algo
        }
        _ => detect(digest),
    };

    if algorithm == Algorithm::Unknown {
        return Err(CrackError::AlgorithmUnidentified {
            digest: digest.trim().to_string(),
        });
    }

    if !algorithm.is_supported() {
        return Err(CrackError::UnsupportedAlgorithm { algorithm });
    }

    debug!("Resolved algorithm: {}", algorithm);
    Ok(algorithm)
}
