/*!
 * Candidate verification against a target digest
 *
 * Implements the matching side of the search:
 * - MD5 / SHA1 / SHA256 / SHA512 digests over `salt + candidate`,
 *   `candidate + salt` or the bare candidate
 * - bcrypt verification through the scheme's own one-way check
 *
 * The verification strategy is resolved once when the matcher is built;
 * the hot path is a single function-pointer call plus a byte comparison.
 */

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tracing::warn;

use crate::algorithm::Algorithm;

/// Where the salt goes relative to the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Prefix,
    Suffix,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Prefix => f.write_str("prefix"),
            Placement::Suffix => f.write_str("suffix"),
        }
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefix" => Ok(Placement::Prefix),
            "suffix" => Ok(Placement::Suffix),
            other => Err(format!(
                "unknown placement '{}' (expected prefix or suffix)",
                other
            )),
        }
    }
}

/// Salt orders tried when the caller gave a salt but no placement
const BOTH_ORDERS: [Placement; 2] = [Placement::Suffix, Placement::Prefix];

type VerifyFn = fn(parts: &[&[u8]], expected: &[u8]) -> bool;

#[inline(always)]
fn digest_eq<D: Digest>(parts: &[&[u8]], expected: &[u8]) -> bool {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().as_slice() == expected
}

fn verify_fn(algorithm: Algorithm) -> Option<VerifyFn> {
    match algorithm {
        Algorithm::Md5 => Some(digest_eq::<Md5>),
        Algorithm::Sha1 => Some(digest_eq::<Sha1>),
        Algorithm::Sha256 => Some(digest_eq::<Sha256>),
        Algorithm::Sha512 => Some(digest_eq::<Sha512>),
        Algorithm::Bcrypt | Algorithm::Unknown => None,
    }
}

/// Lowercase hex digest of `data`, `None` for non-digest schemes
pub fn hash_hex(algorithm: Algorithm, data: &[u8]) -> Option<String> {
    let digest = match algorithm {
        Algorithm::Md5 => Md5::digest(data).to_vec(),
        Algorithm::Sha1 => Sha1::digest(data).to_vec(),
        Algorithm::Sha256 => Sha256::digest(data).to_vec(),
        Algorithm::Sha512 => Sha512::digest(data).to_vec(),
        Algorithm::Bcrypt | Algorithm::Unknown => return None,
    };
    Some(hex::encode(digest))
}

enum Strategy {
    Digest { verify: VerifyFn, expected: Vec<u8> },
    Bcrypt { hash: String },
    /// Target can never be reproduced (bad hex, capability missing)
    Never,
}

/// Decides whether a candidate reproduces the target digest
///
/// Immutable after construction, so a single instance is shared by every
/// worker without synchronization.
pub struct HashMatcher {
    algorithm: Algorithm,
    strategy: Strategy,
    salt: Option<Vec<u8>>,
    orders: &'static [Placement],
}

impl HashMatcher {
    /// Build a matcher for a normalized target digest
    pub fn new(
        target: &str,
        algorithm: Algorithm,
        salt: Option<&str>,
        placement: Option<Placement>,
    ) -> Self {
        let strategy = match (algorithm, verify_fn(algorithm)) {
            (_, Some(verify)) => match hex::decode(target) {
                Ok(expected) => Strategy::Digest { verify, expected },
                Err(e) => {
                    warn!("Target digest is not valid hex ({}); nothing can match", e);
                    Strategy::Never
                }
            },
            (Algorithm::Bcrypt, None) if algorithm.is_supported() => Strategy::Bcrypt {
                hash: target.to_string(),
            },
            _ => Strategy::Never,
        };

        // bcrypt embeds its own salt
        let salt = salt
            .filter(|s| !s.is_empty() && algorithm != Algorithm::Bcrypt)
            .map(|s| s.as_bytes().to_vec());

        let orders: &'static [Placement] = match placement {
            Some(Placement::Prefix) => &[Placement::Prefix],
            Some(Placement::Suffix) => &[Placement::Suffix],
            None => &BOTH_ORDERS,
        };

        Self {
            algorithm,
            strategy,
            salt,
            orders,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Test one candidate
    #[inline]
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.strategy {
            Strategy::Digest { verify, expected } => {
                let candidate = candidate.as_bytes();
                match self.salt.as_deref() {
                    None => verify(&[candidate], expected),
                    Some(salt) => self.orders.iter().any(|order| match order {
                        Placement::Prefix => verify(&[salt, candidate], expected),
                        Placement::Suffix => verify(&[candidate, salt], expected),
                    }),
                }
            }
            Strategy::Bcrypt { hash } => verify_bcrypt(candidate, hash),
            Strategy::Never => false,
        }
    }
}

#[cfg(feature = "bcrypt")]
#[inline]
fn verify_bcrypt(candidate: &str, hash: &str) -> bool {
    bcrypt::verify(candidate, hash).unwrap_or(false)
}

#[cfg(not(feature = "bcrypt"))]
#[inline]
fn verify_bcrypt(_candidate: &str, _hash: &str) -> bool {
    false
}

/// One-shot form of `HashMatcher::matches`
pub fn matches(
    target: &str,
    candidate: &str,
    algorithm: Algorithm,
    salt: Option<&str>,
    placement: Option<Placement>,
) -> bool {
    let target = crate::algorithm::normalize(target);
    HashMatcher::new(&target, algorithm, salt, placement).matches(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex_known_vectors() {
        assert_eq!(
            hash_hex(Algorithm::Md5, b"password").unwrap(),
            "5f4dcc3b5aa765d61d8327deb882cf99"
        );
        assert_eq!(
            hash_hex(Algorithm::Sha1, b"abc").unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hash_hex(Algorithm::Sha256, b"abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_hex(Algorithm::Sha512, b"abc").unwrap().len(), 128);
        assert!(hash_hex(Algorithm::Bcrypt, b"abc").is_none());
    }

    #[test]
    fn test_matches_unsalted() {
        let target = hash_hex(Algorithm::Md5, b"password123").unwrap();
        let matcher = HashMatcher::new(&target, Algorithm::Md5, None, None);
        assert!(matcher.matches("password123"));
        assert!(!matcher.matches("password124"));
    }

    #[test]
    fn test_matches_prefix_and_suffix() {
        let target = hash_hex(Algorithm::Sha256, b"saltvalueab12").unwrap();

        let prefix = HashMatcher::new(&target, Algorithm::Sha256, Some("saltvalue"), Some(Placement::Prefix));
        assert!(prefix.matches("ab12"));

        let suffix = HashMatcher::new(&target, Algorithm::Sha256, Some("saltvalue"), Some(Placement::Suffix));
        assert!(!suffix.matches("ab12"));

        // no placement tries both orders
        let auto = HashMatcher::new(&target, Algorithm::Sha256, Some("saltvalue"), None);
        assert!(auto.matches("ab12"));
    }

    #[test]
    fn test_empty_salt_is_no_salt() {
        let target = hash_hex(Algorithm::Sha1, b"admin").unwrap();
        let matcher = HashMatcher::new(&target, Algorithm::Sha1, Some(""), Some(Placement::Prefix));
        assert!(matcher.matches("admin"));
    }

    #[test]
    fn test_uppercase_target_via_one_shot() {
        let target = hash_hex(Algorithm::Sha512, b"hello").unwrap().to_uppercase();
        assert!(matches(&target, "hello", Algorithm::Sha512, None, None));
    }

    #[test]
    fn test_invalid_hex_never_matches() {
        let matcher = HashMatcher::new("zz", Algorithm::Md5, None, None);
        assert!(!matcher.matches(""));
    }

    #[cfg(feature = "bcrypt")]
    #[test]
    fn test_bcrypt_ignores_salt() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        let matcher = HashMatcher::new(&hash, Algorithm::Bcrypt, Some("pepper"), Some(Placement::Prefix));
        assert!(matcher.matches("hunter2"));
        assert!(!matcher.matches("hunter3"));
    }

    #[cfg(feature = "bcrypt")]
    #[test]
    fn test_malformed_bcrypt_fails_closed() {
        let matcher = HashMatcher::new("$2b$garbage", Algorithm::Bcrypt, None, None);
        assert!(!matcher.matches("anything"));
    }

    #[test]
    fn test_placement_parse() {
        assert_eq!("Prefix".parse::<Placement>().unwrap(), Placement::Prefix);
        assert!("middle".parse::<Placement>().is_err());
    }
}
