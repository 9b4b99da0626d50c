/*!
 * Raw verification throughput probe
 *
 * Hashes a constant input in a tight loop for a fixed wall-clock duration.
 * Independent of any target digest or search state.
 */

use std::hint::black_box;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::algorithm::Algorithm;
use crate::crypto::hash_hex;
use crate::error::{CrackError, Result};
use crate::progress::rate;

const BENCHMARK_INPUT: &[u8] = b"benchmark";

/// Single-threaded hashes per second for `algorithm` over `duration`
pub fn benchmark(algorithm: Algorithm, duration: Duration) -> Result<f64> {
    if algorithm == Algorithm::Unknown {
        return Err(CrackError::AlgorithmUnidentified {
            digest: String::new(),
        });
    }
    if !algorithm.is_supported() {
        return Err(CrackError::UnsupportedAlgorithm { algorithm });
    }

    let start = Instant::now();
    let mut count: u64 = 0;

    while start.elapsed() < duration {
        run_once(algorithm);
        count += 1;
    }

    let elapsed = start.elapsed();
    let per_second = rate(count, elapsed);
    debug!(
        "{} benchmark: {} hashes in {:.2}s ({:.0} H/s)",
        algorithm,
        count,
        elapsed.as_secs_f64(),
        per_second
    );
    Ok(per_second)
}

#[inline(always)]
fn run_once(algorithm: Algorithm) {
    match algorithm {
        Algorithm::Bcrypt => bcrypt_once(),
        _ => {
            black_box(hash_hex(algorithm, black_box(BENCHMARK_INPUT)));
        }
    }
}

#[cfg(feature = "bcrypt")]
fn bcrypt_once() {
    const SALT: [u8; 16] = *b"hashcrack-bench!";
    black_box(bcrypt::hash_with_salt(BENCHMARK_INPUT, bcrypt::DEFAULT_COST, SALT).ok());
}

#[cfg(not(feature = "bcrypt"))]
fn bcrypt_once() {}
