/*!
 * Offline hash recovery engine
 *
 * Parallel wordlist and mask attacks against MD5, SHA1, SHA256, SHA512 and
 * bcrypt digests, with cooperative early termination, live throughput
 * reporting and JSON result records. Educational and authorized auditing
 * use only.
 */

// Core library modules
pub mod algorithm;
pub mod benchmark;
pub mod bruteforce;
pub mod config;
pub mod crypto;
pub mod error;
pub mod password_gen;
pub mod progress;
pub mod report;
pub mod rules;
pub mod workers;

// Re-exports
pub use algorithm::{detect, Algorithm};
pub use benchmark::benchmark;
pub use bruteforce::{
    crack_with_mask, crack_with_wordlist, CancellationSignal, CrackOptions, HashCracker,
    SearchOutcome, SearchState, SearchStats,
};
pub use config::EngineConfig;
pub use crypto::{hash_hex, HashMatcher, Placement};
pub use error::{CrackError, ErrorKind};
pub use password_gen::{CandidateSource, MaskGenerator, WordlistSource};
pub use progress::{ProgressCallback, ProgressSample};
pub use report::persist_outcome;
