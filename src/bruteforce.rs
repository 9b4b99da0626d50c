/*!
 * Parallel offline hash recovery
 *
 * This module coordinates the search over a candidate stream:
 * - Candidates are grouped into batches and pulled lazily by a rayon pool
 * - Every worker polls a shared cancellation signal before each attempt
 * - The first match cancels all outstanding work
 * - Attempts are counted lock-free for progress and throughput reporting
 *
 * Batch size follows the verification cost: cheap digests use large batches
 * to amortize dispatch, bcrypt uses single-candidate batches so cancellation
 * is observed promptly.
 */

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithm::{self, Algorithm};
use crate::config::EngineConfig;
use crate::crypto::{HashMatcher, Placement};
use crate::error::{CrackError, ErrorKind};
use crate::password_gen::CandidateSource;
use crate::progress::{ProgressCallback, ProgressReporter};
use crate::rules;

/// Per-invocation search parameters
#[derive(Clone, Default)]
pub struct CrackOptions {
    /// Explicit algorithm; detected from the digest when `None`
    pub algorithm: Option<Algorithm>,
    pub salt: Option<String>,
    /// Salt order; both orders are tried when a salt is given without one
    pub placement: Option<Placement>,
    /// Apply rule variants to wordlist entries
    pub use_rules: bool,
    /// Worker count override
    pub workers: Option<usize>,
    pub progress: Option<ProgressCallback>,
    /// Caller-side abort request, polled alongside the cancellation signal
    pub stop: Option<Arc<AtomicBool>>,
    pub engine: EngineConfig,
}

/// Throughput figures for a finished search
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub attempts: u64,
    pub duration_secs: f64,
    /// Attempts per second
    pub rate: f64,
}

/// Final result of one search invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub success: bool,
    pub recovered_secret: Option<String>,
    pub target: String,
    pub algorithm: Algorithm,
    pub salt: Option<String>,
    pub placement: Option<Placement>,
    pub error: Option<ErrorKind>,
    /// Human-readable error detail
    pub message: Option<String>,
    pub stats: SearchStats,
}

impl SearchOutcome {
    /// Outcome for a search that failed before any worker started
    fn aborted(target: &str, algorithm: Algorithm, options: &CrackOptions, err: CrackError) -> Self {
        Self {
            success: false,
            recovered_secret: None,
            target: algorithm::normalize(target),
            algorithm,
            salt: options.salt.clone(),
            placement: options.placement,
            error: Some(err.kind()),
            message: Some(err.to_string()),
            stats: SearchStats::default(),
        }
    }
}

/// Shared stop flag handed to every worker
///
/// Starts false and only ever moves to true.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal(Arc<AtomicBool>);

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal; returns `true` for the call that actually raised it
    #[inline]
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SearchState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Done = 3,
}

impl SearchState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SearchState::Idle,
            1 => SearchState::Running,
            2 => SearchState::Stopping,
            _ => SearchState::Done,
        }
    }
}

/// One search invocation over a candidate stream
pub struct HashCracker {
    target: String,
    algorithm: Algorithm,
    matcher: HashMatcher,
    options: CrackOptions,
    workers: usize,
    state: AtomicU8,
    cancel: CancellationSignal,
}

impl HashCracker {
    /// Normalize the target and settle the algorithm
    ///
    /// Fails with `AlgorithmUnidentified` or `UnsupportedAlgorithm`; no
    /// worker exists yet at that point.
    pub fn new(target: &str, options: CrackOptions) -> Result<Self, CrackError> {
        let algorithm = algorithm::resolve(options.algorithm, target)?;
        let target = algorithm::normalize(target);

        if algorithm == Algorithm::Bcrypt && options.salt.is_some() {
            debug!("bcrypt embeds its own salt; ignoring the supplied salt");
        }

        let matcher = HashMatcher::new(
            &target,
            algorithm,
            options.salt.as_deref(),
            options.placement,
        );
        let workers = options.engine.worker_count(options.workers);

        Ok(Self {
            target,
            algorithm,
            matcher,
            options,
            workers,
            state: AtomicU8::new(SearchState::Idle as u8),
            cancel: CancellationSignal::new(),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn state(&self) -> SearchState {
        SearchState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn advance(&self, from: SearchState, to: SearchState) -> bool {
        let moved = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            debug!("Search state {:?} -> {:?}", from, to);
        }
        moved
    }

    /// Outcome for a failure detected after construction but before dispatch
    pub fn abort(&self, err: CrackError) -> SearchOutcome {
        self.state.store(SearchState::Done as u8, Ordering::Release);
        SearchOutcome::aborted(&self.target, self.algorithm, &self.options, err)
    }

    /// Run the search to completion
    ///
    /// A cracker runs once; later calls report `Cancelled` without testing
    /// anything. When several workers hit distinct valid candidates at nearly
    /// the same moment, whichever reaches the result slot first is returned.
    pub fn run(&self, source: CandidateSource) -> SearchOutcome {
        if !self.advance(SearchState::Idle, SearchState::Running) {
            warn!("HashCracker already ran; refusing to search again");
            return self.abort(CrackError::Cancelled);
        }

        let from_mask = matches!(source, CandidateSource::Mask(_));
        let read_failure = source.read_failure();
        let use_rules = self.options.use_rules && !from_mask;
        let batch_size = self.options.engine.batch_size(self.algorithm, from_mask);
        let reporter = ProgressReporter::new(
            self.options.engine.progress_every,
            self.options.progress.clone(),
        );

        info!(
            "Starting {} search: {} workers, batch size {}, rules {}",
            self.algorithm,
            self.workers,
            batch_size,
            if use_rules { "on" } else { "off" }
        );

        let found: Mutex<Option<String>> = Mutex::new(None);
        let cancel = self.cancel.clone();
        let batches = source
            .batches(batch_size)
            .take_while(move |_| !cancel.is_cancelled());

        let search = || {
            batches.par_bridge().find_map_any(|batch| {
                let hit = self.test_batch(batch, &reporter, use_rules)?;
                let mut slot = found.lock();
                if slot.is_none() {
                    *slot = Some(hit.clone());
                }
                Some(hit)
            })
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("hashcrack-worker-{}", i))
            .build()
        {
            Ok(pool) => {
                pool.install(search);
            }
            Err(e) => {
                warn!("Could not build worker pool ({}); using the global pool", e);
                search();
            }
        }

        let elapsed = reporter.elapsed();
        let sample = reporter.finish();
        let stats = SearchStats {
            attempts: sample.tested,
            duration_secs: elapsed.as_secs_f64(),
            rate: sample.rate,
        };

        // Running (exhausted) or Stopping (match / caller stop) both end here
        if !self.advance(SearchState::Stopping, SearchState::Done) {
            self.advance(SearchState::Running, SearchState::Done);
        }

        let secret = found.into_inner();
        let failure = read_failure.as_ref().and_then(|slot| slot.lock().take());
        let error = match (&secret, failure) {
            (Some(_), _) => None,
            (None, Some(e)) => Some(e),
            (None, None) if self.stop_requested() => Some(CrackError::Cancelled),
            (None, None) => Some(CrackError::NotFound),
        };

        match &error {
            None => info!(
                "Match found after {} attempts in {:.2}s ({:.0} H/s)",
                stats.attempts, stats.duration_secs, stats.rate
            ),
            Some(e) => info!(
                "Search ended without a match ({}) after {} attempts",
                e, stats.attempts
            ),
        }

        SearchOutcome {
            success: secret.is_some(),
            recovered_secret: secret,
            target: self.target.clone(),
            algorithm: self.algorithm,
            salt: self.options.salt.clone(),
            placement: self.options.placement,
            error: error.as_ref().map(CrackError::kind),
            message: error.map(|e| e.to_string()),
            stats,
        }
    }

    fn stop_requested(&self) -> bool {
        self.options
            .stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::Relaxed))
    }

    /// Checked before every attempt
    #[inline(always)]
    fn should_stop(&self) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        if self.stop_requested() {
            if self.cancel.cancel() {
                self.advance(SearchState::Running, SearchState::Stopping);
            }
            return true;
        }
        false
    }

    #[inline(always)]
    fn test_candidate(&self, candidate: &str, reporter: &ProgressReporter) -> bool {
        reporter.record();
        if self.matcher.matches(candidate) {
            if self.cancel.cancel() {
                self.advance(SearchState::Running, SearchState::Stopping);
            }
            return true;
        }
        false
    }

    fn test_batch(
        &self,
        batch: Vec<String>,
        reporter: &ProgressReporter,
        use_rules: bool,
    ) -> Option<String> {
        for word in batch {
            if use_rules {
                for variant in rules::expand(&word) {
                    if self.should_stop() {
                        return None;
                    }
                    if self.test_candidate(&variant, reporter) {
                        return Some(variant);
                    }
                }
            } else {
                if self.should_stop() {
                    return None;
                }
                if self.test_candidate(&word, reporter) {
                    return Some(word);
                }
            }
        }
        None
    }
}

/// Algorithm recorded when the cracker could not be built
fn labelled(target: &str, options: &CrackOptions) -> Algorithm {
    match options.algorithm {
        Some(explicit) if explicit != Algorithm::Unknown => explicit,
        _ => algorithm::detect(&algorithm::normalize(target)),
    }
}

/// Recover a secret from a wordlist
///
/// Never fails outright: every error is reported inside the outcome.
pub fn crack_with_wordlist(
    target: &str,
    wordlist: impl AsRef<Path>,
    options: &CrackOptions,
) -> SearchOutcome {
    let cracker = match HashCracker::new(target, options.clone()) {
        Ok(cracker) => cracker,
        Err(e) => {
            return SearchOutcome::aborted(target, labelled(target, options), options, e);
        }
    };

    match CandidateSource::wordlist(wordlist) {
        Ok(source) => cracker.run(source),
        Err(e) => cracker.abort(e),
    }
}

/// Recover a secret by enumerating a mask; rules are never applied
pub fn crack_with_mask(target: &str, mask: &str, options: &CrackOptions) -> SearchOutcome {
    let options = CrackOptions {
        use_rules: false,
        ..options.clone()
    };

    match HashCracker::new(target, options.clone()) {
        Ok(cracker) => cracker.run(CandidateSource::mask(mask)),
        Err(e) => {
            SearchOutcome::aborted(target, labelled(target, &options), &options, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_hex;
    use std::io::Write;

    fn md5(data: &str) -> String {
        hash_hex(Algorithm::Md5, data.as_bytes()).unwrap()
    }

    fn options(workers: usize) -> CrackOptions {
        CrackOptions {
            workers: Some(workers),
            ..CrackOptions::default()
        }
    }

    #[test]
    fn test_cancellation_signal_is_one_way() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
        assert!(signal.cancel());
        assert!(!signal.cancel());
        assert!(signal.clone().is_cancelled());
    }

    #[test]
    fn test_wordlist_scenario() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hello\nworld\npassword123\nadmin").unwrap();

        let outcome = crack_with_wordlist(&md5("password123"), file.path(), &options(4));
        assert!(outcome.success);
        assert_eq!(outcome.recovered_secret.as_deref(), Some("password123"));
        assert_eq!(outcome.algorithm, Algorithm::Md5);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_run_reaches_done_and_is_single_use() {
        let cracker = HashCracker::new(&md5("7"), options(2)).unwrap();
        assert_eq!(cracker.state(), SearchState::Idle);

        let outcome = cracker.run(CandidateSource::mask("?d"));
        assert!(outcome.success);
        assert_eq!(cracker.state(), SearchState::Done);

        let again = cracker.run(CandidateSource::mask("?d"));
        assert_eq!(again.error, Some(ErrorKind::Cancelled));
        assert_eq!(again.stats.attempts, 0);
    }

    #[test]
    fn test_rules_find_variant() {
        let cracker = HashCracker::new(
            &md5("Summer"),
            CrackOptions {
                use_rules: true,
                ..options(2)
            },
        )
        .unwrap();
        let outcome = cracker.run(CandidateSource::words(["winter", "summer"]));
        assert!(outcome.success);
        assert_eq!(outcome.recovered_secret.as_deref(), Some("Summer"));
    }

    #[test]
    fn test_rules_off_misses_variant() {
        let cracker = HashCracker::new(&md5("summer!"), options(2)).unwrap();
        let outcome = cracker.run(CandidateSource::words(["summer"]));
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(ErrorKind::NotFound));
        assert_eq!(outcome.stats.attempts, 1);
    }

    #[test]
    fn test_caller_stop_cancels() {
        let stop = Arc::new(AtomicBool::new(true));
        let cracker = HashCracker::new(
            &md5("zzzz"),
            CrackOptions {
                stop: Some(stop),
                ..options(2)
            },
        )
        .unwrap();
        let outcome = cracker.run(CandidateSource::mask("?l?l?l?l"));
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(ErrorKind::Cancelled));
        assert!(outcome.stats.attempts < 456_976);
    }

    #[test]
    fn test_unidentified_algorithm_aborts() {
        let outcome = crack_with_mask("abc", "?d", &options(1));
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(ErrorKind::AlgorithmUnidentified));
        assert_eq!(outcome.algorithm, Algorithm::Unknown);
        assert_eq!(outcome.stats.attempts, 0);
    }

    #[test]
    fn test_read_failure_is_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = CandidateSource::wordlist(file.path()).unwrap();
        let slot = source.read_failure().unwrap();
        *slot.lock() = Some(CrackError::ResourceUnavailable {
            path: file.path().to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "device gone"),
        });

        let cracker = HashCracker::new(&md5("x"), options(1)).unwrap();
        let outcome = cracker.run(source);
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(ErrorKind::ResourceUnavailable));
        assert!(outcome.message.unwrap().contains("device gone"));
    }

    #[cfg(not(feature = "bcrypt"))]
    #[test]
    fn test_unsupported_bcrypt_keeps_detected_algorithm() {
        let target = "$2b$04$abcdefghijklmnopqrstuuJ4oIQ4pLdz0Zr3QmQH0YQ5o2cLwQkUq";
        let outcome = crack_with_mask(target, "?d", &options(1));
        assert_eq!(outcome.error, Some(ErrorKind::UnsupportedAlgorithm));
        assert_eq!(outcome.algorithm, Algorithm::Bcrypt);
        assert_eq!(outcome.stats.attempts, 0);
    }

    #[test]
    fn test_missing_wordlist() {
        let outcome = crack_with_wordlist(&md5("x"), "/no/such/wordlist.txt", &options(1));
        assert_eq!(outcome.error, Some(ErrorKind::ResourceUnavailable));
        assert_eq!(outcome.algorithm, Algorithm::Md5);
        assert!(outcome.message.unwrap().contains("wordlist.txt"));
    }
}
