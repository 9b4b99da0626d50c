/*!
 * Lock-free progress tracking for the search pool
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Cumulative attempts and throughput at one point of a search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSample {
    pub tested: u64,
    /// Candidates per second since the search started
    pub rate: f64,
}

/// Caller hook for progress samples
///
/// Runs on worker threads, possibly concurrently; it must return quickly.
pub type ProgressCallback = Arc<dyn Fn(ProgressSample) + Send + Sync>;

#[inline]
pub(crate) fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Counts attempts across every worker and fires the callback on a fixed cadence
pub struct ProgressReporter {
    tested: AtomicU64,
    start: Instant,
    every: u64,
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new(every: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            tested: AtomicU64::new(0),
            start: Instant::now(),
            every,
            callback,
        }
    }

    /// Count one attempt; returns the cumulative total
    #[inline(always)]
    pub fn record(&self) -> u64 {
        let tested = self.tested.fetch_add(1, Ordering::Relaxed) + 1;
        // each multiple is reached by exactly one worker
        if self.every > 0 && tested % self.every == 0 {
            self.emit(tested);
        }
        tested
    }

    pub fn tested(&self) -> u64 {
        self.tested.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn sample(&self) -> ProgressSample {
        let tested = self.tested();
        ProgressSample {
            tested,
            rate: rate(tested, self.elapsed()),
        }
    }

    /// Emit the closing sample and return it
    pub fn finish(&self) -> ProgressSample {
        let sample = self.sample();
        if let Some(callback) = &self.callback {
            callback(sample);
        }
        sample
    }

    fn emit(&self, tested: u64) {
        if let Some(callback) = &self.callback {
            callback(ProgressSample {
                tested,
                rate: rate(tested, self.elapsed()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_cadence() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_ref = Arc::clone(&seen);
        let reporter = ProgressReporter::new(
            10,
            Some(Arc::new(move |s: ProgressSample| seen_ref.lock().push(s.tested))),
        );

        for _ in 0..35 {
            reporter.record();
        }
        assert_eq!(*seen.lock(), vec![10, 20, 30]);

        let last = reporter.finish();
        assert_eq!(last.tested, 35);
        assert_eq!(seen.lock().last(), Some(&35));
    }

    #[test]
    fn test_without_callback() {
        let reporter = ProgressReporter::new(1, None);
        reporter.record();
        assert_eq!(reporter.finish().tested, 1);
    }

    #[test]
    fn test_rate_zero_elapsed() {
        assert_eq!(rate(100, Duration::ZERO), 0.0);
        assert_eq!(rate(100, Duration::from_secs(4)), 25.0);
    }
}
