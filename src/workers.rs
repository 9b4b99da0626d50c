/*!
 * Background workers for async callers
 *
 * Searches are CPU-bound, so they run on tokio's blocking pool and report
 * back over an unbounded channel. Sending never blocks a search worker.
 */

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::bruteforce::{crack_with_mask, crack_with_wordlist, CrackOptions, SearchOutcome};
use crate::error::ErrorKind;
use crate::progress::ProgressSample;

/// Events streamed by a background search
#[derive(Debug, Clone, PartialEq)]
pub enum CrackProgress {
    /// Worker threads the search will actually use
    Started { workers: usize },
    Progress { tested: u64, rate: f64 },
    Log(String),
    Found(String),
    NotFound,
    Error(String),
}

/// Control handle shared between the caller and a background search
pub struct CrackState {
    pub stop: Arc<AtomicBool>,
}

impl Default for CrackState {
    fn default() -> Self {
        Self::new()
    }
}

impl CrackState {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Wordlist search parameters
pub struct WordlistCrackParams {
    pub target: String,
    pub wordlist_path: PathBuf,
    pub options: CrackOptions,
}

/// Mask search parameters
pub struct MaskCrackParams {
    pub target: String,
    pub mask: String,
    pub options: CrackOptions,
}

/// Wire the channel and stop flag into the caller's options
fn attach(
    mut options: CrackOptions,
    state: &CrackState,
    progress_tx: &UnboundedSender<CrackProgress>,
) -> CrackOptions {
    let tx = progress_tx.clone();
    options.progress = Some(Arc::new(move |sample: ProgressSample| {
        let _ = tx.send(CrackProgress::Progress {
            tested: sample.tested,
            rate: sample.rate,
        });
    }));
    options.stop = Some(Arc::clone(&state.stop));
    options
}

/// Final event for an outcome, logging the summary on the way
fn conclude(outcome: SearchOutcome, progress_tx: &UnboundedSender<CrackProgress>) -> CrackProgress {
    let _ = progress_tx.send(CrackProgress::Log(format!(
        "{} attempts in {:.2}s ({:.0} H/s)",
        outcome.stats.attempts, outcome.stats.duration_secs, outcome.stats.rate
    )));

    match (outcome.recovered_secret, outcome.error) {
        (Some(secret), _) if outcome.success => CrackProgress::Found(secret),
        (_, Some(ErrorKind::NotFound)) => CrackProgress::NotFound,
        (_, _) => CrackProgress::Error(
            outcome
                .message
                .unwrap_or_else(|| "search failed".to_string()),
        ),
    }
}

/// Run a wordlist search in the background
pub async fn crack_wordlist_async(
    params: WordlistCrackParams,
    state: Arc<CrackState>,
    progress_tx: UnboundedSender<CrackProgress>,
) -> CrackProgress {
    let _ = progress_tx.send(CrackProgress::Started {
        workers: params.options.engine.worker_count(params.options.workers),
    });
    let _ = progress_tx.send(CrackProgress::Log(format!(
        "Loading wordlist from {}...",
        params.wordlist_path.display()
    )));

    let options = attach(params.options, &state, &progress_tx);
    let tx = progress_tx.clone();
    match tokio::task::spawn_blocking(move || {
        crack_with_wordlist(&params.target, &params.wordlist_path, &options)
    })
    .await
    {
        Ok(outcome) => conclude(outcome, &tx),
        Err(e) => CrackProgress::Error(format!("Task panicked: {}", e)),
    }
}

/// Run a mask search in the background
pub async fn crack_mask_async(
    params: MaskCrackParams,
    state: Arc<CrackState>,
    progress_tx: UnboundedSender<CrackProgress>,
) -> CrackProgress {
    let _ = progress_tx.send(CrackProgress::Started {
        workers: params.options.engine.worker_count(params.options.workers),
    });
    let _ = progress_tx.send(CrackProgress::Log(format!("Expanding mask {}...", params.mask)));

    let options = attach(params.options, &state, &progress_tx);
    let tx = progress_tx.clone();
    match tokio::task::spawn_blocking(move || {
        crack_with_mask(&params.target, &params.mask, &options)
    })
    .await
    {
        Ok(outcome) => conclude(outcome, &tx),
        Err(e) => CrackProgress::Error(format!("Task panicked: {}", e)),
    }
}
