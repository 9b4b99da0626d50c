/*!
 * Engine tuning configuration
 *
 * Loaded from JSON (`$HOME/.hashcrack/config.json` by default). Missing
 * fields take their defaults; `HASHCRACK_THREADS` overrides the worker count.
 */

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algorithm::Algorithm;
use crate::error::{CrackError, Result};

/// Environment variable overriding the worker count
pub const THREADS_ENV: &str = "HASHCRACK_THREADS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads (`None` = one per logical CPU)
    pub workers: Option<usize>,
    /// Batch size for wordlist candidates under cheap digests
    pub wordlist_batch: usize,
    /// Batch size for mask candidates under cheap digests
    pub mask_batch: usize,
    /// Batch size under expensive verification (bcrypt)
    pub expensive_batch: usize,
    /// Progress callback cadence, in attempts across the whole pool
    pub progress_every: u64,
    /// Where the CLI writes result records
    pub log_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: None,
            wordlist_batch: 100,
            mask_batch: 500,
            expensive_batch: 1,
            progress_every: 100,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| CrackError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: EngineConfig = serde_json::from_str(&data).map_err(|e| CrackError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Loaded engine config from {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Default location, falling back to built-in defaults
    pub fn load_or_default() -> Self {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path).unwrap_or_else(|e| {
                warn!("{}; using defaults", e);
                Self::default().with_env_overrides()
            }),
            _ => Self::default().with_env_overrides(),
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(THREADS_ENV) {
            match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.workers = Some(n),
                _ => warn!("Ignoring invalid {}={:?}", THREADS_ENV, value),
            }
        }
        self
    }

    /// Worker count for one invocation; an explicit override wins
    pub fn worker_count(&self, requested: Option<usize>) -> usize {
        requested
            .or(self.workers)
            .unwrap_or_else(num_cpus::get)
            .max(1)
    }

    /// Batch size policy: expensive verification always shrinks to `expensive_batch`
    pub fn batch_size(&self, algorithm: Algorithm, from_mask: bool) -> usize {
        let size = if algorithm.is_expensive() {
            self.expensive_batch
        } else if from_mask {
            self.mask_batch
        } else {
            self.wordlist_batch
        };
        size.max(1)
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    if home.is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".hashcrack").join("config.json"))
}
