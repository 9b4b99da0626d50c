/*!
 * Candidate generation
 *
 * Two lazy candidate streams feed the search:
 * - wordlists, streamed line by line with tolerant decoding
 * - masks (`?l?l?d?d`), enumerated with a mixed-radix counter so the
 *   Cartesian product is never materialized
 *
 * Both are grouped into fixed-size batches before dispatch.
 */

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{CrackError, Result};

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()";

/// Character set behind a `?x` class reference
fn class_charset(class: char) -> Option<&'static str> {
    match class {
        'l' => Some(LOWERCASE),
        'u' => Some(UPPERCASE),
        'd' => Some(DIGITS),
        's' => Some(SYMBOLS),
        _ => None,
    }
}

/// Strip BOM artifacts and line terminators, then trim
///
/// Returns `None` when nothing is left.
pub fn sanitize_line(line: &str) -> Option<String> {
    let cleaned: String = line
        .chars()
        .filter(|c| !matches!(c, '\u{feff}' | '\r' | '\n'))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Read error that ended a stream early, shared with the coordinator
pub type ReadFailure = Arc<Mutex<Option<CrackError>>>;

/// Lazily streamed wordlist
pub struct WordlistSource {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    failure: ReadFailure,
}

impl WordlistSource {
    /// Open a wordlist for streaming
    ///
    /// Directories open fine on some platforms but fail on first read, so
    /// they are rejected here.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source: io::Error| CrackError::ResourceUnavailable {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(unavailable)?;
        let metadata = file.metadata().map_err(unavailable)?;
        if metadata.is_dir() {
            return Err(unavailable(io::Error::new(
                io::ErrorKind::Other,
                "is a directory",
            )));
        }

        debug!("Streaming wordlist {}", path.display());

        Ok(Self {
            path,
            reader: BufReader::with_capacity(256 * 1024, file),
            buf: Vec::with_capacity(256),
            failure: ReadFailure::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Slot filled when a read error ends the stream
    pub fn failure(&self) -> ReadFailure {
        Arc::clone(&self.failure)
    }
}

/// Decode a raw line, dropping invalid byte sequences only
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(line) => Cow::Borrowed(line),
        Err(_) => Cow::Owned(raw.utf8_chunks().map(|chunk| chunk.valid()).collect()),
    }
}

impl Iterator for WordlistSource {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    if let Some(word) = sanitize_line(&decode_line(&self.buf)) {
                        return Some(word);
                    }
                }
                Err(e) => {
                    warn!(
                        "Stopped reading wordlist {} after read error: {}",
                        self.path.display(),
                        e
                    );
                    let mut slot = self.failure.lock();
                    if slot.is_none() {
                        *slot = Some(CrackError::ResourceUnavailable {
                            path: self.path.clone(),
                            source: e,
                        });
                    }
                    return None;
                }
            }
        }
    }
}

/// Mask pattern such as `?u?l?l?d` or `admin?d?d`
#[derive(Debug, Clone)]
pub struct MaskGenerator {
    pools: Vec<Vec<char>>,
    total: u64,
}

impl MaskGenerator {
    /// Tokenize a mask left to right
    ///
    /// `?l`, `?u`, `?d` and `?s` expand to their class; every other
    /// character, including a `?` without a known class letter, is a literal.
    pub fn parse(mask: &str) -> Self {
        let mut pools: Vec<Vec<char>> = Vec::new();
        let mut chars = mask.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '?' {
                if let Some(charset) = chars.peek().copied().and_then(class_charset) {
                    chars.next();
                    pools.push(charset.chars().collect());
                    continue;
                }
            }
            pools.push(vec![c]);
        }

        let total = if pools.is_empty() {
            0
        } else {
            pools
                .iter()
                .try_fold(1u64, |acc, pool| acc.checked_mul(pool.len() as u64))
                .unwrap_or(u64::MAX)
        };

        Self { pools, total }
    }

    /// Size of the candidate space (saturates at `u64::MAX`)
    #[inline]
    pub fn total_combinations(&self) -> u64 {
        self.total
    }

    /// Number of positions in every candidate
    pub fn width(&self) -> usize {
        self.pools.len()
    }

    /// Candidate at a position of the enumeration order
    pub fn generate_at_index(&self, mut index: u64) -> Option<String> {
        if index >= self.total {
            return None;
        }

        let mut out = vec!['\0'; self.pools.len()];
        for (slot, pool) in out.iter_mut().zip(&self.pools).rev() {
            let radix = pool.len() as u64;
            *slot = pool[(index % radix) as usize];
            index /= radix;
        }
        Some(out.into_iter().collect())
    }
}

impl IntoIterator for MaskGenerator {
    type Item = String;
    type IntoIter = MaskCandidates;

    fn into_iter(self) -> MaskCandidates {
        let exhausted = self.total == 0;
        MaskCandidates {
            digits: vec![0; self.pools.len()],
            remaining: self.total,
            pools: self.pools,
            exhausted,
        }
    }
}

/// Lazy mixed-radix enumeration of a mask; the rightmost position varies fastest
pub struct MaskCandidates {
    pools: Vec<Vec<char>>,
    digits: Vec<usize>,
    remaining: u64,
    exhausted: bool,
}

impl Iterator for MaskCandidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }

        let candidate: String = self
            .digits
            .iter()
            .zip(&self.pools)
            .map(|(&d, pool)| pool[d])
            .collect();

        // carry from the right; wrapping past the leftmost slot ends the space
        self.exhausted = true;
        for (digit, pool) in self.digits.iter_mut().zip(&self.pools).rev() {
            *digit += 1;
            if *digit < pool.len() {
                self.exhausted = false;
                break;
            }
            *digit = 0;
        }
        self.remaining = self.remaining.saturating_sub(1);

        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            return (0, Some(0));
        }
        match usize::try_from(self.remaining) {
            Ok(n) if self.remaining != u64::MAX => (n, Some(n)),
            _ => (usize::MAX, None),
        }
    }
}

/// Candidate stream consumed by the search coordinator
pub enum CandidateSource {
    Wordlist(WordlistSource),
    Mask(MaskCandidates),
    /// Caller-supplied words, sanitized like wordlist lines
    Words(std::vec::IntoIter<String>),
}

impl CandidateSource {
    pub fn wordlist(path: impl AsRef<Path>) -> Result<Self> {
        WordlistSource::open(path).map(CandidateSource::Wordlist)
    }

    pub fn mask(mask: &str) -> Self {
        CandidateSource::Mask(MaskGenerator::parse(mask).into_iter())
    }

    pub fn words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        CandidateSource::Words(words.into_iter())
    }

    /// Read-error slot of a streamed source
    pub fn read_failure(&self) -> Option<ReadFailure> {
        match self {
            CandidateSource::Wordlist(source) => Some(source.failure()),
            _ => None,
        }
    }

    /// Group the stream into batches of at most `size` candidates
    pub fn batches(self, size: usize) -> Batches<Self> {
        Batches {
            inner: self,
            size: size.max(1),
        }
    }
}

impl Iterator for CandidateSource {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self {
            CandidateSource::Wordlist(source) => source.next(),
            CandidateSource::Mask(candidates) => candidates.next(),
            CandidateSource::Words(words) => words.find_map(|w| sanitize_line(&w)),
        }
    }
}

/// Fixed-size batching over any candidate iterator
pub struct Batches<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator<Item = String>> Iterator for Batches<I> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Vec<String>> {
        let batch: Vec<String> = self.inner.by_ref().take(self.size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mask_cardinality() {
        let gen = MaskGenerator::parse("?l?l?d?d");
        assert_eq!(gen.total_combinations(), 26 * 26 * 10 * 10);
        assert_eq!(gen.into_iter().count(), 67_600);
    }

    #[test]
    fn test_mask_order_is_deterministic() {
        let first: Vec<String> = MaskGenerator::parse("?d?l").into_iter().take(30).collect();
        let second: Vec<String> = MaskGenerator::parse("?d?l").into_iter().take(30).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "0a");
        assert_eq!(first[1], "0b");
        assert_eq!(first[26], "1a");
    }

    #[test]
    fn test_mask_literals_and_unknown_classes() {
        let gen = MaskGenerator::parse("a?x?d");
        // 'a', '?', 'x', digit
        assert_eq!(gen.width(), 4);
        assert_eq!(gen.total_combinations(), 10);
        let all: Vec<String> = gen.into_iter().collect();
        assert_eq!(all.first().unwrap(), "a?x0");
        assert_eq!(all.last().unwrap(), "a?x9");
    }

    #[test]
    fn test_mask_symbols() {
        let all: Vec<String> = MaskGenerator::parse("?s").into_iter().collect();
        assert_eq!(all.concat(), "!@#$%^&*()");
    }

    #[test]
    fn test_mask_generate_at_index_matches_iteration() {
        let gen = MaskGenerator::parse("?u?d?l");
        for (i, candidate) in gen.clone().into_iter().enumerate() {
            assert_eq!(gen.generate_at_index(i as u64).as_deref(), Some(candidate.as_str()));
        }
        assert!(gen.generate_at_index(gen.total_combinations()).is_none());
    }

    #[test]
    fn test_empty_mask_yields_nothing() {
        let gen = MaskGenerator::parse("");
        assert_eq!(gen.total_combinations(), 0);
        assert_eq!(gen.into_iter().next(), None);
    }

    #[test]
    fn test_mask_size_hint_is_exact() {
        let mut iter = MaskGenerator::parse("?d?d").into_iter();
        assert_eq!(iter.size_hint(), (100, Some(100)));
        iter.next();
        assert_eq!(iter.size_hint(), (99, Some(99)));
    }

    #[test]
    fn test_sanitize_line() {
        assert_eq!(sanitize_line("\u{feff}hello\r\n").as_deref(), Some("hello"));
        assert_eq!(sanitize_line("  spaced  ").as_deref(), Some("spaced"));
        assert_eq!(sanitize_line(" \r\n"), None);
    }

    #[test]
    fn test_wordlist_streaming_is_tolerant() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xef\xbb\xbffirst\r\n\n   \nsec\xffond\nlast").unwrap();

        let words: Vec<String> = WordlistSource::open(file.path()).unwrap().collect();
        assert_eq!(words, vec!["first", "second", "last"]);
    }

    #[test]
    fn test_invalid_bytes_keep_real_replacement_chars() {
        assert_eq!(decode_line(b"pa\xffss\xef\xbf\xbd"), "pass\u{fffd}");
        assert_eq!(decode_line("caf\u{e9}".as_bytes()), "caf\u{e9}");
    }

    #[test]
    fn test_wordlist_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = WordlistSource::open(dir.path()).err().unwrap();
        assert!(matches!(err, CrackError::ResourceUnavailable { .. }));
    }

    #[test]
    fn test_wordlist_missing_file() {
        let err = WordlistSource::open("/definitely/not/here.txt").err().unwrap();
        assert!(matches!(err, CrackError::ResourceUnavailable { .. }));
    }

    #[test]
    fn test_batches() {
        let batches: Vec<Vec<String>> = CandidateSource::mask("?d").batches(4).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], vec!["0", "1", "2", "3"]);
        assert_eq!(batches[2], vec!["8", "9"]);
    }

    #[test]
    fn test_words_are_sanitized() {
        let words: Vec<String> = CandidateSource::words(["a\r", "", " b "]).collect();
        assert_eq!(words, vec!["a", "b"]);
    }
}
