// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// Types that cross a stage boundary. Anything private to one stage stays in its module.

use crate::normalize;
use ahash::{AHashMap, AHashSet};

/// The final result of a search: normalized word to occurrence count.
pub type FrequencyMap = AHashMap<String, u64>;

/// The read-only set of normalized words that document tokens are filtered against.
///
/// Every entry has already passed through [`normalize::normalize`], so a lookup with a
/// token produced by the same normalization is an exact string comparison. The set is
/// built once before any filter worker starts and is never mutated afterwards, which is
/// what allows the workers to share it by plain reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    words: AHashSet<String>,
}

impl Dictionary {
    /// Builds a dictionary from raw word-list entries, normalizing each one.
    /// Entries that normalize to the empty string are skipped.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dictionary = Self::default();
        for word in words {
            dictionary.insert_normalized(normalize::normalize(word.as_ref()));
        }
        dictionary
    }

    /// Inserts an already-normalized entry. Returns `false` for duplicates and for
    /// empty entries, which can never be produced by tokenization.
    pub(crate) fn insert_normalized(&mut self, word: String) -> bool {
        if word.is_empty() {
            return false;
        }
        self.words.insert(word)
    }

    /// Returns the dictionary's own copy of `token` when it is a member.
    ///
    /// The filter workers forward this borrowed `&str` instead of allocating a fresh
    /// `String` for every match.
    #[inline]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.words.get(token).map(String::as_str)
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// Per-worker counters, merged by the orchestrator once every worker has joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Lines received from the line queue.
    pub lines: u64,
    /// Tokens produced by normalization, whether or not they matched.
    pub tokens_scanned: u64,
    /// Tokens found in the dictionary and forwarded to the aggregator.
    pub tokens_matched: u64,
}

impl FilterStats {
    pub fn merge(&mut self, other: FilterStats) {
        self.lines += other.lines;
        self.tokens_scanned += other.tokens_scanned;
        self.tokens_matched += other.tokens_matched;
    }
}

/// What the line producer reports once it reaches end-of-stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub lines_read: u64,
    pub bytes_read: u64,
}

/// Summary counters for one complete pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub lines_read: u64,
    pub bytes_read: u64,
    pub tokens_scanned: u64,
    pub tokens_matched: u64,
    pub workers: usize,
}

/// The full outcome of a successful search.
#[derive(Debug, Clone, Default)]
pub struct SearchSummary {
    pub frequencies: FrequencyMap,
    pub stats: PipelineStats,
}
