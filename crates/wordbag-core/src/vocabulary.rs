//! Frequency-pruned vocabulary with stable term indices
//!
//! Terms are counted over the whole training corpus, pruned by `min_count`,
//! and ordered by descending count. Equal counts fall back to ascending term
//! order, so the result does not depend on hash iteration or on how the
//! corpus was sharded across threads.

use std::cmp::Reverse;
use std::fs;
use std::hash::BuildHasher;
use std::path::Path;

use ahash::AHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::matrix::DocumentTermMatrix;
use crate::tokenizer::{should_use_parallel, Tokenizer};

/// Fixed seeds so fingerprints agree within a process
const FINGERPRINT_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Vocabulary construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyParams {
    /// Minimum corpus-wide occurrence count for a term to be kept
    pub min_count: u64,
    /// Keep at most this many of the most frequent terms
    pub max_features: Option<usize>,
}

impl Default for VocabularyParams {
    fn default() -> Self {
        Self {
            min_count: 5,
            max_features: None,
        }
    }
}

impl VocabularyParams {
    /// Parameters with the given threshold and no feature cap
    pub fn new(min_count: u64) -> Self {
        Self {
            min_count,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }
}

/// A retained term and its corpus-wide count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

/// Corpus figures recorded while building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyStats {
    pub num_docs: usize,
    /// Raw token count across the corpus, before pruning
    pub total_tokens: u64,
    /// Distinct terms seen, before pruning
    pub distinct_terms: usize,
    pub vocab_size: usize,
    pub min_count: u64,
}

/// Term occurrence counts for one shard of the corpus
#[derive(Debug, Default)]
struct TermCounts {
    counts: AHashMap<String, u64>,
    total_tokens: u64,
    num_docs: usize,
}

impl TermCounts {
    fn add_document(mut self, tokens: Vec<String>) -> Self {
        self.total_tokens += tokens.len() as u64;
        self.num_docs += 1;
        for token in tokens {
            *self.counts.entry(token).or_insert(0) += 1;
        }
        self
    }

    /// Sum two shards, folding the smaller map into the larger
    fn merge(self, other: Self) -> Self {
        let (mut into, from) = if self.counts.len() >= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        into.total_tokens += from.total_tokens;
        into.num_docs += from.num_docs;
        for (term, count) in from.counts {
            *into.counts.entry(term).or_insert(0) += count;
        }
        into
    }
}

/// Builds a [`Vocabulary`] from a training corpus
#[derive(Debug, Clone, Default)]
pub struct VocabularyBuilder {
    tokenizer: Tokenizer,
    params: VocabularyParams,
}

impl VocabularyBuilder {
    /// Builder with the default tokenizer
    pub fn new(params: VocabularyParams) -> Self {
        Self {
            tokenizer: Tokenizer::default(),
            params,
        }
    }

    #[must_use]
    /// Use a custom tokenizer; it travels with the built vocabulary
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn params(&self) -> &VocabularyParams {
        &self.params
    }

    /// Count, prune and order the corpus terms.
    ///
    /// Large corpora are counted in per-thread shards that are summed before
    /// pruning; the outcome is identical to the sequential path.
    pub fn build<T: AsRef<str> + Sync>(&self, corpus: &[T]) -> Vocabulary {
        self.build_with(corpus, should_use_parallel(corpus))
    }

    fn build_with<T: AsRef<str> + Sync>(&self, corpus: &[T], parallel: bool) -> Vocabulary {
        debug!(num_docs = corpus.len(), parallel, "Building vocabulary");

        let counts = if parallel {
            corpus
                .par_iter()
                .fold(TermCounts::default, |acc, doc| {
                    acc.add_document(self.tokenizer.tokenize(doc.as_ref()))
                })
                .reduce(TermCounts::default, TermCounts::merge)
        } else {
            corpus.iter().fold(TermCounts::default(), |acc, doc| {
                acc.add_document(self.tokenizer.tokenize(doc.as_ref()))
            })
        };

        let distinct_terms = counts.counts.len();
        let min_count = self.params.min_count.max(1);

        let mut entries: Vec<TermCount> = counts
            .counts
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .map(|(term, count)| TermCount { term, count })
            .collect();
        entries.sort_unstable_by(|a, b| {
            Reverse(a.count)
                .cmp(&Reverse(b.count))
                .then_with(|| a.term.cmp(&b.term))
        });
        if let Some(max_features) = self.params.max_features {
            entries.truncate(max_features);
        }

        debug!(
            distinct_terms,
            vocab_size = entries.len(),
            min_count,
            "Vocabulary pruned by min_count"
        );

        let stats = VocabularyStats {
            num_docs: counts.num_docs,
            total_tokens: counts.total_tokens,
            distinct_terms,
            vocab_size: entries.len(),
            min_count,
        };
        Vocabulary::from_parts(self.tokenizer.clone(), entries, stats)
    }
}

/// Build a vocabulary with the default tokenizer.
pub fn build<T: AsRef<str> + Sync>(corpus: &[T], min_count: u64) -> Vocabulary {
    VocabularyBuilder::new(VocabularyParams::new(min_count)).build(corpus)
}

/// Frozen term list with a term -> column index mapping.
///
/// Carries the tokenizer it was built with so encoding always normalizes
/// text the same way as training did.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "VocabularySnapshot", try_from = "VocabularySnapshot")]
pub struct Vocabulary {
    tokenizer: Tokenizer,
    entries: Vec<TermCount>,
    index: AHashMap<String, usize>,
    stats: VocabularyStats,
    fingerprint: u64,
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.tokenizer == other.tokenizer && self.entries == other.entries
    }
}

impl Eq for Vocabulary {}

impl Vocabulary {
    fn from_parts(tokenizer: Tokenizer, entries: Vec<TermCount>, stats: VocabularyStats) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.term.clone(), idx))
            .collect();
        let fingerprint = fingerprint(&entries);
        Self {
            tokenizer,
            entries,
            index,
            stats,
            fingerprint,
        }
    }

    /// Fixed vocabulary from an explicit term list, in column order.
    ///
    /// Counts and corpus stats are zero since no corpus was seen.
    pub fn from_terms<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<TermCount> = terms
            .into_iter()
            .map(|t| TermCount {
                term: t.into(),
                count: 0,
            })
            .collect();
        Self::try_from(VocabularySnapshot {
            tokenizer: Tokenizer::default(),
            stats: VocabularyStats {
                num_docs: 0,
                total_tokens: 0,
                distinct_terms: terms.len(),
                vocab_size: terms.len(),
                min_count: 0,
            },
            terms,
        })
    }

    /// Column index of a term, `None` when out of vocabulary
    #[inline]
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Term stored at a column index
    pub fn term(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.term.as_str())
    }

    /// Corpus-wide count of a retained term
    pub fn count(&self, term: &str) -> Option<u64> {
        self.index_of(term).map(|idx| self.entries[idx].count)
    }

    /// Terms in index order
    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.term.as_str())
    }

    /// Retained terms with their counts, in index order
    pub fn entries(&self) -> &[TermCount] {
        &self.entries
    }

    /// `(rank, term, count)` triples, rank starting at 1
    pub fn rank_frequencies(&self) -> impl Iterator<Item = (usize, &str, u64)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (idx + 1, e.term.as_str(), e.count))
    }

    /// Number of terms, i.e. matrix columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when pruning kept no terms
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Corpus figures recorded at build time
    pub fn stats(&self) -> VocabularyStats {
        self.stats
    }

    /// Tokenizer the vocabulary was built with
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Hash of the ordered term list, used to catch mixed-up matrices
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Check that a matrix was encoded against this vocabulary
    pub fn ensure_compatible(&self, matrix: &DocumentTermMatrix) -> Result<()> {
        if matrix.n_cols() != self.len() {
            return Err(Error::DimensionMismatch {
                expected: self.len(),
                actual: matrix.n_cols(),
            });
        }
        match matrix.fingerprint() {
            Some(actual) if actual != self.fingerprint => Err(Error::VocabularyMismatch {
                expected: self.fingerprint,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON and rebuild the term index
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the vocabulary as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a vocabulary written by [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

fn fingerprint(entries: &[TermCount]) -> u64 {
    let [k0, k1, k2, k3] = FINGERPRINT_SEEDS;
    let state = ahash::RandomState::with_seeds(k0, k1, k2, k3);
    BuildHasher::hash_one(&state, entries.iter().map(|e| e.term.as_str()).collect::<Vec<_>>())
}

/// On-disk form; the index and fingerprint are rebuilt on load
#[derive(Serialize, Deserialize)]
struct VocabularySnapshot {
    tokenizer: Tokenizer,
    stats: VocabularyStats,
    terms: Vec<TermCount>,
}

impl From<Vocabulary> for VocabularySnapshot {
    fn from(vocab: Vocabulary) -> Self {
        Self {
            tokenizer: vocab.tokenizer,
            stats: vocab.stats,
            terms: vocab.entries,
        }
    }
}

impl TryFrom<VocabularySnapshot> for Vocabulary {
    type Error = Error;

    fn try_from(snapshot: VocabularySnapshot) -> Result<Self> {
        let mut seen = ahash::AHashSet::with_capacity(snapshot.terms.len());
        for entry in &snapshot.terms {
            if !seen.insert(entry.term.as_str()) {
                return Err(Error::InvalidParams(format!(
                    "duplicate vocabulary term {:?}",
                    entry.term
                )));
            }
        }
        let stats = VocabularyStats {
            vocab_size: snapshot.terms.len(),
            ..snapshot.stats
        };
        Ok(Self::from_parts(snapshot.tokenizer, snapshot.terms, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviews() -> Vec<&'static str> {
        vec![
            "tasty tasty tasty food",
            "gross food, tasty drink",
            "okay food. okay drink!",
            "tasty",
        ]
    }

    #[test]
    fn test_counts_and_order() {
        let vocab = build(&reviews(), 2);
        // tasty=5, food=3, drink=2, okay=2; gross=1 pruned
        let terms: Vec<&str> = vocab.terms().collect();
        assert_eq!(terms, vec!["tasty", "food", "drink", "okay"]);
        assert_eq!(vocab.count("tasty"), Some(5));
        assert_eq!(vocab.index_of("gross"), None);
    }

    #[test]
    fn test_indices_contiguous() {
        let vocab = build(&reviews(), 1);
        let mut indices: Vec<usize> = vocab.terms().map(|t| vocab.index_of(t).unwrap()).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..vocab.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_min_count_above_max_is_empty() {
        let vocab = build(&reviews(), 100);
        assert!(vocab.is_empty());
        assert_eq!(vocab.stats().distinct_terms, 5);
    }

    #[test]
    fn test_empty_corpus() {
        let corpus: Vec<&str> = Vec::new();
        let vocab = build(&corpus, 1);
        assert!(vocab.is_empty());
        assert_eq!(vocab.stats().num_docs, 0);
        assert_eq!(vocab.stats().total_tokens, 0);
    }

    #[test]
    fn test_zero_min_count_keeps_everything() {
        let vocab = build(&reviews(), 0);
        assert_eq!(vocab.len(), 5);
        assert_eq!(vocab.stats().min_count, 1);
    }

    #[test]
    fn test_max_features() {
        let params = VocabularyParams::new(1).with_max_features(2);
        let vocab = VocabularyBuilder::new(params).build(&reviews());
        let terms: Vec<&str> = vocab.terms().collect();
        assert_eq!(terms, vec!["tasty", "food"]);
    }

    #[test]
    fn test_stats() {
        let vocab = build(&reviews(), 2);
        let stats = vocab.stats();
        assert_eq!(stats.num_docs, 4);
        assert_eq!(stats.total_tokens, 13);
        assert_eq!(stats.vocab_size, 4);
    }

    #[test]
    fn test_rank_frequencies() {
        let vocab = build(&reviews(), 3);
        let ranks: Vec<_> = vocab.rank_frequencies().collect();
        assert_eq!(ranks, vec![(1, "tasty", 5), (2, "food", 3)]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let corpus: Vec<String> = (0..400)
            .map(|i| format!("word{} shared common{} tail x{}", i % 17, i % 5, i % 3))
            .collect();
        assert!(should_use_parallel(&corpus));
        for min_count in [1, 3, 30] {
            let builder = VocabularyBuilder::new(VocabularyParams::new(min_count));
            let parallel = builder.build_with(&corpus, true);
            let sequential = builder.build_with(&corpus, false);
            assert_eq!(parallel.entries(), sequential.entries());
            assert_eq!(parallel.stats(), sequential.stats());
            assert_eq!(parallel.fingerprint(), sequential.fingerprint());
        }
        // shared and tail tie at 400; ascending term order breaks the tie
        let vocab = build(&corpus, 3);
        assert_eq!(vocab.index_of("shared"), Some(0));
        assert_eq!(vocab.index_of("tail"), Some(1));
    }

    #[test]
    fn test_json_roundtrip_rebuilds_index() {
        let vocab = build(&reviews(), 1);
        let restored = Vocabulary::from_json(&vocab.to_json().unwrap()).unwrap();
        assert_eq!(restored, vocab);
        assert_eq!(restored.index_of("okay"), vocab.index_of("okay"));
        assert_eq!(restored.fingerprint(), vocab.fingerprint());
    }

    #[test]
    fn test_from_terms_keeps_order() {
        let vocab = Vocabulary::from_terms(["tasty", "gross", "okay"]).unwrap();
        assert_eq!(vocab.index_of("tasty"), Some(0));
        assert_eq!(vocab.index_of("okay"), Some(2));
        assert_eq!(vocab.term(1), Some("gross"));
        assert!(Vocabulary::from_terms(["a", "b", "a"]).is_err());
    }

    #[test]
    fn test_duplicate_terms_rejected() {
        let json = r#"{
            "tokenizer": {"strip": [], "separators": []},
            "stats": {"num_docs": 1, "total_tokens": 2, "distinct_terms": 1, "vocab_size": 2, "min_count": 1},
            "terms": [{"term": "a", "count": 1}, {"term": "a", "count": 1}]
        }"#;
        assert!(Vocabulary::from_json(json).is_err());
    }
}
