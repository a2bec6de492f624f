//! Bag-of-words tokenizer
//!
//! Lowercases, deletes a fixed set of punctuation, turns word-joining
//! characters into spaces and splits on whitespace.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Characters deleted outright, so "it's" becomes "its" and "100%" becomes "100"
pub const DEFAULT_STRIP: &[char] = &['.', ':', ';', ',', '!', '#', '%', '(', ')', '\'', '<', '>'];

/// Characters replaced by a space, so "pickup-truck" becomes two tokens
pub const DEFAULT_SEPARATORS: &[char] = &['-', '/', '\\', '&'];

/// Minimum number of texts before batch tokenization goes parallel
const MIN_TEXTS_FOR_PARALLEL: usize = 100;

/// Minimum total byte count before batch tokenization goes parallel
const MIN_BYTES_FOR_PARALLEL: usize = 10_000;

/// Tokenize with the default character sets.
///
/// ```
/// use wordbag_core::tokenizer::tokenize;
///
/// assert_eq!(tokenize("It's a pickup-truck!"), vec!["its", "a", "pickup", "truck"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    split_normalized(text, DEFAULT_STRIP, DEFAULT_SEPARATORS)
}

fn split_normalized(text: &str, strip: &[char], separators: &[char]) -> Vec<String> {
    let mut normalized = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if strip.contains(&c) {
            continue;
        }
        if separators.contains(&c) {
            normalized.push(' ');
        } else {
            normalized.push(c);
        }
    }
    normalized.split_whitespace().map(String::from).collect()
}

/// Tokenizer with configurable strip and separator sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenizer {
    /// Characters removed without replacement
    pub strip: Vec<char>,
    /// Characters replaced by a single space
    pub separators: Vec<char>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            strip: DEFAULT_STRIP.to_vec(),
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }
}

impl Tokenizer {
    /// Create a tokenizer with custom character sets
    pub fn new(strip: impl Into<Vec<char>>, separators: impl Into<Vec<char>>) -> Self {
        Self {
            strip: strip.into(),
            separators: separators.into(),
        }
    }

    /// Tokenize text into terms
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        split_normalized(text, &self.strip, &self.separators)
    }

    /// Tokenize many texts, preserving input order.
    ///
    /// Large batches are spread across the rayon pool.
    pub fn tokenize_batch<T: AsRef<str> + Sync>(&self, texts: &[T]) -> Vec<Vec<String>> {
        if should_use_parallel(texts) {
            debug!(num_texts = texts.len(), "Using parallel tokenization");
            texts.par_iter().map(|t| self.tokenize(t.as_ref())).collect()
        } else {
            debug!(num_texts = texts.len(), "Using sequential tokenization");
            texts.iter().map(|t| self.tokenize(t.as_ref())).collect()
        }
    }
}

/// Parallelize when there are many texts or a lot of text overall.
#[inline]
pub(crate) fn should_use_parallel<T: AsRef<str>>(texts: &[T]) -> bool {
    if texts.len() >= MIN_TEXTS_FOR_PARALLEL {
        return true;
    }
    texts.iter().map(|t| t.as_ref().len()).sum::<usize>() >= MIN_BYTES_FOR_PARALLEL
}
