//! Encodes documents as bag-of-words count rows against a frozen vocabulary

use ahash::AHashMap;
use rayon::prelude::*;
use tracing::debug;

use crate::corpus::{Label, LabeledDocument};
use crate::error::{Error, Result};
use crate::matrix::DocumentTermMatrix;
use crate::tokenizer::should_use_parallel;
use crate::vocabulary::Vocabulary;

/// Encoder bound to one vocabulary
#[derive(Debug, Clone, Copy)]
pub struct MatrixEncoder<'v> {
    vocabulary: &'v Vocabulary,
}

impl<'v> MatrixEncoder<'v> {
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Sparse `(column, count)` entries for one text, sorted by column.
    ///
    /// Tokens missing from the vocabulary are skipped.
    pub fn encode_row(&self, text: &str) -> Vec<(usize, u32)> {
        let mut counts: AHashMap<usize, u32> = AHashMap::new();
        for token in self.vocabulary.tokenizer().tokenize(text) {
            if let Some(col) = self.vocabulary.index_of(&token) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }
        let mut row: Vec<(usize, u32)> = counts.into_iter().collect();
        row.sort_unstable_by_key(|&(col, _)| col);
        row
    }

    /// One row per document, in input order
    pub fn encode<T: AsRef<str> + Sync>(&self, documents: &[T]) -> DocumentTermMatrix {
        debug!(
            num_docs = documents.len(),
            vocab_size = self.vocabulary.len(),
            "Encoding documents"
        );
        let rows: Vec<Vec<(usize, u32)>> = if should_use_parallel(documents) {
            documents
                .par_iter()
                .map(|doc| self.encode_row(doc.as_ref()))
                .collect()
        } else {
            documents
                .iter()
                .map(|doc| self.encode_row(doc.as_ref()))
                .collect()
        };
        let matrix = DocumentTermMatrix::from_sorted_rows(
            self.vocabulary.len(),
            rows,
            Some(self.vocabulary.fingerprint()),
        );
        debug!(non_zero_entries = matrix.nnz(), "Encoding complete");
        matrix
    }
}

/// Encode documents against `vocabulary`.
pub fn encode<T: AsRef<str> + Sync>(documents: &[T], vocabulary: &Vocabulary) -> DocumentTermMatrix {
    MatrixEncoder::new(vocabulary).encode(documents)
}

/// Count matrix with the label of each row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledMatrix {
    matrix: DocumentTermMatrix,
    labels: Vec<Label>,
}

impl LabeledMatrix {
    pub fn new(matrix: DocumentTermMatrix, labels: Vec<Label>) -> Result<Self> {
        if matrix.n_rows() != labels.len() {
            return Err(Error::LabelCountMismatch {
                rows: matrix.n_rows(),
                labels: labels.len(),
            });
        }
        Ok(Self { matrix, labels })
    }

    pub fn matrix(&self) -> &DocumentTermMatrix {
        &self.matrix
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn into_parts(self) -> (DocumentTermMatrix, Vec<Label>) {
        (self.matrix, self.labels)
    }
}

/// Encode labeled records, keeping each label on its document's row.
pub fn encode_labeled(records: &[LabeledDocument], vocabulary: &Vocabulary) -> LabeledMatrix {
    LabeledMatrix {
        matrix: encode(records, vocabulary),
        labels: records.iter().map(|r| r.label).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::build;

    #[test]
    fn test_reference_row() {
        let vocab = Vocabulary::from_terms(["tasty", "gross", "okay"]).unwrap();
        let matrix = encode(&["Tasty, okay... TASTY!"], &vocab);
        assert_eq!(matrix.to_dense(), vec![vec![2, 0, 1]]);
    }

    #[test]
    fn test_oov_tokens_skipped() {
        let vocab = Vocabulary::from_terms(["good"]).unwrap();
        let row = MatrixEncoder::new(&vocab).encode_row("good bad ugly good");
        assert_eq!(row, vec![(0, 2)]);
    }

    #[test]
    fn test_row_order_matches_input() {
        let vocab = Vocabulary::from_terms(["a", "b"]).unwrap();
        let matrix = encode(&["b", "a a", "", "c"], &vocab);
        assert_eq!(
            matrix.to_dense(),
            vec![vec![0, 1], vec![2, 0], vec![0, 0], vec![0, 0]]
        );
    }

    #[test]
    fn test_empty_vocabulary_zero_width() {
        let vocab = build(&["one two three"], 10);
        let matrix = encode(&["one", "two"], &vocab);
        assert_eq!(matrix.shape(), (2, 0));
        assert!(vocab.ensure_compatible(&matrix).is_ok());
    }

    #[test]
    fn test_empty_documents() {
        let vocab = Vocabulary::from_terms(["a"]).unwrap();
        let docs: Vec<String> = Vec::new();
        assert_eq!(encode(&docs, &vocab).shape(), (0, 1));
    }

    #[test]
    fn test_matrix_checked_against_other_vocabulary() {
        let train = Vocabulary::from_terms(["good", "bad"]).unwrap();
        let other = Vocabulary::from_terms(["bad", "good"]).unwrap();
        let smaller = Vocabulary::from_terms(["good"]).unwrap();
        let matrix = encode(&["good"], &train);

        assert!(train.ensure_compatible(&matrix).is_ok());
        assert!(matches!(
            other.ensure_compatible(&matrix),
            Err(Error::VocabularyMismatch { .. })
        ));
        assert!(matches!(
            smaller.ensure_compatible(&matrix),
            Err(Error::DimensionMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_parallel_encoding_matches_sequential() {
        let vocab = Vocabulary::from_terms(["x", "y", "z"]).unwrap();
        let docs: Vec<String> = (0..300).map(|i| "x y ".repeat(i % 4) + "z").collect();
        let parallel = encode(&docs, &vocab);
        let sequential: Vec<Vec<u32>> = docs
            .iter()
            .map(|d| encode(&[d.as_str()], &vocab).to_dense().remove(0))
            .collect();
        assert_eq!(parallel.to_dense(), sequential);
    }

    #[test]
    fn test_labeled_matrix() {
        let vocab = Vocabulary::from_terms(["great"]).unwrap();
        let records = vec![
            LabeledDocument::new(1, "great great", Label::Positive),
            LabeledDocument::new(2, "awful", Label::Negative),
        ];
        let labeled = encode_labeled(&records, &vocab);
        assert_eq!(labeled.labels(), &[Label::Positive, Label::Negative]);
        assert_eq!(labeled.matrix().get(0, 0), 2);

        let (matrix, _) = labeled.into_parts();
        assert!(matches!(
            LabeledMatrix::new(matrix, vec![Label::Positive]),
            Err(Error::LabelCountMismatch { rows: 2, labels: 1 })
        ));
    }
}
