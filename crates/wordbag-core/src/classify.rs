//! Seam for the downstream linear classifier
//!
//! The pipeline does not train anything itself. It hands a [`LabeledMatrix`]
//! to whatever implements [`Classifier`] and later scores held-out documents
//! encoded against the same frozen vocabulary.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::{Label, LabeledDocument};
use crate::encoder::{encode, encode_labeled, LabeledMatrix};
use crate::error::{Error, Result};
use crate::matrix::DocumentTermMatrix;
use crate::vocabulary::Vocabulary;

/// Binary classifier over document-term matrices
pub trait Classifier {
    fn fit(&mut self, training: &LabeledMatrix) -> Result<()>;

    /// One label per matrix row
    fn predict(&self, matrix: &DocumentTermMatrix) -> Result<Vec<Label>>;
}

/// Predicted and true label for one held-out document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: u64,
    pub predicted: Label,
    pub actual: Label,
}

impl Prediction {
    pub fn is_correct(&self) -> bool {
        self.predicted == self.actual
    }
}

/// Encode the training records and fit the classifier on them.
pub fn train<C: Classifier + ?Sized>(
    classifier: &mut C,
    vocabulary: &Vocabulary,
    training: &[LabeledDocument],
) -> Result<LabeledMatrix> {
    let labeled = encode_labeled(training, vocabulary);
    debug!(
        rows = labeled.matrix().n_rows(),
        cols = labeled.matrix().n_cols(),
        "Fitting classifier"
    );
    classifier.fit(&labeled)?;
    Ok(labeled)
}

/// Predict labels for a caller-supplied matrix.
///
/// The matrix must have been encoded against `vocabulary`; a matrix from
/// another vocabulary or of another width is rejected before prediction.
pub fn predict_checked<C: Classifier + ?Sized>(
    classifier: &C,
    vocabulary: &Vocabulary,
    matrix: &DocumentTermMatrix,
) -> Result<Vec<Label>> {
    vocabulary.ensure_compatible(matrix)?;
    let predicted = classifier.predict(matrix)?;
    if predicted.len() != matrix.n_rows() {
        return Err(Error::LabelCountMismatch {
            rows: matrix.n_rows(),
            labels: predicted.len(),
        });
    }
    Ok(predicted)
}

/// Score held-out records against the frozen training vocabulary.
pub fn evaluate<C: Classifier + ?Sized>(
    classifier: &C,
    vocabulary: &Vocabulary,
    test: &[LabeledDocument],
) -> Result<Vec<Prediction>> {
    let matrix = encode(test, vocabulary);
    let predicted = classifier.predict(&matrix)?;
    if predicted.len() != test.len() {
        return Err(Error::LabelCountMismatch {
            rows: test.len(),
            labels: predicted.len(),
        });
    }

    let predictions: Vec<Prediction> = test
        .iter()
        .zip(predicted)
        .map(|(record, predicted)| Prediction {
            id: record.document.id,
            predicted,
            actual: record.label,
        })
        .collect();
    debug!(
        num_docs = predictions.len(),
        correct = predictions.iter().filter(|p| p.is_correct()).count(),
        "Evaluation complete"
    );
    Ok(predictions)
}
