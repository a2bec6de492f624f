//! Wordbag Core - bag-of-words feature extraction in Rust
//!
//! This library turns free text into document-term count matrices for
//! linear classifiers: tokenize, build a frequency-pruned vocabulary once
//! from training data, then encode any corpus against that frozen vocabulary.

pub mod classify;
pub mod codec;
pub mod corpus;
pub mod encoder;
pub mod error;
pub mod matrix;
pub mod tokenizer;
pub mod vocabulary;

pub use classify::{evaluate, predict_checked, train, Classifier, Prediction};
pub use corpus::{Corpus, Document, Label, LabeledDocument};
pub use encoder::{encode, encode_labeled, LabeledMatrix, MatrixEncoder};
pub use error::{Error, Result};
pub use matrix::{DocumentTermMatrix, RowView};
pub use tokenizer::{tokenize, Tokenizer};
pub use vocabulary::{build, Vocabulary, VocabularyBuilder, VocabularyParams, VocabularyStats};
