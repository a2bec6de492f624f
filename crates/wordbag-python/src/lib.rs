//! Python bindings for Wordbag Rust components

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;
use wordbag_core::{
    encode, Error as CoreError, Vocabulary as CoreVocabulary, VocabularyBuilder, VocabularyParams,
};

fn to_py_err(err: CoreError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Split text into normalized bag-of-words tokens
#[pyfunction]
fn tokenize(text: &str) -> Vec<String> {
    wordbag_core::tokenize(text)
}

/// Python-exposed frozen vocabulary
#[pyclass(name = "Vocabulary")]
pub struct Vocabulary {
    inner: CoreVocabulary,
}

#[pymethods]
impl Vocabulary {
    /// Build a vocabulary from training texts
    ///
    /// Args:
    ///     texts: Training documents
    ///     min_count: Minimum corpus-wide count for a term (default: 5)
    ///     max_features: Keep only this many of the most frequent terms
    #[staticmethod]
    #[pyo3(signature = (texts, min_count=5, max_features=None))]
    fn build(texts: Vec<String>, min_count: u64, max_features: Option<usize>) -> Self {
        let mut params = VocabularyParams::new(min_count);
        params.max_features = max_features;
        Self {
            inner: VocabularyBuilder::new(params).build(&texts),
        }
    }

    /// Fixed vocabulary from an explicit list of terms, in column order
    #[staticmethod]
    fn from_terms(terms: Vec<String>) -> PyResult<Self> {
        let inner = CoreVocabulary::from_terms(terms).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let inner = CoreVocabulary::from_json(json).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn to_json(&self) -> PyResult<String> {
        self.inner.to_json().map_err(to_py_err)
    }

    /// Column index of a term, or None when out of vocabulary
    fn index_of(&self, term: &str) -> Option<usize> {
        self.inner.index_of(term)
    }

    fn terms(&self) -> Vec<String> {
        self.inner.terms().map(String::from).collect()
    }

    /// List of (rank, term, count) tuples, most frequent first
    #[pyo3(signature = (top=None))]
    fn rank_frequencies(&self, top: Option<usize>) -> Vec<(usize, String, u64)> {
        self.inner
            .rank_frequencies()
            .take(top.unwrap_or(usize::MAX))
            .map(|(rank, term, count)| (rank, term.to_string(), count))
            .collect()
    }

    /// Encode texts as dense count rows
    ///
    /// Returns:
    ///     List of rows, each with one count per vocabulary term
    fn encode(&self, texts: Vec<String>) -> Vec<Vec<u32>> {
        encode(&texts, &self.inner).to_dense()
    }

    /// Encode texts as CSR components
    ///
    /// Returns:
    ///     (data, indices, indptr, shape), ready for scipy.sparse.csr_matrix
    fn encode_sparse(
        &self,
        texts: Vec<String>,
    ) -> (Vec<u32>, Vec<usize>, Vec<usize>, (usize, usize)) {
        let matrix = encode(&texts, &self.inner);
        let mut data = Vec::with_capacity(matrix.nnz());
        let mut indices = Vec::with_capacity(matrix.nnz());
        let mut indptr = Vec::with_capacity(matrix.n_rows() + 1);
        indptr.push(0);
        for row in matrix.rows() {
            for (col, count) in row.iter() {
                indices.push(col);
                data.push(count);
            }
            indptr.push(indices.len());
        }
        (data, indices, indptr, matrix.shape())
    }

    /// Get vocabulary statistics
    ///
    /// Returns:
    ///     Dictionary with num_docs, total_tokens, distinct_terms, vocab_size, min_count
    fn stats(&self) -> HashMap<String, PyObject> {
        let stats = self.inner.stats();
        Python::with_gil(|py| {
            let mut map = HashMap::new();
            map.insert("num_docs".to_string(), stats.num_docs.to_object(py));
            map.insert("total_tokens".to_string(), stats.total_tokens.to_object(py));
            map.insert("distinct_terms".to_string(), stats.distinct_terms.to_object(py));
            map.insert("vocab_size".to_string(), stats.vocab_size.to_object(py));
            map.insert("min_count".to_string(), stats.min_count.to_object(py));
            map
        })
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __contains__(&self, term: &str) -> bool {
        self.inner.index_of(term).is_some()
    }

    fn __repr__(&self) -> String {
        let stats = self.inner.stats();
        format!(
            "Vocabulary(vocab_size={}, num_docs={}, min_count={})",
            stats.vocab_size, stats.num_docs, stats.min_count
        )
    }
}

/// Python module
#[pymodule]
fn wordbag_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(tokenize, m)?)?;
    m.add_class::<Vocabulary>()?;
    Ok(())
}
