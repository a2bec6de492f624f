//! Sparse document-term count matrix (CSR layout)

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use sprs::CsMat;

use crate::codec;
use crate::error::Result;

/// One row per document, one column per vocabulary term.
///
/// Stored row-compressed: `indptr[i]..indptr[i + 1]` spans the non-zero
/// entries of row `i`, with column indices strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTermMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    counts: Vec<u32>,
    /// Fingerprint of the vocabulary the rows were encoded against
    fingerprint: Option<u64>,
}

/// Borrowed view of a single matrix row
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    n_cols: usize,
    indices: &'a [usize],
    counts: &'a [u32],
}

impl<'a> RowView<'a> {
    /// Non-zero `(column, count)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + 'a {
        let (indices, counts) = (self.indices, self.counts);
        indices.iter().copied().zip(counts.iter().copied())
    }

    /// Count in `col`, zero when absent
    pub fn get(&self, col: usize) -> u32 {
        self.indices
            .binary_search(&col)
            .map(|pos| self.counts[pos])
            .unwrap_or(0)
    }

    /// Total in-vocabulary tokens of the document
    pub fn sum(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Full-width row
    pub fn to_dense(&self) -> Vec<u32> {
        let mut dense = vec![0; self.n_cols];
        for (col, count) in self.iter() {
            dense[col] = count;
        }
        dense
    }
}

impl DocumentTermMatrix {
    /// Empty matrix with no rows
    pub fn empty(n_cols: usize) -> Self {
        Self {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            counts: Vec::new(),
            fingerprint: None,
        }
    }

    /// Assemble from per-row entries already sorted by column.
    pub(crate) fn from_sorted_rows(
        n_cols: usize,
        rows: Vec<Vec<(usize, u32)>>,
        fingerprint: Option<u64>,
    ) -> Self {
        let nnz = rows.iter().map(Vec::len).sum();
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut counts = Vec::with_capacity(nnz);
        indptr.push(0);
        for row in rows {
            for (col, count) in row {
                indices.push(col);
                counts.push(count);
            }
            indptr.push(indices.len());
        }
        Self {
            n_cols,
            indptr,
            indices,
            counts,
            fingerprint,
        }
    }

    /// Number of documents
    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Number of vocabulary terms
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols)
    }

    /// Number of stored non-zero entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Fingerprint of the encoding vocabulary, if known
    pub fn fingerprint(&self) -> Option<u64> {
        self.fingerprint
    }

    /// View of one document row
    pub fn row(&self, row: usize) -> Option<RowView<'_>> {
        if row >= self.n_rows() {
            return None;
        }
        let span = self.indptr[row]..self.indptr[row + 1];
        Some(RowView {
            n_cols: self.n_cols,
            indices: &self.indices[span.clone()],
            counts: &self.counts[span],
        })
    }

    /// All rows in document order
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        (0..self.n_rows()).filter_map(move |i| self.row(i))
    }

    /// Count at `(row, col)`; zero outside the stored entries
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.row(row).map(|r| r.get(col)).unwrap_or(0)
    }

    /// Dense rows, one count per column
    pub fn to_dense(&self) -> Vec<Vec<u32>> {
        self.rows().map(|r| r.to_dense()).collect()
    }

    /// Float CSR matrix for numeric classifiers
    pub fn to_csmat(&self) -> CsMat<f64> {
        CsMat::new(
            self.shape(),
            self.indptr.clone(),
            self.indices.clone(),
            self.counts.iter().map(|&c| f64::from(c)).collect(),
        )
    }

    /// Write the matrix in the binary `WBDT` format
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        codec::write_matrix(self, &mut writer)
    }

    /// Load a matrix written by [`save`](Self::save). The result carries no
    /// vocabulary fingerprint, so only its width is checked against a vocabulary.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        codec::read_matrix(&mut reader)
    }
}
