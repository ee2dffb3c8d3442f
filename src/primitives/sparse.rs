//! Compressed sparse matrices for interaction, similarity and weight data.
//!
//! # Supported Formats
//! - **COO** (Coordinate): simple format, used to assemble raw interaction triples
//! - **CSR** (Compressed Sparse Row): row slicing and vector × matrix products
//!
//! The column-compressed view of a matrix is the CSR of its transpose, so
//! [`CsrMatrix::transpose`] is the only conversion needed for column slicing.

use serde::{Deserialize, Serialize};

use crate::error::{RecomendarError, Result};

/// Borrowed view of one sparse row: parallel index/value slices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseVec<'a> {
    indices: &'a [usize],
    values: &'a [f32],
}

impl<'a> SparseVec<'a> {
    /// Creates a sparse vector view.
    ///
    /// # Panics
    ///
    /// Panics if `indices` and `values` have different lengths.
    #[must_use]
    pub fn new(indices: &'a [usize], values: &'a [f32]) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "sparse vector indices and values must have same length"
        );
        Self { indices, values }
    }

    /// Column indices of the stored entries, strictly increasing.
    #[must_use]
    pub fn indices(&self) -> &'a [usize] {
        self.indices
    }

    /// Stored values, parallel to [`Self::indices`].
    #[must_use]
    pub fn values(&self) -> &'a [f32] {
        self.values
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Returns true when the row has no stored entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates `(index, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + 'a {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Euclidean norm of the stored values.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Returns true if `index` is stored in this row.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }
}

/// Coordinate (COO) sparse matrix, used as an assembly buffer.
///
/// # Examples
///
/// ```
/// use recomendar::primitives::CooMatrix;
///
/// let mut coo = CooMatrix::new(2, 3);
/// coo.push(0, 2, 1.0).expect("in bounds");
/// coo.push(1, 0, 1.0).expect("in bounds");
/// coo.push(0, 2, 1.0).expect("duplicates are summed");
///
/// let csr = coo.to_csr();
/// assert_eq!(csr.nnz(), 2);
/// assert_eq!(csr.get(0, 2), 2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CooMatrix {
    values: Vec<f32>,
    row_indices: Vec<usize>,
    col_indices: Vec<usize>,
    nrows: usize,
    ncols: usize,
}

impl CooMatrix {
    /// Creates an empty COO matrix of the given shape.
    #[must_use]
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            values: Vec::new(),
            row_indices: Vec::new(),
            col_indices: Vec::new(),
            nrows,
            ncols,
        }
    }

    /// Builds a COO matrix from `(row, col, value)` triples.
    ///
    /// # Errors
    ///
    /// Returns an error if any triple lies outside the shape.
    pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f32)>,
    {
        let mut coo = Self::new(nrows, ncols);
        for (row, col, value) in triplets {
            coo.push(row, col, value)?;
        }
        Ok(coo)
    }

    /// Adds an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if `(row, col)` is outside the shape.
    pub fn push(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        if row >= self.nrows || col >= self.ncols {
            return Err(RecomendarError::mismatch(
                format!("index within {}x{}", self.nrows, self.ncols),
                format!("({row}, {col})"),
            ));
        }
        self.values.push(value);
        self.row_indices.push(row);
        self.col_indices.push(col);
        Ok(())
    }

    /// Number of stored triples (duplicates counted separately).
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Converts to CSR, summing duplicate coordinates.
    #[must_use]
    pub fn to_csr(&self) -> CsrMatrix {
        let mut entries: Vec<(usize, usize, f32)> = self
            .row_indices
            .iter()
            .zip(self.col_indices.iter())
            .zip(self.values.iter())
            .map(|((&r, &c), &v)| (r, c, v))
            .collect();
        entries.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut values: Vec<f32> = Vec::with_capacity(entries.len());
        let mut col_indices: Vec<usize> = Vec::with_capacity(entries.len());
        let mut row_ptrs = vec![0usize; self.nrows + 1];
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in entries {
            if last == Some((row, col)) {
                if let Some(v) = values.last_mut() {
                    *v += val;
                }
                continue;
            }
            values.push(val);
            col_indices.push(col);
            row_ptrs[row + 1] += 1;
            last = Some((row, col));
        }

        // Convert counts to cumulative pointers
        for i in 1..row_ptrs.len() {
            row_ptrs[i] += row_ptrs[i - 1];
        }

        CsrMatrix {
            values,
            col_indices,
            row_ptrs,
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

/// Compressed Sparse Row (CSR) matrix.
///
/// # Memory Layout
/// For a matrix with `nnz` non-zeros and `nrows` rows:
/// - `values`: \[nnz\] - stored values in row-major order
/// - `col_indices`: \[nnz\] - column index for each value, strictly increasing within a row
/// - `row_ptrs`: \[nrows + 1\] - start of each row in `values`/`col_indices`
///
/// ```text
/// Dense:     [[1, 0, 2],    CSR:
///             [0, 0, 3],    values: [1, 2, 3, 4]
///             [4, 0, 0]]    col_indices: [0, 2, 2, 0]
///                           row_ptrs: [0, 2, 3, 4]
/// ```
///
/// Deserialization goes through [`CsrMatrix::new`], so a decoded matrix
/// satisfies the same invariants as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCsr")]
pub struct CsrMatrix {
    values: Vec<f32>,
    col_indices: Vec<usize>,
    row_ptrs: Vec<usize>,
    nrows: usize,
    ncols: usize,
}

/// Unchecked wire form of [`CsrMatrix`]; fields in the same order.
#[derive(Deserialize)]
struct RawCsr {
    values: Vec<f32>,
    col_indices: Vec<usize>,
    row_ptrs: Vec<usize>,
    nrows: usize,
    ncols: usize,
}

impl TryFrom<RawCsr> for CsrMatrix {
    type Error = RecomendarError;

    fn try_from(raw: RawCsr) -> Result<Self> {
        Self::new(raw.values, raw.col_indices, raw.row_ptrs, raw.nrows, raw.ncols)
    }
}

impl CsrMatrix {
    /// Creates a CSR matrix from raw components.
    ///
    /// # Errors
    ///
    /// Returns an error if the arrays are inconsistent, a column index is out
    /// of bounds, or the column indices of a row are not strictly increasing.
    pub fn new(
        values: Vec<f32>,
        col_indices: Vec<usize>,
        row_ptrs: Vec<usize>,
        nrows: usize,
        ncols: usize,
    ) -> Result<Self> {
        if values.len() != col_indices.len() {
            return Err(RecomendarError::mismatch(
                format!("col_indices length {}", values.len()),
                format!("{}", col_indices.len()),
            ));
        }
        if Some(row_ptrs.len()) != nrows.checked_add(1) {
            return Err(RecomendarError::mismatch(
                format!("row_ptrs length of nrows + 1 for {nrows} rows"),
                format!("{}", row_ptrs.len()),
            ));
        }
        if row_ptrs.first() != Some(&0) || row_ptrs.last() != Some(&values.len()) {
            return Err(RecomendarError::Other(
                "row_ptrs must start at 0 and end at nnz".to_string(),
            ));
        }
        for row in 0..nrows {
            let (start, end) = (row_ptrs[row], row_ptrs[row + 1]);
            if end < start || end > values.len() {
                return Err(RecomendarError::Other(format!(
                    "row_ptrs not monotonic within nnz at row {row}: {start}..{end}"
                )));
            }
            let cols = &col_indices[start..end];
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(RecomendarError::Other(format!(
                    "column indices of row {row} are not strictly increasing"
                )));
            }
            if let Some(&col) = cols.last() {
                if col >= ncols {
                    return Err(RecomendarError::mismatch(
                        format!("col_index < {ncols}"),
                        format!("{col}"),
                    ));
                }
            }
        }

        Ok(Self {
            values,
            col_indices,
            row_ptrs,
            nrows,
            ncols,
        })
    }

    /// Creates an all-zero matrix.
    #[must_use]
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            values: Vec::new(),
            col_indices: Vec::new(),
            row_ptrs: vec![0; nrows + 1],
            nrows,
            ncols,
        }
    }

    /// Creates a CSR matrix from row-major dense data, dropping zeros.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != nrows * ncols`.
    pub fn from_dense(nrows: usize, ncols: usize, data: &[f32]) -> Result<Self> {
        if data.len() != nrows * ncols {
            return Err(RecomendarError::mismatch(
                format!("{} values ({nrows}x{ncols})", nrows * ncols),
                format!("{} values", data.len()),
            ));
        }

        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_ptrs = vec![0];

        for row in data.chunks(ncols.max(1)).take(nrows) {
            for (col, &val) in row.iter().enumerate() {
                if val != 0.0 {
                    values.push(val);
                    col_indices.push(col);
                }
            }
            row_ptrs.push(values.len());
        }
        // ncols == 0: chunks yields nothing, pad empty rows
        row_ptrs.resize(nrows + 1, values.len());

        Ok(Self {
            values,
            col_indices,
            row_ptrs,
            nrows,
            ncols,
        })
    }

    /// Creates a CSR matrix from per-row `(col, value)` lists.
    ///
    /// Rows may be unsorted; duplicate columns within a row are summed and
    /// explicit zeros are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a column index is `>= ncols`.
    pub fn from_rows(ncols: usize, rows: Vec<Vec<(usize, f32)>>) -> Result<Self> {
        let nrows = rows.len();
        let nnz_hint: usize = rows.iter().map(Vec::len).sum();
        let mut values = Vec::with_capacity(nnz_hint);
        let mut col_indices = Vec::with_capacity(nnz_hint);
        let mut row_ptrs = Vec::with_capacity(nrows + 1);
        row_ptrs.push(0);

        for mut row in rows {
            row.sort_unstable_by_key(|&(col, _)| col);
            let row_start = values.len();
            for (col, val) in row {
                if col >= ncols {
                    return Err(RecomendarError::mismatch(
                        format!("col_index < {ncols}"),
                        format!("{col}"),
                    ));
                }
                if col_indices.len() > row_start && col_indices.last() == Some(&col) {
                    if let Some(v) = values.last_mut() {
                        *v += val;
                    }
                } else {
                    values.push(val);
                    col_indices.push(col);
                }
            }
            // Drop zeros produced by cancellation or given explicitly
            let mut write = row_start;
            for read in row_start..values.len() {
                if values[read] != 0.0 {
                    values[write] = values[read];
                    col_indices[write] = col_indices[read];
                    write += 1;
                }
            }
            values.truncate(write);
            col_indices.truncate(write);
            row_ptrs.push(values.len());
        }

        Ok(Self {
            values,
            col_indices,
            row_ptrs,
            nrows,
            ncols,
        })
    }

    /// Converts to row-major dense storage.
    #[must_use]
    pub fn to_dense(&self) -> Vec<f32> {
        let mut data = vec![0.0f32; self.nrows * self.ncols];
        for row in 0..self.nrows {
            for (col, val) in self.row(row).iter() {
                data[row * self.ncols + col] = val;
            }
        }
        data
    }

    /// Shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Number of rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Fraction of stored entries over the full shape.
    #[must_use]
    pub fn density(&self) -> f32 {
        let total = self.nrows * self.ncols;
        if total == 0 {
            return 0.0;
        }
        self.nnz() as f32 / total as f32
    }

    /// Borrow of row `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= nrows`.
    #[must_use]
    pub fn row(&self, row: usize) -> SparseVec<'_> {
        let (start, end) = (self.row_ptrs[row], self.row_ptrs[row + 1]);
        SparseVec::new(&self.col_indices[start..end], &self.values[start..end])
    }

    /// Number of stored entries in row `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= nrows`.
    #[must_use]
    pub fn row_nnz(&self, row: usize) -> usize {
        self.row_ptrs[row + 1] - self.row_ptrs[row]
    }

    /// Value at (row, col), or 0 if not stored or out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        if row >= self.nrows || col >= self.ncols {
            return 0.0;
        }
        let r = self.row(row);
        r.indices()
            .binary_search(&col)
            .map_or(0.0, |idx| r.values()[idx])
    }

    /// Iterates all stored `(row, col, value)` triples in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        (0..self.nrows).flat_map(move |row| self.row(row).iter().map(move |(c, v)| (row, c, v)))
    }

    /// Transposes the matrix (CSR of the transpose = CSC of `self`).
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut row_ptrs = vec![0usize; self.ncols + 1];
        for &col in &self.col_indices {
            row_ptrs[col + 1] += 1;
        }
        for i in 1..row_ptrs.len() {
            row_ptrs[i] += row_ptrs[i - 1];
        }

        let mut next = row_ptrs.clone();
        let mut col_indices = vec![0usize; self.nnz()];
        let mut values = vec![0.0f32; self.nnz()];
        // Rows are visited in increasing order, so each output row stays sorted
        for (row, col, val) in self.iter() {
            let slot = next[col];
            col_indices[slot] = row;
            values[slot] = val;
            next[col] += 1;
        }

        Self {
            values,
            col_indices,
            row_ptrs,
            nrows: self.ncols,
            ncols: self.nrows,
        }
    }

    /// Sparse row vector times matrix: `y = xᵀ · A`, dense output of length `ncols`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` references an index `>= nrows`.
    pub fn vecmat(&self, x: SparseVec<'_>) -> Result<Vec<f32>> {
        if let Some(&max) = x.indices().last() {
            if max >= self.nrows {
                return Err(RecomendarError::mismatch(
                    format!("vector indices < {}", self.nrows),
                    format!("index {max}"),
                ));
            }
        }

        let mut y = vec![0.0f32; self.ncols];
        for (k, xk) in x.iter() {
            for (col, val) in self.row(k).iter() {
                y[col] += xk * val;
            }
        }
        Ok(y)
    }

    /// Sparse × sparse product (row-wise Gustavson accumulation).
    ///
    /// # Errors
    ///
    /// Returns an error if `self.ncols != other.nrows`.
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        if self.ncols != other.nrows {
            return Err(RecomendarError::mismatch(
                format!("left cols == right rows ({})", self.ncols),
                format!("{}", other.nrows),
            ));
        }

        let mut acc = vec![0.0f32; other.ncols];
        let mut touched: Vec<usize> = Vec::new();
        let mut marker = vec![false; other.ncols];
        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_ptrs = Vec::with_capacity(self.nrows + 1);
        row_ptrs.push(0);

        for row in 0..self.nrows {
            for (k, a) in self.row(row).iter() {
                for (col, b) in other.row(k).iter() {
                    if !marker[col] {
                        marker[col] = true;
                        touched.push(col);
                    }
                    acc[col] += a * b;
                }
            }
            touched.sort_unstable();
            for &col in &touched {
                if acc[col] != 0.0 {
                    values.push(acc[col]);
                    col_indices.push(col);
                }
                acc[col] = 0.0;
                marker[col] = false;
            }
            touched.clear();
            row_ptrs.push(values.len());
        }

        Ok(Self {
            values,
            col_indices,
            row_ptrs,
            nrows: self.nrows,
            ncols: other.ncols,
        })
    }

    /// Sum of each row.
    #[must_use]
    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.nrows)
            .map(|row| self.row(row).values().iter().sum())
            .collect()
    }

    /// Number of stored entries per column (item popularity for a URM).
    #[must_use]
    pub fn column_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.ncols];
        for &col in &self.col_indices {
            counts[col] += 1;
        }
        counts
    }

    /// Applies `f(row, col, value)` to every stored value, dropping results equal to zero.
    #[must_use]
    pub fn map_entries<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, usize, f32) -> f32,
    {
        let mut values = Vec::with_capacity(self.nnz());
        let mut col_indices = Vec::with_capacity(self.nnz());
        let mut row_ptrs = Vec::with_capacity(self.nrows + 1);
        row_ptrs.push(0);
        for row in 0..self.nrows {
            for (col, val) in self.row(row).iter() {
                let mapped = f(row, col, val);
                if mapped != 0.0 {
                    values.push(mapped);
                    col_indices.push(col);
                }
            }
            row_ptrs.push(values.len());
        }
        Self {
            values,
            col_indices,
            row_ptrs,
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }

    /// Replaces every stored value with 1.0.
    #[must_use]
    pub fn binarized(&self) -> Self {
        self.map_entries(|_, _, _| 1.0)
    }

    /// Divides each row by its sum (rows summing to zero are left untouched).
    #[must_use]
    pub fn row_normalized_l1(&self) -> Self {
        let sums = self.row_sums();
        self.map_entries(|row, _, val| {
            let s = sums[row];
            if s == 0.0 {
                val
            } else {
                val / s
            }
        })
    }

    /// Memory usage in bytes (approximate).
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.values.len() * size_of::<f32>()
            + self.col_indices.len() * size_of::<usize>()
            + self.row_ptrs.len() * size_of::<usize>()
    }
}

#[cfg(test)]
#[path = "sparse_tests.rs"]
mod tests;
