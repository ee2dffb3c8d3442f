//! K-nearest-neighbour truncation with self exclusion.
//!
//! Every producer of a model matrix (cosine and graph similarities, item SVD,
//! SLIM-BPR after training) finishes each row through [`retain_top_k`], so
//! the invariant "at most K entries per row, no diagonal" has one home.

use std::cmp::Ordering;

use crate::error::Result;
use crate::primitives::CsrMatrix;

/// Orders by descending magnitude, then ascending index.
fn by_magnitude(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.abs().total_cmp(&a.1.abs()).then(a.0.cmp(&b.0))
}

/// Keeps the `k` largest-magnitude entries of `row`, sorted by index.
///
/// Entries at `exclude` (the row's own entity), zeros and non-finite values
/// are removed before selection. Equal magnitudes keep the smaller index.
///
/// # Examples
///
/// ```
/// use recomendar::similarity::knn::retain_top_k;
///
/// let mut row = vec![(0, 0.5), (1, 9.0), (2, -0.9), (3, 0.5), (4, 0.1)];
/// retain_top_k(&mut row, 3, Some(1));
/// assert_eq!(row, vec![(0, 0.5), (2, -0.9), (3, 0.5)]);
/// ```
pub fn retain_top_k(row: &mut Vec<(usize, f32)>, k: usize, exclude: Option<usize>) {
    row.retain(|&(idx, val)| Some(idx) != exclude && val != 0.0 && val.is_finite());

    if k == 0 {
        row.clear();
        return;
    }
    if row.len() > k {
        // O(n) partition, then drop the tail
        row.select_nth_unstable_by(k - 1, by_magnitude);
        row.truncate(k);
    }
    row.sort_unstable_by_key(|&(idx, _)| idx);
}

/// Applies [`retain_top_k`] to every row of a square or rectangular matrix.
///
/// With `exclude_self`, entry `(r, r)` is dropped from row `r`.
///
/// # Errors
///
/// Never fails for a well-formed matrix; the `Result` mirrors
/// [`CsrMatrix::from_rows`].
pub fn prune_rows(matrix: &CsrMatrix, k: usize, exclude_self: bool) -> Result<CsrMatrix> {
    let rows: Vec<Vec<(usize, f32)>> = (0..matrix.nrows())
        .map(|r| {
            let mut row: Vec<(usize, f32)> = matrix.row(r).iter().collect();
            retain_top_k(&mut row, k, exclude_self.then_some(r));
            row
        })
        .collect();
    CsrMatrix::from_rows(matrix.ncols(), rows)
}
