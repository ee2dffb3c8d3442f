//! PureSVD-style item similarity.
//!
//! The top right singular vectors `V_k` of the (optionally reweighted)
//! interaction matrix `X` give `S = V_k V_kᵀ`, which is then truncated to K
//! neighbours per item like every other similarity.
//!
//! `V_k` comes from a randomized range finder that only multiplies the sparse
//! `X` against thin dense blocks:
//!
//! ```text
//! Y = X Ω                     Ω: n_items × (n_factors + oversampling)
//! Q = qr(Y), then n_iter × { Q = qr(X (Xᵀ Q)) }
//! Xᵀ Q = V Σ Ũᵀ               thin SVD of an n_items × l block
//! ```
//!
//! Memory stays linear in the catalog size for a fixed rank.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{collect_rows, knn, Weighting};
use crate::error::{RecomendarError, Result};
use crate::primitives::CsrMatrix;

/// Configuration for [`item_svd_similarity`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvdConfig {
    /// Number of latent factors kept
    pub n_factors: usize,
    /// Neighbours kept per item
    pub k: usize,
    /// Reweighting of playlist vectors before the decomposition
    pub weighting: Weighting,
    /// Extra sketch columns beyond `n_factors`
    pub oversampling: usize,
    /// Power iterations sharpening the sketch
    pub n_iter: usize,
    /// Seed for the random test matrix
    pub random_state: u64,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            n_factors: 300,
            k: 150,
            weighting: Weighting::None,
            oversampling: 10,
            n_iter: 2,
            random_state: 42,
        }
    }
}

impl SvdConfig {
    #[must_use]
    pub fn with_n_factors(mut self, n_factors: usize) -> Self {
        self.n_factors = n_factors;
        self
    }

    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    #[must_use]
    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    #[must_use]
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] if `n_factors` or `k` is 0.
    pub fn validate(&self) -> Result<()> {
        if self.n_factors == 0 {
            return Err(RecomendarError::invalid("n_factors", self.n_factors, "> 0"));
        }
        if self.k == 0 {
            return Err(RecomendarError::invalid("k", self.k, "> 0"));
        }
        self.weighting.validate()
    }
}

/// Item × item similarity from a rank-`n_factors` truncated SVD of `X`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the small dense SVD
/// does not converge.
pub fn item_svd_similarity(interactions: &CsrMatrix, config: &SvdConfig) -> Result<CsrMatrix> {
    config.validate()?;

    let n_items = interactions.ncols();
    let x = config.weighting.apply(interactions);
    if x.nnz() == 0 {
        return Ok(CsrMatrix::zeros(n_items, n_items));
    }
    let xt = x.transpose();

    let factors = right_singular_vectors(&x, &xt, config)?;
    let rank = factors.ncols();
    // item-major copy so each row is a contiguous slice
    let factors: Vec<f32> = factors.transpose().as_slice().to_vec();

    let rows = collect_rows(
        n_items,
        || (),
        |(), i| {
            let vi = &factors[i * rank..(i + 1) * rank];
            let mut row: Vec<(usize, f32)> = (0..n_items)
                .map(|j| {
                    let vj = &factors[j * rank..(j + 1) * rank];
                    (j, vi.iter().zip(vj).map(|(a, b)| a * b).sum())
                })
                .collect();
            knn::retain_top_k(&mut row, config.k, Some(i));
            row
        },
    );

    let similarity = CsrMatrix::from_rows(n_items, rows)?;
    debug!(
        items = n_items,
        rank,
        nnz = similarity.nnz(),
        k = config.k,
        "item SVD similarity built"
    );
    Ok(similarity)
}

/// `V_k` (n_items × rank) with numerically null directions dropped.
fn right_singular_vectors(
    x: &CsrMatrix,
    xt: &CsrMatrix,
    config: &SvdConfig,
) -> Result<DMatrix<f32>> {
    let n_items = x.ncols();
    let width = (config.n_factors + config.oversampling)
        .min(n_items)
        .min(x.nrows());

    let mut rng = StdRng::seed_from_u64(config.random_state);
    let omega = DMatrix::from_fn(n_items, width, |_, _| rng.gen_range(-1.0f32..1.0));

    let mut q = sparse_times_dense(x, &omega).qr().q();
    for _ in 0..config.n_iter {
        let z = sparse_times_dense(xt, &q).qr().q();
        q = sparse_times_dense(x, &z).qr().q();
    }

    // Xᵀ Q = (Qᵀ X)ᵀ; its left singular vectors are X's right ones
    let projected = sparse_times_dense(xt, &q);
    let svd = projected.svd(true, false);
    let v = svd
        .u
        .ok_or_else(|| RecomendarError::Other("item SVD did not produce singular vectors".into()))?;
    let sigma = svd.singular_values;

    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]).then(a.cmp(&b)));
    let cutoff = order.first().map_or(0.0, |&top| sigma[top] * sigma[top] * 1e-5);
    let kept: Vec<usize> = order
        .into_iter()
        .take(config.n_factors)
        .filter(|&idx| sigma[idx] * sigma[idx] > cutoff)
        .collect();

    Ok(DMatrix::from_fn(n_items, kept.len(), |item, f| v[(item, kept[f])]))
}

/// Sparse `a` times dense `b`, row by row.
fn sparse_times_dense(a: &CsrMatrix, b: &DMatrix<f32>) -> DMatrix<f32> {
    let mut out = DMatrix::zeros(a.nrows(), b.ncols());
    for r in 0..a.nrows() {
        for (c, value) in a.row(r).iter() {
            for col in 0..b.ncols() {
                out[(r, col)] += value * b[(c, col)];
            }
        }
    }
    out
}
