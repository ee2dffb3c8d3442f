//! SLIM with an ElasticNet objective, solved per target item by coordinate
//! descent.
//!
//! For every target item `j` the column `x_j` of the interaction matrix is
//! regressed on all other columns:
//!
//! ```text
//! minimize  1/(2n) ‖x_j − X w‖² + α·ρ·‖w‖₁ + ½·α·(1 − ρ)·‖w‖²
//! subject to w_j = 0  (and w ≥ 0 when positive_only)
//! ```
//!
//! The solver works on the item Gram matrix `G = XᵀX` and keeps the residual
//! correlation `r = G_j − G w` up to date, so a coordinate step costs one
//! sparse row of `G`. With non-negative interactions and `positive_only`, a
//! coordinate whose item never co-occurs with `j` stays at zero, and only the
//! co-occurring items are visited.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RecomendarError, Result};
use crate::primitives::CsrMatrix;
use crate::similarity::{collect_rows, knn};

/// SLIM ElasticNet hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticNetConfig {
    /// Weights kept per target item
    pub top_k: usize,
    /// Overall regularization strength
    pub alpha: f32,
    /// Mix between L1 and L2 (0.0 = ridge, 1.0 = lasso)
    pub l1_ratio: f32,
    /// Clamp weights at zero
    pub positive_only: bool,
    /// Passes over the coordinates per target
    pub max_iter: usize,
    /// Stop once no weight moves by more than this
    pub tol: f32,
}

impl Default for ElasticNetConfig {
    fn default() -> Self {
        Self {
            top_k: 250,
            alpha: 1e-4,
            l1_ratio: 1.0,
            positive_only: true,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

impl ElasticNetConfig {
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    #[must_use]
    pub fn with_l1_ratio(mut self, l1_ratio: f32) -> Self {
        self.l1_ratio = l1_ratio;
        self
    }

    #[must_use]
    pub fn with_positive_only(mut self, positive_only: bool) -> Self {
        self.positive_only = positive_only;
        self
    }

    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] for `top_k` or
    /// `max_iter` of 0, a negative or non-finite `alpha` or `tol`, or an
    /// `l1_ratio` outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RecomendarError::invalid("top_k", self.top_k, "> 0"));
        }
        if self.max_iter == 0 {
            return Err(RecomendarError::invalid("max_iter", self.max_iter, "> 0"));
        }
        for (name, value) in [("alpha", self.alpha), ("tol", self.tol)] {
            if !value.is_finite() || value < 0.0 {
                return Err(RecomendarError::invalid(name, value, ">= 0 and finite"));
            }
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(RecomendarError::invalid("l1_ratio", self.l1_ratio, "in [0, 1]"));
        }
        Ok(())
    }

    /// Fits one regression per item and returns the pruned source × target
    /// weight matrix.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] for an invalid
    /// configuration.
    pub fn fit(&self, urm: &CsrMatrix) -> Result<CsrMatrix> {
        self.validate()?;

        let n_items = urm.ncols();
        let gram = urm.transpose().matmul(urm)?;
        let diag: Vec<f32> = (0..n_items).map(|k| gram.get(k, k)).collect();
        let n = urm.nrows().max(1) as f32;
        let penalty = Penalty {
            l1: n * self.alpha * self.l1_ratio,
            l2: n * self.alpha * (1.0 - self.l1_ratio),
        };
        info!(
            playlists = urm.nrows(),
            items = n_items,
            alpha = self.alpha,
            l1_ratio = self.l1_ratio,
            positive_only = self.positive_only,
            "training SLIM ElasticNet"
        );

        let rows = collect_rows(
            n_items,
            || Scratch::new(n_items),
            |scratch, target| {
                let mut row = scratch.solve(&gram, &diag, target, penalty, self);
                knn::retain_top_k(&mut row, self.top_k, Some(target));
                row
            },
        );

        let weights = CsrMatrix::from_rows(n_items, rows)?.transpose();
        debug!(nnz = weights.nnz(), top_k = self.top_k, "SLIM ElasticNet weights pruned");
        Ok(weights)
    }
}

/// Penalties scaled by the number of playlists.
#[derive(Debug, Clone, Copy)]
struct Penalty {
    l1: f32,
    l2: f32,
}

/// Per-worker dense buffers, reset after every target.
struct Scratch {
    residual: Vec<f32>,
    weight: Vec<f32>,
    marked: Vec<bool>,
    touched: Vec<usize>,
}

impl Scratch {
    fn new(n_items: usize) -> Self {
        Self {
            residual: vec![0.0; n_items],
            weight: vec![0.0; n_items],
            marked: vec![false; n_items],
            touched: Vec::new(),
        }
    }

    fn add_residual(&mut self, item: usize, delta: f32) {
        if !self.marked[item] {
            self.marked[item] = true;
            self.touched.push(item);
        }
        self.residual[item] += delta;
    }

    /// Coordinate descent for one target; returns its `(source, weight)` pairs.
    fn solve(
        &mut self,
        gram: &CsrMatrix,
        diag: &[f32],
        target: usize,
        penalty: Penalty,
        config: &ElasticNetConfig,
    ) -> Vec<(usize, f32)> {
        for (item, g) in gram.row(target).iter() {
            self.add_residual(item, g);
        }
        let candidates: Vec<usize> = if config.positive_only {
            gram.row(target)
                .indices()
                .iter()
                .copied()
                .filter(|&k| k != target)
                .collect()
        } else {
            (0..diag.len()).filter(|&k| k != target).collect()
        };

        for _ in 0..config.max_iter {
            let mut max_change = 0.0f32;
            for &k in &candidates {
                if diag[k] <= 0.0 {
                    continue;
                }
                let old = self.weight[k];
                let rho = self.residual[k] + diag[k] * old;
                let mut new = soft_threshold(rho, penalty.l1) / (diag[k] + penalty.l2);
                if config.positive_only {
                    new = new.max(0.0);
                }
                let delta = new - old;
                if delta == 0.0 {
                    continue;
                }
                self.weight[k] = new;
                for (item, g) in gram.row(k).iter() {
                    self.add_residual(item, -delta * g);
                }
                max_change = max_change.max(delta.abs());
            }
            if max_change <= config.tol {
                break;
            }
        }

        let row = candidates
            .iter()
            .map(|&k| (k, std::mem::take(&mut self.weight[k])))
            .collect();
        for &item in &self.touched {
            self.residual[item] = 0.0;
            self.marked[item] = false;
        }
        self.touched.clear();
        row
    }
}

/// `sign(x)·max(|x| − λ, 0)`.
fn soft_threshold(x: f32, lambda: f32) -> f32 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

#[cfg(test)]
#[path = "elastic_tests.rs"]
mod tests;
