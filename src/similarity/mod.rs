//! Sparse item–item and user–user similarity.
//!
//! The engine treats every row of an entity × feature matrix as an entity and
//! produces a square similarity matrix over entities:
//!
//! - **Cosine**: `s(a, b) = a·b / (‖a‖‖b‖ + shrink)`, or `a·b / (1 + shrink)`
//!   without normalization (raw co-occurrence)
//! - **P3α**: three-node random walk entity → feature → entity with transition
//!   probabilities raised to `alpha`
//! - **RP3β**: P3α with each target divided by its popularity to the `beta`
//!
//! Each row is finished by [`knn::retain_top_k`]: the diagonal is excluded and
//! only the K largest-magnitude neighbours survive.
//!
//! # Quick Start
//!
//! ```
//! use recomendar::primitives::CooMatrix;
//! use recomendar::similarity::{compute_similarity, Axis, SimilarityConfig};
//!
//! // 3 playlists x 4 tracks
//! let urm = CooMatrix::from_triplets(3, 4, vec![
//!     (0, 0, 1.0), (0, 1, 1.0),
//!     (1, 0, 1.0), (1, 1, 1.0), (1, 2, 1.0),
//!     (2, 2, 1.0), (2, 3, 1.0),
//! ]).expect("in bounds").to_csr();
//!
//! let config = SimilarityConfig::default().with_k(2).with_shrink(0.0);
//! let sim = compute_similarity(&urm, Axis::Item, &config).expect("valid config");
//!
//! assert_eq!(sim.shape(), (4, 4));
//! assert_eq!(sim.get(0, 0), 0.0);
//! assert!(sim.get(0, 1) > sim.get(0, 2));
//! ```

pub mod knn;
mod svd;
mod weighting;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecomendarError, Result};
use crate::primitives::CsrMatrix;

pub use svd::{item_svd_similarity, SvdConfig};
pub use weighting::Weighting;

/// Which side of the interaction matrix provides the entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Columns (tracks) are entities, playlists are their features.
    Item,
    /// Rows (playlists) are entities, tracks are their features.
    User,
}

/// Similarity function between two entity vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine with additive shrinkage.
    #[default]
    Cosine,
    /// Random walk with transition probabilities raised to `alpha`.
    P3Alpha {
        /// Hub suppression exponent
        alpha: f32,
    },
    /// P3α with popularity penalty `pop^beta` on the target entity.
    #[serde(rename = "rp3_beta")]
    RP3Beta {
        /// Hub suppression exponent
        alpha: f32,
        /// Popularity penalty exponent
        beta: f32,
    },
}

impl SimilarityMetric {
    fn is_graph(&self) -> bool {
        !matches!(self, Self::Cosine)
    }
}

/// Configuration of one similarity computation.
///
/// # Examples
///
/// ```
/// use recomendar::similarity::{SimilarityConfig, SimilarityMetric, Weighting};
///
/// let config = SimilarityConfig::default()
///     .with_k(100)
///     .with_shrink(5.0)
///     .with_weighting(Weighting::TfIdf)
///     .with_metric(SimilarityMetric::Cosine);
/// assert!(config.validate().is_ok());
/// assert!(config.with_k(0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Neighbours kept per row
    pub k: usize,
    /// Constant added to the cosine denominator
    pub shrink: f32,
    /// Cosine: divide by the norm product. Graph metrics: L1-normalize rows after truncation.
    pub normalize: bool,
    /// Similarity function
    pub metric: SimilarityMetric,
    /// Feature reweighting before the dot products
    pub weighting: Weighting,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            k: 150,
            shrink: 10.0,
            normalize: true,
            metric: SimilarityMetric::Cosine,
            weighting: Weighting::None,
        }
    }
}

impl SimilarityConfig {
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    #[must_use]
    pub fn with_shrink(mut self, shrink: f32) -> Self {
        self.shrink = shrink;
        self
    }

    #[must_use]
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Rejects invalid parameters before any computation.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] if `k == 0`, shrink
    /// is negative or non-finite, or a metric/weighting parameter is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(RecomendarError::invalid("k", self.k, "> 0"));
        }
        if !self.shrink.is_finite() || self.shrink < 0.0 {
            return Err(RecomendarError::invalid("shrink", self.shrink, ">= 0 and finite"));
        }
        match self.metric {
            SimilarityMetric::Cosine => {}
            SimilarityMetric::P3Alpha { alpha } => check_exponent("alpha", alpha)?,
            SimilarityMetric::RP3Beta { alpha, beta } => {
                check_exponent("alpha", alpha)?;
                check_exponent("beta", beta)?;
            }
        }
        self.weighting.validate()
    }
}

fn check_exponent(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(RecomendarError::invalid(name, value, ">= 0 and finite"));
    }
    Ok(())
}

/// Similarity between the rows or columns of an interaction matrix.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn compute_similarity(
    interactions: &CsrMatrix,
    axis: Axis,
    config: &SimilarityConfig,
) -> Result<CsrMatrix> {
    match axis {
        Axis::Item => compute_row_similarity(&interactions.transpose(), config),
        Axis::User => compute_row_similarity(interactions, config),
    }
}

/// Similarity between the rows of an entity × feature matrix.
///
/// Used directly for content-based similarity over a track attribute matrix.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn compute_row_similarity(entities: &CsrMatrix, config: &SimilarityConfig) -> Result<CsrMatrix> {
    config.validate()?;

    let n = entities.nrows();
    let weighted = config.weighting.apply(entities);

    let rows = match config.metric {
        SimilarityMetric::Cosine => cosine_rows(&weighted, config.k, config.shrink, config.normalize),
        SimilarityMetric::P3Alpha { alpha } => graph_rows(&weighted, config.k, alpha, 0.0),
        SimilarityMetric::RP3Beta { alpha, beta } => graph_rows(&weighted, config.k, alpha, beta),
    };

    let mut similarity = CsrMatrix::from_rows(n, rows)?;
    if config.metric.is_graph() && config.normalize {
        similarity = similarity.row_normalized_l1();
    }

    debug!(
        entities = n,
        features = entities.ncols(),
        nnz = similarity.nnz(),
        bytes = similarity.memory_bytes(),
        k = config.k,
        metric = ?config.metric,
        "similarity matrix built"
    );
    Ok(similarity)
}

fn cosine_rows(entities: &CsrMatrix, k: usize, shrink: f32, normalize: bool) -> Vec<Vec<(usize, f32)>> {
    let n = entities.nrows();
    let features = entities.transpose();
    let norms: Vec<f32> = (0..n).map(|e| entities.row(e).norm()).collect();

    collect_rows(
        n,
        || RowAccumulator::new(n),
        |acc, a| {
            acc.accumulate(entities, &features, a);
            let mut row = acc.drain(|b, dot| {
                let denom = if normalize {
                    norms[a] * norms[b] + shrink
                } else {
                    1.0 + shrink
                };
                if denom > 0.0 {
                    dot / denom
                } else {
                    0.0
                }
            });
            knn::retain_top_k(&mut row, k, Some(a));
            row
        },
    )
}

fn graph_rows(entities: &CsrMatrix, k: usize, alpha: f32, beta: f32) -> Vec<Vec<(usize, f32)>> {
    let n = entities.nrows();
    let to_feature = entities
        .row_normalized_l1()
        .map_entries(|_, _, p| p.powf(alpha));
    let to_entity = entities
        .transpose()
        .row_normalized_l1()
        .map_entries(|_, _, p| p.powf(alpha));
    let penalty: Vec<f32> = (0..n)
        .map(|e| {
            let degree = entities.row_nnz(e) as f32;
            if degree > 0.0 && beta > 0.0 {
                degree.powf(-beta)
            } else {
                1.0
            }
        })
        .collect();

    collect_rows(
        n,
        || RowAccumulator::new(n),
        |acc, a| {
            acc.accumulate(&to_feature, &to_entity, a);
            let mut row = acc.drain(|b, walk| walk * penalty[b]);
            knn::retain_top_k(&mut row, k, Some(a));
            row
        },
    )
}

/// Builds `n` rows, in parallel when the `parallel` feature is on.
///
/// `init` creates per-worker scratch state reused across that worker's rows.
pub(crate) fn collect_rows<S, I, F>(n: usize, init: I, row_fn: F) -> Vec<Vec<(usize, f32)>>
where
    I: Fn() -> S + Sync + Send,
    F: Fn(&mut S, usize) -> Vec<(usize, f32)> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<(usize, f32)>> = (0..n)
        .into_par_iter()
        .map_init(init, |s, r| row_fn(s, r))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<(usize, f32)>> = {
        let mut scratch = init();
        (0..n).map(|r| row_fn(&mut scratch, r)).collect()
    };

    rows
}

/// Dense scratch row for one row of a sparse × sparse product.
struct RowAccumulator {
    values: Vec<f32>,
    seen: Vec<bool>,
    touched: Vec<usize>,
}

impl RowAccumulator {
    fn new(width: usize) -> Self {
        Self {
            values: vec![0.0; width],
            seen: vec![false; width],
            touched: Vec::new(),
        }
    }

    /// Accumulates row `row` of `left · right`.
    fn accumulate(&mut self, left: &CsrMatrix, right: &CsrMatrix, row: usize) {
        for (mid, l) in left.row(row).iter() {
            for (col, r) in right.row(mid).iter() {
                if !self.seen[col] {
                    self.seen[col] = true;
                    self.touched.push(col);
                }
                self.values[col] += l * r;
            }
        }
    }

    /// Emits `(col, f(col, value))` for every touched column and resets.
    fn drain<F: FnMut(usize, f32) -> f32>(&mut self, mut f: F) -> Vec<(usize, f32)> {
        let mut out = Vec::with_capacity(self.touched.len());
        for &col in &self.touched {
            out.push((col, f(col, self.values[col])));
            self.values[col] = 0.0;
            self.seen[col] = false;
        }
        self.touched.clear();
        out
    }
}

#[cfg(test)]
#[path = "similarity_tests.rs"]
mod tests;
