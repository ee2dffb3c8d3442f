//! Holdout splitting and offline evaluation of playlist recommenders.
//!
//! A [`Holdout`] picks a random subset of playlists and hides part of each
//! one's tracks. A recommender is then fitted on the remaining interactions
//! and [`evaluate_map`] scores how many hidden tracks it recovers in its top-K.
//!
//! ```
//! use recomendar::prelude::*;
//! use recomendar::model_selection::{evaluate_map, Holdout};
//!
//! let urm = CsrMatrix::from_dense(4, 6, &[
//!     1.0, 1.0, 1.0, 0.0, 0.0, 0.0,
//!     1.0, 1.0, 1.0, 0.0, 0.0, 0.0,
//!     0.0, 0.0, 0.0, 1.0, 1.0, 1.0,
//!     0.0, 0.0, 0.0, 1.0, 1.0, 1.0,
//! ]).unwrap();
//!
//! let split = Holdout::new().with_playlist_fraction(1.0).with_random_state(7).split(&urm).unwrap();
//! let rec = Recommender::fit(split.train.clone(), &ModelConfig::ItemCf(SimilarityConfig::default()), None).unwrap();
//! let metrics = evaluate_map(&rec, &split, 10).unwrap();
//! assert!(metrics.map > 0.0);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RecomendarError, Result};
use crate::metrics::RankingMetrics;
use crate::primitives::CsrMatrix;
use crate::traits::Recommend;

/// Train/test interactions produced by [`Holdout::split`].
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutSplit {
    /// Interactions visible to the recommender
    pub train: CsrMatrix,
    /// Hidden interactions, same shape as `train`
    pub test: CsrMatrix,
    /// Playlists with hidden interactions, ascending
    pub playlists: Vec<usize>,
}

/// Random per-playlist holdout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Holdout {
    /// Share of eligible playlists that get a test set
    pub playlist_fraction: f32,
    /// Share of a selected playlist's tracks that are hidden
    pub test_fraction: f32,
    /// Playlists with fewer tracks are never selected
    pub min_interactions: usize,
    /// Seed; `None` draws from the thread RNG
    pub random_state: Option<u64>,
}

impl Default for Holdout {
    fn default() -> Self {
        Self {
            playlist_fraction: 0.5,
            test_fraction: 0.2,
            min_interactions: 2,
            random_state: None,
        }
    }
}

impl Holdout {
    /// Half of the playlists, 20% of their tracks hidden.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_playlist_fraction(mut self, fraction: f32) -> Self {
        self.playlist_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_test_fraction(mut self, fraction: f32) -> Self {
        self.test_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_min_interactions(mut self, min: usize) -> Self {
        self.min_interactions = min;
        self
    }

    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] for fractions outside
    /// `(0, 1]` or `min_interactions < 2`.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("playlist_fraction", self.playlist_fraction),
            ("test_fraction", self.test_fraction),
        ] {
            if !(v > 0.0 && v <= 1.0) {
                return Err(RecomendarError::invalid(name, v, "in (0, 1]"));
            }
        }
        if self.min_interactions < 2 {
            return Err(RecomendarError::invalid(
                "min_interactions",
                self.min_interactions,
                ">= 2",
            ));
        }
        Ok(())
    }

    /// Splits `urm` into train and test interactions.
    ///
    /// Each selected playlist hides `round(test_fraction · n)` of its `n`
    /// tracks, clamped so that at least one is hidden and one is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn split(&self, urm: &CsrMatrix) -> Result<HoldoutSplit> {
        self.validate()?;

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut eligible: Vec<usize> = (0..urm.nrows())
            .filter(|&p| urm.row_nnz(p) >= self.min_interactions)
            .collect();
        eligible.shuffle(&mut rng);
        let n_selected = (eligible.len() as f32 * self.playlist_fraction).round() as usize;
        let mut playlists: Vec<usize> = eligible.into_iter().take(n_selected).collect();
        playlists.sort_unstable();

        let mut train_rows: Vec<Vec<(usize, f32)>> = Vec::with_capacity(urm.nrows());
        let mut test_rows: Vec<Vec<(usize, f32)>> = vec![Vec::new(); urm.nrows()];
        let mut selected = playlists.iter().peekable();

        for p in 0..urm.nrows() {
            let mut row: Vec<(usize, f32)> = urm.row(p).iter().collect();
            if selected.next_if_eq(&&p).is_some() {
                let n = row.len();
                let n_test = ((n as f32 * self.test_fraction).round() as usize).clamp(1, n - 1);
                row.shuffle(&mut rng);
                test_rows[p] = row.split_off(n - n_test);
            }
            train_rows.push(row);
        }

        let train = CsrMatrix::from_rows(urm.ncols(), train_rows)?;
        let test = CsrMatrix::from_rows(urm.ncols(), test_rows)?;
        info!(
            playlists = playlists.len(),
            train_nnz = train.nnz(),
            test_nnz = test.nnz(),
            "holdout split"
        );
        Ok(HoldoutSplit {
            train,
            test,
            playlists,
        })
    }
}

/// MAP@K (with precision and recall) of `recommender` on the hidden tracks.
///
/// `recommender` must have been fitted on `split.train`; it is asked for `k`
/// tracks for every playlist in `split.playlists`.
///
/// # Errors
///
/// Returns [`RecomendarError::DimensionMismatch`] if the recommender serves a
/// different number of playlists or tracks, or any error from `recommend_n`.
pub fn evaluate_map<R>(recommender: &R, split: &HoldoutSplit, k: usize) -> Result<RankingMetrics>
where
    R: Recommend + Sync,
{
    if (recommender.n_playlists(), recommender.n_items()) != split.test.shape() {
        return Err(RecomendarError::mismatch(
            format!("{:?} playlists x tracks", split.test.shape()),
            format!("{:?}", (recommender.n_playlists(), recommender.n_items())),
        ));
    }

    let evaluate_one = |&p: &usize| -> Result<(Vec<usize>, Vec<usize>)> {
        let recommended = recommender.recommend_n(p, k)?;
        Ok((recommended, split.test.row(p).indices().to_vec()))
    };

    #[cfg(feature = "parallel")]
    let pairs: Result<Vec<(Vec<usize>, Vec<usize>)>> =
        split.playlists.par_iter().map(evaluate_one).collect();

    #[cfg(not(feature = "parallel"))]
    let pairs: Result<Vec<(Vec<usize>, Vec<usize>)>> =
        split.playlists.iter().map(evaluate_one).collect();

    let (recommended, relevant): (Vec<_>, Vec<_>) = pairs?.into_iter().unzip();
    let metrics = RankingMetrics::compute(&recommended, &relevant, k);
    info!(
        k,
        playlists = metrics.n_playlists,
        map = metrics.map,
        "evaluation finished"
    );
    Ok(metrics)
}

#[cfg(test)]
#[path = "model_selection_tests.rs"]
mod tests;
