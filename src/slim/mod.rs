//! SLIM-BPR: item × item weights learned from implicit pairwise preferences.
//!
//! [`ElasticNetConfig`] learns the same kind of matrix by regression instead.
//!
//! Each sample draws a playlist `u`, a track `i` in it and a track `j` not in
//! it, and pushes the playlist's score for `i` above its score for `j`:
//!
//! ```text
//! x_uij = Σ_{k ∈ seen(u)} (W[k,i] − W[k,j])
//! g     = 1 / (1 + e^{x_uij})
//! W[k,i] += η_i(g) − lr·λ_pos·W[k,i]
//! W[k,j] −= η_j(g) + lr·λ_neg·W[k,j]
//! ```
//!
//! `η` comes from an [`ItemOptimizer`]. Weights are held dense and
//! target-major while training, so the columns `W[·,i]` and `W[·,j]` touched
//! by a sample are contiguous. After the last epoch every target item keeps
//! its `top_k` largest-magnitude weights and the matrix is transposed into the
//! source-major layout used for scoring.
//!
//! # Example
//!
//! ```
//! use recomendar::primitives::CsrMatrix;
//! use recomendar::slim::BprConfig;
//!
//! let urm = CsrMatrix::from_dense(4, 4, &[
//!     1.0, 1.0, 0.0, 0.0,
//!     1.0, 1.0, 0.0, 0.0,
//!     0.0, 0.0, 1.0, 1.0,
//!     0.0, 0.0, 1.0, 1.0,
//! ]).unwrap();
//!
//! let weights = BprConfig::default().with_epochs(5).with_top_k(2).fit(&urm).unwrap();
//! assert_eq!(weights.shape(), (4, 4));
//! assert_eq!(weights.get(0, 0), 0.0);
//! ```

mod elastic;

use std::ops::ControlFlow;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RecomendarError, Result};
use crate::optim::{ItemOptimizer, UpdateRule};
use crate::primitives::CsrMatrix;
use crate::similarity::knn;

pub use elastic::ElasticNetConfig;

/// How the negative track `j` is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeSampling {
    /// Every track is equally likely.
    #[default]
    Uniform,
    /// Tracks are drawn proportionally to their interaction count plus one,
    /// so tracks nobody has played can still be drawn.
    Popularity,
}

/// SLIM-BPR hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BprConfig {
    /// Weights kept per target item after training
    pub top_k: usize,
    /// Full passes over the sample budget
    pub epochs: usize,
    /// Base step size
    pub learning_rate: f32,
    /// Adaptive scaling of gradients
    pub update_rule: UpdateRule,
    /// Negative item distribution
    pub negative_sampling: NegativeSampling,
    /// L2 penalty on positive-item weights
    pub lambda_pos: f32,
    /// L2 penalty on negative-item weights
    pub lambda_neg: f32,
    /// Samples per epoch; the number of observed interactions when `None`
    pub samples_per_epoch: Option<usize>,
    /// Consecutive degenerate playlist draws tolerated before giving up
    pub max_resample_attempts: usize,
    /// Seed for the sampler
    pub random_state: u64,
}

impl Default for BprConfig {
    fn default() -> Self {
        Self {
            top_k: 250,
            epochs: 15,
            learning_rate: 0.1,
            update_rule: UpdateRule::Adagrad,
            negative_sampling: NegativeSampling::Uniform,
            lambda_pos: 0.0025,
            lambda_neg: 0.00025,
            samples_per_epoch: None,
            max_resample_attempts: 1000,
            random_state: 42,
        }
    }
}

/// Summary of one finished epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch index
    pub epoch: usize,
    /// Mean of `−ln σ(x_uij)` over the epoch's samples
    pub mean_loss: f32,
    /// Samples processed
    pub samples: usize,
    /// Degenerate draws that were resampled
    pub skipped: usize,
}

/// Observer notified after every epoch.
///
/// Returning [`ControlFlow::Break`] stops training; the weights learned so far
/// are pruned and returned as usual.
pub trait TrainingCallback {
    /// Called once per finished epoch.
    fn on_epoch_end(&mut self, report: &EpochReport) -> ControlFlow<()>;
}

impl<F> TrainingCallback for F
where
    F: FnMut(&EpochReport) -> ControlFlow<()>,
{
    fn on_epoch_end(&mut self, report: &EpochReport) -> ControlFlow<()> {
        self(report)
    }
}

struct NoCallback;

impl TrainingCallback for NoCallback {
    fn on_epoch_end(&mut self, _report: &EpochReport) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl BprConfig {
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    #[must_use]
    pub fn with_update_rule(mut self, update_rule: UpdateRule) -> Self {
        self.update_rule = update_rule;
        self
    }

    #[must_use]
    pub fn with_negative_sampling(mut self, negative_sampling: NegativeSampling) -> Self {
        self.negative_sampling = negative_sampling;
        self
    }

    #[must_use]
    pub fn with_regularization(mut self, lambda_pos: f32, lambda_neg: f32) -> Self {
        self.lambda_pos = lambda_pos;
        self.lambda_neg = lambda_neg;
        self
    }

    #[must_use]
    pub fn with_samples_per_epoch(mut self, samples: usize) -> Self {
        self.samples_per_epoch = Some(samples);
        self
    }

    #[must_use]
    pub fn with_max_resample_attempts(mut self, attempts: usize) -> Self {
        self.max_resample_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Checks every hyperparameter.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] for `top_k`, `epochs`
    /// or `max_resample_attempts` of 0, a non-positive learning rate, a
    /// negative or non-finite penalty, or an invalid update rule.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RecomendarError::invalid("top_k", self.top_k, "> 0"));
        }
        if self.epochs == 0 {
            return Err(RecomendarError::invalid("epochs", self.epochs, "> 0"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(RecomendarError::invalid(
                "learning_rate",
                self.learning_rate,
                "> 0 and finite",
            ));
        }
        for (name, value) in [("lambda_pos", self.lambda_pos), ("lambda_neg", self.lambda_neg)] {
            if !value.is_finite() || value < 0.0 {
                return Err(RecomendarError::invalid(name, value, ">= 0 and finite"));
            }
        }
        if self.max_resample_attempts == 0 {
            return Err(RecomendarError::invalid(
                "max_resample_attempts",
                self.max_resample_attempts,
                "> 0",
            ));
        }
        self.update_rule.validate()
    }

    /// Trains on `urm` and returns the pruned source × target weight matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no playlist has
    /// between one and `n_items - 1` tracks, or drawing an eligible playlist
    /// fails `max_resample_attempts` times in a row. Negative draws never
    /// fail: after a few rejected draws the negative is taken uniformly from
    /// the tracks the playlist lacks.
    pub fn fit(&self, urm: &CsrMatrix) -> Result<CsrMatrix> {
        self.fit_with_callback(urm, &mut NoCallback)
    }

    /// Like [`fit`](Self::fit), reporting each epoch to `callback`.
    ///
    /// # Errors
    ///
    /// Same as [`fit`](Self::fit).
    pub fn fit_with_callback(
        &self,
        urm: &CsrMatrix,
        callback: &mut dyn TrainingCallback,
    ) -> Result<CsrMatrix> {
        self.validate()?;

        let mut trainer = Trainer::new(self, urm)?;
        let samples = self.samples_per_epoch.unwrap_or_else(|| urm.nnz());
        info!(
            playlists = urm.nrows(),
            items = urm.ncols(),
            epochs = self.epochs,
            samples_per_epoch = samples,
            rule = ?self.update_rule,
            "training SLIM-BPR"
        );

        for epoch in 0..self.epochs {
            let report = trainer.run_epoch(epoch, samples)?;
            info!(
                epoch = report.epoch,
                loss = report.mean_loss,
                skipped = report.skipped,
                "SLIM-BPR epoch finished"
            );
            if report.skipped > report.samples {
                warn!(
                    epoch = report.epoch,
                    skipped = report.skipped,
                    "more degenerate draws than samples; the URM is close to exhausting the sampler"
                );
            }
            if callback.on_epoch_end(&report).is_break() {
                info!(epoch, "training stopped by callback");
                break;
            }
        }

        trainer.into_weights(self.top_k)
    }
}

/// Mutable training state: dense target-major weights plus the sampler.
struct Trainer<'a> {
    config: &'a BprConfig,
    urm: &'a CsrMatrix,
    n_items: usize,
    /// `wt[i * n_items + k]` holds `W[k, i]`
    wt: Vec<f32>,
    optimizer: ItemOptimizer,
    popularity: Option<WeightedIndex<usize>>,
    rng: StdRng,
}

impl<'a> Trainer<'a> {
    fn new(config: &'a BprConfig, urm: &'a CsrMatrix) -> Result<Self> {
        let n_items = urm.ncols();
        let eligible = (0..urm.nrows()).any(|u| is_eligible(urm.row_nnz(u), n_items));
        if !eligible {
            return Err(RecomendarError::SamplingExhausted {
                epoch: 0,
                attempts: 0,
            });
        }

        let popularity = match config.negative_sampling {
            NegativeSampling::Uniform => None,
            NegativeSampling::Popularity => Some(
                WeightedIndex::new(urm.column_counts().into_iter().map(|count| count + 1))
                    .map_err(|e| RecomendarError::Other(format!("popularity sampler: {e}")))?,
            ),
        };

        Ok(Self {
            config,
            urm,
            n_items,
            wt: vec![0.0; n_items * n_items],
            optimizer: ItemOptimizer::new(config.update_rule, config.learning_rate, n_items),
            popularity,
            rng: StdRng::seed_from_u64(config.random_state),
        })
    }

    fn run_epoch(&mut self, epoch: usize, samples: usize) -> Result<EpochReport> {
        let mut loss_sum = 0.0f64;
        let mut skipped = 0;

        for _ in 0..samples {
            let (u, i, j, resampled) = self.sample(epoch)?;
            skipped += resampled;
            loss_sum += f64::from(self.update(u, i, j));
        }

        Ok(EpochReport {
            epoch,
            mean_loss: if samples == 0 {
                0.0
            } else {
                (loss_sum / samples as f64) as f32
            },
            samples,
            skipped,
        })
    }

    /// Draws `(playlist, positive, negative)` and the number of retries it took.
    fn sample(&mut self, epoch: usize) -> Result<(usize, usize, usize, usize)> {
        let max_attempts = self.config.max_resample_attempts;
        let mut attempts = 0;

        let u = loop {
            let u = self.rng.gen_range(0..self.urm.nrows());
            if is_eligible(self.urm.row_nnz(u), self.n_items) {
                break u;
            }
            attempts += 1;
            if attempts >= max_attempts {
                return Err(RecomendarError::SamplingExhausted { epoch, attempts });
            }
        };

        let urm = self.urm;
        let seen = urm.row(u);
        let i = seen.indices()[self.rng.gen_range(0..seen.nnz())];

        let mut negative_attempts = 0;
        let j = loop {
            if negative_attempts >= REJECTION_DRAWS {
                // exact uniform draw over the tracks the playlist lacks
                let free = self.n_items - seen.nnz();
                break nth_unseen(seen.indices(), self.rng.gen_range(0..free));
            }
            let j = match &self.popularity {
                Some(dist) => dist.sample(&mut self.rng),
                None => self.rng.gen_range(0..self.n_items),
            };
            if !seen.contains(j) {
                break j;
            }
            negative_attempts += 1;
        };

        Ok((u, i, j, attempts + negative_attempts))
    }

    /// One gradient step; returns the sample's BPR loss before the update.
    fn update(&mut self, u: usize, i: usize, j: usize) -> f32 {
        let n = self.n_items;
        let urm = self.urm;
        let seen = urm.row(u).indices();

        let x_uij: f32 = seen
            .iter()
            .map(|&k| self.wt[i * n + k] - self.wt[j * n + k])
            .sum();
        let gradient = 1.0 / (1.0 + x_uij.exp());

        let eta_i = self.optimizer.step(i, gradient);
        let eta_j = self.optimizer.step(j, gradient);
        let decay_pos = self.config.learning_rate * self.config.lambda_pos;
        let decay_neg = self.config.learning_rate * self.config.lambda_neg;

        for &k in seen {
            if k != i {
                let w = &mut self.wt[i * n + k];
                *w += eta_i - decay_pos * *w;
            }
            if k != j {
                let w = &mut self.wt[j * n + k];
                *w -= eta_j + decay_neg * *w;
            }
        }

        softplus(-x_uij)
    }

    fn into_weights(self, top_k: usize) -> Result<CsrMatrix> {
        let n = self.n_items;
        let rows: Vec<Vec<(usize, f32)>> = self
            .wt
            .chunks_exact(n.max(1))
            .take(n)
            .enumerate()
            .map(|(target, weights)| {
                let mut row: Vec<(usize, f32)> = weights.iter().copied().enumerate().collect();
                knn::retain_top_k(&mut row, top_k, Some(target));
                row
            })
            .collect();
        Ok(CsrMatrix::from_rows(n, rows)?.transpose())
    }
}

/// Rejected negative draws before falling back to [`nth_unseen`].
const REJECTION_DRAWS: usize = 8;

/// The `n`-th track (0-based) missing from the sorted `seen` indices.
fn nth_unseen(seen: &[usize], n: usize) -> usize {
    let mut candidate = n;
    for &k in seen {
        if k <= candidate {
            candidate += 1;
        } else {
            break;
        }
    }
    candidate
}

/// A playlist can produce a sample only if it has a positive and leaves a negative.
fn is_eligible(nnz: usize, n_items: usize) -> bool {
    nnz > 0 && nnz < n_items
}

/// `ln(1 + e^x)` without overflow.
fn softplus(x: f32) -> f32 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

#[cfg(test)]
#[path = "slim_tests.rs"]
mod tests;
