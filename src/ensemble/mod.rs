//! Weighted blending of several single-model recommenders.
//!
//! An [`EnsembleConfig`] is an ordered list of `(weight, model)` slots. Slots
//! with weight 0 are never trained and stay `None` in the fitted
//! [`TrainedEnsemble`]. At serving time every present slot scores the
//! playlist, and the scores are fused by [`Fusion`]:
//!
//! - [`Fusion::WeightedSum`]: `Σ w_m · norm(s_m)`, then exclusion and top-N
//! - [`Fusion::Interleave`]: the similarity slots (CF, content, SVD) are
//!   blended by weight into one ranking, the learned slots (SLIM) into
//!   another, and the two lists alternate, similarity first, skipping
//!   duplicates
//!
//! # Quick Start
//!
//! ```
//! use recomendar::prelude::*;
//!
//! let urm = CooMatrix::from_triplets(3, 5, vec![
//!     (0, 1, 1.0), (0, 3, 1.0),
//!     (1, 0, 1.0), (1, 1, 1.0), (1, 2, 1.0),
//!     (2, 2, 1.0), (2, 3, 1.0), (2, 4, 1.0),
//! ]).unwrap().to_csr();
//!
//! // Only item CF and user CF get non-zero weights
//! let config = EnsembleConfig::default()
//!     .with_weights(&[1.0, 0.5, 0.0, 0.0, 0.0])
//!     .unwrap();
//! let ensemble = config.fit(urm, None).unwrap();
//!
//! assert!(ensemble.slot(2).is_none());
//! assert_eq!(ensemble.recommend(0).unwrap().len(), 3);
//! ```

mod blend;

use serde::{Deserialize, Serialize};

use crate::error::{RecomendarError, Result};
use crate::recommend::{ModelConfig, DEFAULT_TOP_N};
use crate::similarity::{SimilarityConfig, SvdConfig, Weighting};
use crate::slim::BprConfig;

pub use blend::{TrainedEnsemble, TrainedSlot};

/// Where per-model L2 normalization happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Raw scores are summed.
    None,
    /// Each model's scores are scaled to unit L2 norm before weighting.
    #[default]
    BeforeWeighting,
    /// The weighted sum is scaled to unit L2 norm.
    AfterWeighting,
}

/// How present slots are combined into one ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fusion {
    /// Rank the weighted sum of scores.
    #[default]
    WeightedSum,
    /// Alternate the similarity-slot ranking with the learned-slot ranking.
    Interleave,
}

/// One model and its blending weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSlot {
    /// Blending weight; 0 disables the slot entirely
    pub weight: f32,
    /// Model trained for this slot
    pub model: ModelConfig,
}

impl EnsembleSlot {
    #[must_use]
    pub fn new(weight: f32, model: ModelConfig) -> Self {
        Self { weight, model }
    }
}

/// Configuration of a blended recommender.
///
/// The default is the five-slot playlist ensemble: item CF, user CF,
/// content-based, item SVD and SLIM-BPR with weights
/// `[1.65, 0.55, 1.0, 0.15, 0.05]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Ordered model slots
    pub slots: Vec<EnsembleSlot>,
    /// Score normalization for weighted-sum fusion
    pub normalization: Normalization,
    /// Fusion strategy
    pub fusion: Fusion,
    /// Length of the recommendation list
    pub top_n: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        let cf = SimilarityConfig::default()
            .with_k(150)
            .with_shrink(10.0)
            .with_weighting(Weighting::TfIdf);
        Self {
            slots: vec![
                EnsembleSlot::new(1.65, ModelConfig::ItemCf(cf)),
                EnsembleSlot::new(0.55, ModelConfig::UserCf(cf)),
                EnsembleSlot::new(1.0, ModelConfig::ContentBased(cf.with_shrink(5.0))),
                EnsembleSlot::new(
                    0.15,
                    ModelConfig::ItemSvd(SvdConfig::default().with_n_factors(300).with_k(250)),
                ),
                EnsembleSlot::new(0.05, ModelConfig::SlimBpr(BprConfig::default())),
            ],
            normalization: Normalization::BeforeWeighting,
            fusion: Fusion::WeightedSum,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl EnsembleConfig {
    /// An ensemble over explicit slots with default fusion settings.
    #[must_use]
    pub fn new(slots: Vec<EnsembleSlot>) -> Self {
        Self {
            slots,
            ..Self::default()
        }
    }

    /// Replaces the weight of every slot, in order.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::DimensionMismatch`] if `weights` does not
    /// have one entry per slot.
    pub fn with_weights(mut self, weights: &[f32]) -> Result<Self> {
        if weights.len() != self.slots.len() {
            return Err(RecomendarError::mismatch(
                format!("{} weights", self.slots.len()),
                format!("{} weights", weights.len()),
            ));
        }
        for (slot, &w) in self.slots.iter_mut().zip(weights) {
            slot.weight = w;
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    #[must_use]
    pub fn with_fusion(mut self, fusion: Fusion) -> Self {
        self.fusion = fusion;
        self
    }

    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Current slot weights, in order.
    #[must_use]
    pub fn weights(&self) -> Vec<f32> {
        self.slots.iter().map(|s| s.weight).collect()
    }

    /// Checks weights, `top_n` and the config of every enabled slot.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] for a negative or
    /// non-finite weight, no positive weight, `top_n == 0`, or an invalid
    /// model config in an enabled slot.
    pub fn validate(&self) -> Result<()> {
        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.weight.is_finite() || slot.weight < 0.0 {
                return Err(RecomendarError::invalid(
                    &format!("slots[{i}].weight"),
                    slot.weight,
                    ">= 0 and finite",
                ));
            }
        }
        if !self.slots.iter().any(|s| s.weight > 0.0) {
            return Err(RecomendarError::invalid(
                "weights",
                format!("{:?}", self.weights()),
                "at least one weight > 0",
            ));
        }
        if self.top_n == 0 {
            return Err(RecomendarError::invalid("top_n", self.top_n, "> 0"));
        }
        for slot in self.slots.iter().filter(|s| s.weight > 0.0) {
            slot.model.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "ensemble_tests.rs"]
mod tests;
