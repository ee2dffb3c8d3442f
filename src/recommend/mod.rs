//! Single-model playlist recommenders.
//!
//! A model is one sparse matrix plus the rule for turning it into scores:
//!
//! - **Item-based** (item CF, content-based, item SVD, SLIM-BPR, SLIM
//!   ElasticNet): the
//!   playlist's interaction row times an item × item matrix
//! - **User-based** (user CF): the playlist's row of a playlist × playlist
//!   similarity times the interaction matrix
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
//! let rec = Recommender::fit(urm, &ModelConfig::UserCf(SimilarityConfig::default()), None).unwrap();
//! let top = rec.recommend(0).unwrap();
//! assert!(!top.contains(&1) && !top.contains(&3));
//! ```

pub mod ranking;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RecomendarError, Result};
use crate::primitives::{CsrMatrix, SparseVec};
use crate::similarity::{
    compute_row_similarity, compute_similarity, item_svd_similarity, Axis, SimilarityConfig,
    SvdConfig,
};
use crate::slim::{BprConfig, ElasticNetConfig};
use crate::traits::Recommend;

pub use ranking::{top_n, DEFAULT_TOP_N};

/// The model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Item–item collaborative filtering
    ItemCf,
    /// User–user collaborative filtering
    UserCf,
    /// Item–item similarity over track attributes
    ContentBased,
    /// Item–item similarity from a truncated SVD
    ItemSvd,
    /// Item–item weights learned with BPR
    SlimBpr,
    /// Item–item weights from per-item ElasticNet regressions
    SlimElastic,
}

impl ModelKind {
    /// Whether scores come from a playlist × playlist matrix.
    #[must_use]
    pub fn is_user_based(self) -> bool {
        matches!(self, Self::UserCf)
    }

    /// Whether the model matrix is learned rather than a similarity.
    #[must_use]
    pub fn is_learned(self) -> bool {
        matches!(self, Self::SlimBpr | Self::SlimElastic)
    }
}

/// Configuration of one model, tagged by family.
///
/// # Examples
///
/// ```
/// use recomendar::recommend::{ModelConfig, ModelKind};
///
/// let config: ModelConfig = serde_json::from_str(
///     r#"{"model": "item_cf", "k": 100, "shrink": 5.0, "weighting": {"type": "tf_idf"}}"#,
/// ).unwrap();
/// assert_eq!(config.kind(), ModelKind::ItemCf);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelConfig {
    ItemCf(SimilarityConfig),
    UserCf(SimilarityConfig),
    ContentBased(SimilarityConfig),
    ItemSvd(SvdConfig),
    SlimBpr(BprConfig),
    SlimElastic(ElasticNetConfig),
}

impl ModelConfig {
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::ItemCf(_) => ModelKind::ItemCf,
            Self::UserCf(_) => ModelKind::UserCf,
            Self::ContentBased(_) => ModelKind::ContentBased,
            Self::ItemSvd(_) => ModelKind::ItemSvd,
            Self::SlimBpr(_) => ModelKind::SlimBpr,
            Self::SlimElastic(_) => ModelKind::SlimElastic,
        }
    }

    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] from the inner config.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::ItemCf(c) | Self::UserCf(c) | Self::ContentBased(c) => c.validate(),
            Self::ItemSvd(c) => c.validate(),
            Self::SlimBpr(c) => c.validate(),
            Self::SlimElastic(c) => c.validate(),
        }
    }

    /// Builds the model matrix from `urm` (and `features` for content-based).
    ///
    /// `features` is a track × attribute matrix with one row per URM column.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, a content-based model
    /// without (or with mis-sized) features, or a failed SLIM-BPR fit.
    pub fn fit(&self, urm: &CsrMatrix, features: Option<&CsrMatrix>) -> Result<TrainedModel> {
        self.validate()?;

        let matrix = match self {
            Self::ItemCf(c) => compute_similarity(urm, Axis::Item, c)?,
            Self::UserCf(c) => compute_similarity(urm, Axis::User, c)?,
            Self::ContentBased(c) => {
                let icm = features.ok_or_else(|| {
                    RecomendarError::MissingFeatures(
                        "content-based model needs a track attribute matrix".to_string(),
                    )
                })?;
                if icm.nrows() != urm.ncols() {
                    return Err(RecomendarError::mismatch(
                        format!("{} feature rows (one per track)", urm.ncols()),
                        format!("{} feature rows", icm.nrows()),
                    ));
                }
                compute_row_similarity(icm, c)?
            }
            Self::ItemSvd(c) => item_svd_similarity(urm, c)?,
            Self::SlimBpr(c) => c.fit(urm)?,
            Self::SlimElastic(c) => c.fit(urm)?,
        };

        info!(
            model = ?self.kind(),
            shape = ?matrix.shape(),
            nnz = matrix.nnz(),
            "model fitted"
        );
        Ok(TrainedModel {
            kind: self.kind(),
            matrix,
        })
    }
}

/// A fitted model matrix, independent of the interaction matrix it scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    kind: ModelKind,
    matrix: CsrMatrix,
}

impl TrainedModel {
    /// Wraps a precomputed matrix.
    #[must_use]
    pub fn new(kind: ModelKind, matrix: CsrMatrix) -> Self {
        Self { kind, matrix }
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    #[must_use]
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    /// Checks that this model can score playlists of `urm`.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::DimensionMismatch`] if the matrix is not
    /// square over the URM's items (or playlists, for user-based models).
    pub fn check_compatible(&self, urm: &CsrMatrix) -> Result<()> {
        let side = if self.kind.is_user_based() {
            urm.nrows()
        } else {
            urm.ncols()
        };
        if self.matrix.shape() != (side, side) {
            return Err(RecomendarError::mismatch(
                format!("{side}x{side} {:?} matrix", self.kind),
                format!("{:?}", self.matrix.shape()),
            ));
        }
        Ok(())
    }

    /// Relevance vector of `playlist` against `urm`.
    ///
    /// An empty playlist scores all zeros.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::UnknownPlaylist`] or
    /// [`RecomendarError::DimensionMismatch`].
    pub fn score(&self, urm: &CsrMatrix, playlist: usize) -> Result<Vec<f32>> {
        self.check_compatible(urm)?;
        let row = playlist_row(urm, playlist)?;
        if self.kind.is_user_based() {
            urm.vecmat(self.matrix.row(playlist))
        } else {
            self.matrix.vecmat(row)
        }
    }
}

/// Row `playlist` of `urm`, or [`RecomendarError::UnknownPlaylist`].
pub(crate) fn playlist_row(urm: &CsrMatrix, playlist: usize) -> Result<SparseVec<'_>> {
    if playlist >= urm.nrows() {
        return Err(RecomendarError::UnknownPlaylist {
            playlist,
            n_playlists: urm.nrows(),
        });
    }
    Ok(urm.row(playlist))
}

/// One trained model bound to the interaction matrix it serves.
///
/// Immutable after [`fit`](Recommender::fit); clone it or wrap it in an `Arc`
/// to serve from several threads.
#[derive(Debug, Clone)]
pub struct Recommender {
    urm: Arc<CsrMatrix>,
    model: TrainedModel,
}

impl Recommender {
    /// Fits `config` on `urm`.
    ///
    /// # Errors
    ///
    /// See [`ModelConfig::fit`].
    pub fn fit(
        urm: impl Into<Arc<CsrMatrix>>,
        config: &ModelConfig,
        features: Option<&CsrMatrix>,
    ) -> Result<Self> {
        let urm = urm.into();
        let model = config.fit(&urm, features)?;
        Ok(Self { urm, model })
    }

    /// Binds an already trained model to `urm`.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::DimensionMismatch`] if they don't fit together.
    pub fn from_parts(urm: Arc<CsrMatrix>, model: TrainedModel) -> Result<Self> {
        model.check_compatible(&urm)?;
        Ok(Self { urm, model })
    }

    #[must_use]
    pub fn urm(&self) -> &Arc<CsrMatrix> {
        &self.urm
    }

    #[must_use]
    pub fn model(&self) -> &TrainedModel {
        &self.model
    }
}

impl Recommend for Recommender {
    fn n_playlists(&self) -> usize {
        self.urm.nrows()
    }

    fn n_items(&self) -> usize {
        self.urm.ncols()
    }

    fn seen(&self, playlist: usize) -> Result<&[usize]> {
        Ok(playlist_row(&self.urm, playlist)?.indices())
    }

    fn score(&self, playlist: usize) -> Result<Vec<f32>> {
        self.model.score(&self.urm, playlist)
    }
}

#[cfg(test)]
#[path = "recommend_tests.rs"]
mod tests;
