//! Fitted ensemble: score fusion, ranking and persistence.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{EnsembleConfig, Fusion, Normalization};
use crate::error::{RecomendarError, Result};
use crate::primitives::CsrMatrix;
use crate::recommend::{playlist_row, top_n, TrainedModel};
use crate::traits::Recommend;

/// A trained slot with its blending weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedSlot {
    /// Blending weight (> 0)
    pub weight: f32,
    /// Fitted model
    pub model: TrainedModel,
}

/// Ensemble fitted on one interaction matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedEnsemble {
    urm: Arc<CsrMatrix>,
    slots: Vec<Option<TrainedSlot>>,
    normalization: Normalization,
    fusion: Fusion,
    top_n: usize,
}

impl EnsembleConfig {
    /// Trains every slot with a positive weight.
    ///
    /// `features` (track × attribute) is only read by content-based slots.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or any enabled slot fails to fit.
    pub fn fit(
        &self,
        urm: impl Into<Arc<CsrMatrix>>,
        features: Option<&CsrMatrix>,
    ) -> Result<TrainedEnsemble> {
        self.validate()?;
        let urm = urm.into();

        let mut slots = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.weight == 0.0 {
                debug!(slot = i, model = ?slot.model.kind(), "zero weight, slot not trained");
                slots.push(None);
                continue;
            }
            let model = slot.model.fit(&urm, features)?;
            slots.push(Some(TrainedSlot {
                weight: slot.weight,
                model,
            }));
        }

        info!(
            playlists = urm.nrows(),
            items = urm.ncols(),
            trained = slots.iter().flatten().count(),
            fusion = ?self.fusion,
            "ensemble fitted"
        );
        Ok(TrainedEnsemble {
            urm,
            slots,
            normalization: self.normalization,
            fusion: self.fusion,
            top_n: self.top_n,
        })
    }
}

impl TrainedEnsemble {
    /// All slots in configuration order; disabled slots are `None`.
    #[must_use]
    pub fn slots(&self) -> &[Option<TrainedSlot>] {
        &self.slots
    }

    /// Slot `index`, if it exists and was trained.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&TrainedSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn urm(&self) -> &Arc<CsrMatrix> {
        &self.urm
    }

    #[must_use]
    pub fn fusion(&self) -> Fusion {
        self.fusion
    }

    #[must_use]
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    #[must_use]
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    fn present(&self) -> impl Iterator<Item = &TrainedSlot> {
        self.slots.iter().flatten()
    }

    /// Recommendations for many playlists, in input order.
    ///
    /// Playlists are scored in parallel when the `parallel` feature is on.
    ///
    /// # Errors
    ///
    /// Returns the first error hit, typically [`RecomendarError::UnknownPlaylist`].
    pub fn recommend_batch(&self, playlists: &[usize]) -> Result<Vec<Vec<usize>>> {
        #[cfg(feature = "parallel")]
        let lists = playlists.par_iter().map(|&p| self.recommend(p)).collect();

        #[cfg(not(feature = "parallel"))]
        let lists = playlists.iter().map(|&p| self.recommend(p)).collect();

        lists
    }

    /// Writes the ensemble (interaction matrix included) with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::Serialization`] or [`RecomendarError::Io`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self).map_err(|e| {
            RecomendarError::Serialization(format!("ensemble serialization failed: {e}"))
        })?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!(path = %path.as_ref().display(), bytes = bytes.len(), "ensemble saved");
        Ok(())
    }

    /// Reads an ensemble written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::Io`], [`RecomendarError::Serialization`], or
    /// [`RecomendarError::DimensionMismatch`] if a stored model no longer
    /// matches the stored interaction matrix.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let ensemble: Self = bincode::deserialize(&bytes).map_err(|e| {
            RecomendarError::Serialization(format!("ensemble deserialization failed: {e}"))
        })?;
        for slot in ensemble.present() {
            slot.model.check_compatible(&ensemble.urm)?;
        }
        Ok(ensemble)
    }

    /// Weighted sum over the present slots accepted by `include`, or `None`
    /// if there are none.
    fn blend<F>(&self, playlist: usize, include: F) -> Result<Option<Vec<f32>>>
    where
        F: Fn(&TrainedSlot) -> bool,
    {
        let mut blended: Option<Vec<f32>> = None;
        for slot in self.present().filter(|slot| include(slot)) {
            let mut scores = slot.model.score(&self.urm, playlist)?;
            if self.normalization == Normalization::BeforeWeighting {
                l2_normalize(&mut scores);
            }
            let acc = blended.get_or_insert_with(|| vec![0.0f32; self.urm.ncols()]);
            for (acc, s) in acc.iter_mut().zip(&scores) {
                *acc += slot.weight * s;
            }
        }
        if self.normalization == Normalization::AfterWeighting {
            if let Some(blended) = blended.as_mut() {
                l2_normalize(blended);
            }
        }
        Ok(blended)
    }

    /// Similarity slots blended into one ranking, alternated with the
    /// blended learned-weight slots.
    fn interleave(&self, playlist: usize, n: usize) -> Result<Vec<usize>> {
        let seen = self.seen(playlist)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let similarity = self.blend(playlist, |slot| !slot.model.kind().is_learned())?;
        let learned = self.blend(playlist, |slot| slot.model.kind().is_learned())?;
        let lists: Vec<Vec<usize>> = [similarity, learned]
            .into_iter()
            .flatten()
            .map(|scores| top_n(&scores, seen, n))
            .collect();

        let mut merged = Vec::with_capacity(n);
        let mut taken = HashSet::with_capacity(n);
        let longest = lists.iter().map(Vec::len).max().unwrap_or(0);
        'rounds: for rank in 0..longest {
            for list in &lists {
                if let Some(&item) = list.get(rank) {
                    if taken.insert(item) {
                        merged.push(item);
                        if merged.len() == n {
                            break 'rounds;
                        }
                    }
                }
            }
        }
        Ok(merged)
    }
}

/// Scales `v` to unit L2 norm; all-zero vectors are left as is.
fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

impl Recommend for TrainedEnsemble {
    fn n_playlists(&self) -> usize {
        self.urm.nrows()
    }

    fn n_items(&self) -> usize {
        self.urm.ncols()
    }

    fn seen(&self, playlist: usize) -> Result<&[usize]> {
        Ok(playlist_row(&self.urm, playlist)?.indices())
    }

    /// Weighted sum of the present slots' scores.
    fn score(&self, playlist: usize) -> Result<Vec<f32>> {
        let blended = self.blend(playlist, |_| true)?;
        Ok(blended.unwrap_or_else(|| vec![0.0; self.urm.ncols()]))
    }

    fn recommend_n(&self, playlist: usize, n: usize) -> Result<Vec<usize>> {
        match self.fusion {
            Fusion::WeightedSum => {
                let scores = self.score(playlist)?;
                Ok(top_n(&scores, self.seen(playlist)?, n))
            }
            Fusion::Interleave => self.interleave(playlist, n),
        }
    }

    fn recommend(&self, playlist: usize) -> Result<Vec<usize>> {
        self.recommend_n(playlist, self.top_n)
    }
}
