//! Core traits for trained recommenders.
//!
//! Every trained model (a single similarity or weight matrix, or a blend of
//! several) answers the same two questions: how relevant is each track to a
//! playlist, and which tracks should be added to it.

use crate::error::Result;
use crate::recommend::ranking::{top_n, DEFAULT_TOP_N};

/// Scoring and top-N recommendation for playlists of a fixed interaction matrix.
///
/// Implementors provide [`score`](Recommend::score) and
/// [`seen`](Recommend::seen); ranking is shared.
///
/// # Examples
///
/// ```
/// use recomendar::prelude::*;
///
/// let urm = CooMatrix::from_triplets(3, 5, vec![
///     (0, 1, 1.0), (0, 3, 1.0),
///     (1, 0, 1.0), (1, 1, 1.0), (1, 2, 1.0),
///     (2, 2, 1.0), (2, 3, 1.0), (2, 4, 1.0),
/// ]).unwrap().to_csr();
///
/// let config = ModelConfig::ItemCf(
///     SimilarityConfig::default().with_k(5).with_shrink(0.0).with_normalize(false),
/// );
/// let rec = Recommender::fit(urm, &config, None).unwrap();
/// assert_eq!(rec.recommend(0).unwrap(), vec![2, 0, 4]);
/// ```
pub trait Recommend {
    /// Number of playlists that can be queried.
    fn n_playlists(&self) -> usize;

    /// Number of tracks scored.
    fn n_items(&self) -> usize;

    /// Tracks already in `playlist`, sorted ascending.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::UnknownPlaylist`](crate::RecomendarError::UnknownPlaylist)
    /// for an out-of-range id.
    fn seen(&self, playlist: usize) -> Result<&[usize]>;

    /// Relevance of every track to `playlist`, seen tracks included.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown playlist or mismatched model dimensions.
    fn score(&self, playlist: usize) -> Result<Vec<f32>>;

    /// The `n` most relevant unseen tracks, best first.
    ///
    /// # Errors
    ///
    /// Same as [`score`](Recommend::score).
    fn recommend_n(&self, playlist: usize, n: usize) -> Result<Vec<usize>> {
        let scores = self.score(playlist)?;
        Ok(top_n(&scores, self.seen(playlist)?, n))
    }

    /// The ten most relevant unseen tracks, best first.
    ///
    /// # Errors
    ///
    /// Same as [`score`](Recommend::score).
    fn recommend(&self, playlist: usize) -> Result<Vec<usize>> {
        self.recommend_n(playlist, DEFAULT_TOP_N)
    }
}
