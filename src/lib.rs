//! Recomendar: playlist continuation with sparse similarity models in pure Rust.
//!
//! Given a playlist × track interaction matrix, recomendar builds item-item
//! and user-user similarity matrices, learns SLIM-BPR weights from implicit
//! pairwise preferences, and blends several such models into one top-10
//! recommendation list that never repeats a track already in the playlist.
//!
//! # Quick Start
//!
//! ```
//! use recomendar::prelude::*;
//!
//! // 3 playlists x 5 tracks
//! let urm = CooMatrix::from_triplets(3, 5, vec![
//!     (0, 1, 1.0), (0, 3, 1.0),
//!     (1, 0, 1.0), (1, 1, 1.0), (1, 2, 1.0),
//!     (2, 2, 1.0), (2, 3, 1.0), (2, 4, 1.0),
//! ]).unwrap().to_csr();
//!
//! // Item CF on raw co-occurrence counts
//! let config = ModelConfig::ItemCf(
//!     SimilarityConfig::default().with_k(5).with_shrink(0.0).with_normalize(false),
//! );
//! let rec = Recommender::fit(urm, &config, None).unwrap();
//!
//! // Tracks 1 and 3 are already in playlist 0
//! assert_eq!(rec.recommend(0).unwrap(), vec![2, 0, 4]);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: CSR and COO sparse matrices
//! - [`similarity`]: Cosine, P3α and RP3β similarity, TF-IDF/BM25 weighting, item SVD, KNN truncation
//! - [`optim`]: Per-item adaptive step sizes (SGD, Adagrad, RMSProp, Adam)
//! - [`slim`]: SLIM-BPR training
//! - [`recommend`]: Single-model recommenders and top-N ranking
//! - [`ensemble`]: Weighted and interleaved blending of several models
//! - [`metrics`]: Precision, recall and MAP at K
//! - [`model_selection`]: Holdout splits and offline evaluation
//! - [`data`]: CSV readers and submission writer
//!
//! # Features
//!
//! - `parallel` (default): similarity rows, batch recommendation and
//!   evaluation run on the rayon thread pool

pub mod data;
pub mod ensemble;
pub mod error;
pub mod metrics;
pub mod model_selection;
pub mod optim;
pub mod prelude;
pub mod primitives;
pub mod recommend;
pub mod similarity;
pub mod slim;
pub mod traits;

pub use error::{RecomendarError, Result};
pub use primitives::{CooMatrix, CsrMatrix};
pub use traits::Recommend;
