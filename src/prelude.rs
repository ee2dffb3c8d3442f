//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use recomendar::prelude::*;
//! ```

pub use crate::ensemble::{EnsembleConfig, EnsembleSlot, Fusion, Normalization, TrainedEnsemble};
pub use crate::error::{RecomendarError, Result};
pub use crate::primitives::{CooMatrix, CsrMatrix};
pub use crate::recommend::{ModelConfig, ModelKind, Recommender, TrainedModel};
pub use crate::similarity::{Axis, SimilarityConfig, SimilarityMetric, SvdConfig, Weighting};
pub use crate::slim::{BprConfig, ElasticNetConfig, NegativeSampling};
pub use crate::traits::Recommend;
