//! Feature reweighting applied to entity vectors before similarity.
//!
//! Rows of the input are entities, columns are features. Both schemes
//! down-weight features shared by many entities:
//!
//! ```text
//! idf(f)      = ln(N / df(f))
//! tfidf(e, f) = sqrt(x_ef) · idf(f)
//! bm25(e, f)  = x_ef · (k1 + 1) / (x_ef + k1 · (1 - b + b · |e| / avg|e|)) · idf(f)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RecomendarError, Result};
use crate::primitives::CsrMatrix;

/// Term weighting scheme for entity feature vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Weighting {
    /// Use raw values.
    #[default]
    None,
    /// TF-IDF with square-root term frequency.
    TfIdf,
    /// Okapi BM25.
    Bm25 {
        /// Term-frequency saturation
        k1: f32,
        /// Length normalization strength in [0, 1]
        b: f32,
    },
}

impl Weighting {
    /// BM25 with the usual k1 = 1.2, b = 0.75.
    #[must_use]
    pub fn bm25() -> Self {
        Self::Bm25 { k1: 1.2, b: 0.75 }
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] for a negative or
    /// non-finite `k1`, or `b` outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        if let Self::Bm25 { k1, b } = *self {
            if !k1.is_finite() || k1 < 0.0 {
                return Err(RecomendarError::invalid("bm25.k1", k1, ">= 0 and finite"));
            }
            if !(0.0..=1.0).contains(&b) {
                return Err(RecomendarError::invalid("bm25.b", b, "in [0, 1]"));
            }
        }
        Ok(())
    }

    /// Reweights the entity × feature matrix.
    #[must_use]
    pub fn apply(&self, entities: &CsrMatrix) -> CsrMatrix {
        match *self {
            Self::None => entities.clone(),
            Self::TfIdf => {
                let idf = inverse_document_frequency(entities);
                entities.map_entries(|_, f, x| x.abs().sqrt() * x.signum() * idf[f])
            }
            Self::Bm25 { k1, b } => {
                let idf = inverse_document_frequency(entities);
                let lengths = entities.row_sums();
                let avg_len = if lengths.is_empty() {
                    0.0
                } else {
                    lengths.iter().sum::<f32>() / lengths.len() as f32
                };
                entities.map_entries(|e, f, x| {
                    let len_ratio = if avg_len > 0.0 { lengths[e] / avg_len } else { 1.0 };
                    let denom = x + k1 * (1.0 - b + b * len_ratio);
                    if denom == 0.0 {
                        0.0
                    } else {
                        x * (k1 + 1.0) / denom * idf[f]
                    }
                })
            }
        }
    }
}

/// `ln(N / df)` per feature column; unused features get 0.
fn inverse_document_frequency(entities: &CsrMatrix) -> Vec<f32> {
    let n = entities.nrows() as f32;
    entities
        .column_counts()
        .into_iter()
        .map(|df| if df == 0 { 0.0 } else { (n / df as f32).ln() })
        .collect()
}
