//! Evaluation metrics for top-N recommendation.
//!
//! Ranking metrics (precision, recall, AP and MAP at a cutoff) live in
//! [`ranking`]; the most used ones are re-exported here.

pub mod ranking;

pub use ranking::{average_precision_at_k, map_at_k, precision_at_k, recall_at_k, RankingMetrics};
