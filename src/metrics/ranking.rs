//! Ranking metrics for top-N playlist recommendation.
//!
//! Every function takes a ranked recommendation list and the set of held-out
//! relevant tracks. Relevant sets are slices sorted ascending (a CSR row's
//! indices), which keeps membership tests at `O(log n)`.

use serde::{Deserialize, Serialize};

fn is_relevant(relevant: &[usize], item: usize) -> bool {
    relevant.binary_search(&item).is_ok()
}

/// Precision@K: fraction of the first `k` recommendations that are relevant.
///
/// # Examples
///
/// ```
/// use recomendar::metrics::ranking::precision_at_k;
///
/// let recommended = [4, 7, 1, 9];
/// let relevant = [1, 4];
/// assert_eq!(precision_at_k(&recommended, &relevant, 2), 0.5);
/// assert_eq!(precision_at_k(&recommended, &relevant, 4), 0.5);
/// ```
#[must_use]
pub fn precision_at_k(recommended: &[usize], relevant: &[usize], k: usize) -> f32 {
    if k == 0 {
        return 0.0;
    }
    let hits = recommended
        .iter()
        .take(k)
        .filter(|&&item| is_relevant(relevant, item))
        .count();
    hits as f32 / k as f32
}

/// Recall@K: fraction of the relevant tracks found in the first `k`.
///
/// Returns 0.0 when nothing is relevant.
#[must_use]
pub fn recall_at_k(recommended: &[usize], relevant: &[usize], k: usize) -> f32 {
    if relevant.is_empty() {
        return 0.0;
    }
    let hits = recommended
        .iter()
        .take(k)
        .filter(|&&item| is_relevant(relevant, item))
        .count();
    hits as f32 / relevant.len() as f32
}

/// AP@K: mean of precision at each relevant position, normalized by
/// `min(|relevant|, k)`.
///
/// ```text
/// AP@K = Σ_{r ≤ K, rec[r] relevant} P@r / min(|relevant|, K)
/// ```
///
/// # Examples
///
/// ```
/// use recomendar::metrics::ranking::average_precision_at_k;
///
/// // hits at ranks 1 and 3: (1/1 + 2/3) / 2
/// let ap = average_precision_at_k(&[5, 8, 2], &[2, 5], 10);
/// assert!((ap - 5.0 / 6.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn average_precision_at_k(recommended: &[usize], relevant: &[usize], k: usize) -> f32 {
    let denom = relevant.len().min(k);
    if denom == 0 {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0f32;
    for (rank, &item) in recommended.iter().take(k).enumerate() {
        if is_relevant(relevant, item) {
            hits += 1;
            sum += hits as f32 / (rank + 1) as f32;
        }
    }
    sum / denom as f32
}

/// MAP@K over paired recommendation lists and relevant sets.
///
/// Returns 0.0 for no queries or mismatched lengths.
#[must_use]
pub fn map_at_k(recommended: &[Vec<usize>], relevant: &[Vec<usize>], k: usize) -> f32 {
    if recommended.is_empty() || recommended.len() != relevant.len() {
        return 0.0;
    }
    let total: f32 = recommended
        .iter()
        .zip(relevant)
        .map(|(rec, rel)| average_precision_at_k(rec, rel, k))
        .sum();
    total / recommended.len() as f32
}

/// Aggregate ranking metrics at one cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingMetrics {
    /// Cutoff
    pub k: usize,
    /// Mean average precision
    pub map: f32,
    /// Mean precision
    pub precision: f32,
    /// Mean recall
    pub recall: f32,
    /// Number of evaluated playlists
    pub n_playlists: usize,
}

impl RankingMetrics {
    /// Computes all metrics from paired lists.
    ///
    /// # Examples
    ///
    /// ```
    /// use recomendar::metrics::ranking::RankingMetrics;
    ///
    /// let recommended = vec![vec![1, 2, 3], vec![9, 8, 7]];
    /// let relevant = vec![vec![1], vec![4]];
    ///
    /// let metrics = RankingMetrics::compute(&recommended, &relevant, 3);
    /// assert_eq!(metrics.map, 0.5);
    /// assert_eq!(metrics.recall, 0.5);
    /// ```
    #[must_use]
    pub fn compute(recommended: &[Vec<usize>], relevant: &[Vec<usize>], k: usize) -> Self {
        let n = recommended.len().min(relevant.len());
        let mean = |f: fn(&[usize], &[usize], usize) -> f32| {
            if n == 0 {
                return 0.0;
            }
            recommended
                .iter()
                .zip(relevant)
                .map(|(rec, rel)| f(rec, rel, k))
                .sum::<f32>()
                / n as f32
        };
        Self {
            k,
            map: mean(average_precision_at_k),
            precision: mean(precision_at_k),
            recall: mean(recall_at_k),
            n_playlists: n,
        }
    }

    /// Formatted report.
    #[must_use]
    pub fn report(&self) -> String {
        format!(
            "Ranking Metrics (n={}, k={})\n\
             ─────────────────────\n\
             MAP:       {:>7.5}\n\
             Precision: {:>7.5}\n\
             Recall:    {:>7.5}",
            self.n_playlists, self.k, self.map, self.precision, self.recall
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_at_k() {
        let rec = [1, 2, 3, 4];
        assert_eq!(precision_at_k(&rec, &[1, 3], 1), 1.0);
        assert_eq!(precision_at_k(&rec, &[1, 3], 4), 0.5);
        assert_eq!(precision_at_k(&rec, &[1, 3], 0), 0.0);
        // short lists still divide by k
        assert_eq!(precision_at_k(&[1], &[1], 10), 0.1);
    }

    #[test]
    fn test_recall_at_k() {
        let rec = [1, 2, 3, 4];
        assert_eq!(recall_at_k(&rec, &[1, 9], 4), 0.5);
        assert_eq!(recall_at_k(&rec, &[], 4), 0.0);
        assert_eq!(recall_at_k(&rec, &[2, 4], 2), 0.5);
    }

    #[test]
    fn test_average_precision_perfect() {
        assert_eq!(average_precision_at_k(&[3, 1, 2], &[1, 2, 3], 10), 1.0);
    }

    #[test]
    fn test_average_precision_no_hits() {
        assert_eq!(average_precision_at_k(&[7, 8], &[1, 2], 10), 0.0);
        assert_eq!(average_precision_at_k(&[7, 8], &[], 10), 0.0);
    }

    #[test]
    fn test_average_precision_caps_denominator_at_k() {
        // 20 relevant, both recommended are hits: denominator is min(20, 2)
        let relevant: Vec<usize> = (0..20).collect();
        assert_eq!(average_precision_at_k(&[0, 1], &relevant, 2), 1.0);
    }

    #[test]
    fn test_average_precision_ignores_tail_beyond_k() {
        assert_eq!(average_precision_at_k(&[9, 1], &[1], 1), 0.0);
    }

    #[test]
    fn test_map_at_k() {
        let rec = vec![vec![1, 2], vec![5, 6]];
        let rel = vec![vec![1], vec![6]];
        // AP = 1.0 and 0.5
        assert!((map_at_k(&rec, &rel, 10) - 0.75).abs() < 1e-6);
        assert_eq!(map_at_k(&[], &[], 10), 0.0);
        assert_eq!(map_at_k(&rec, &rel[..1], 10), 0.0);
    }

    #[test]
    fn test_metrics_report() {
        let metrics = RankingMetrics::compute(&[vec![1, 2]], &[vec![2]], 10);
        assert_eq!(metrics.n_playlists, 1);
        assert!((metrics.map - 0.5).abs() < 1e-6);
        let report = metrics.report();
        assert!(report.contains("MAP"));
        assert!(report.contains("n=1"));
    }
}
