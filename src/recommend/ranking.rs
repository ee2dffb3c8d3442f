//! Top-N extraction from a dense relevance vector.

use std::cmp::Ordering;

/// Number of tracks recommended per playlist unless asked otherwise.
pub const DEFAULT_TOP_N: usize = 10;

/// Orders by descending score (NaN lowest, signed zeros equal), then ascending item index.
fn by_score(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    rank_key(b.1).total_cmp(&rank_key(a.1)).then(a.0.cmp(&b.0))
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

/// The `n` best items of `scores` that are not listed in `seen`.
///
/// `seen` must be sorted ascending (a CSR row's indices). Candidates are
/// partitioned with `select_nth_unstable_by`, and only the surviving `n` are
/// sorted, so the cost is linear in the catalog size. Fewer than `n` eligible
/// items yields a shorter list.
///
/// # Examples
///
/// ```
/// use recomendar::recommend::top_n;
///
/// let scores = [0.1, 0.9, 0.5, 0.5, f32::NAN];
/// assert_eq!(top_n(&scores, &[1], 3), vec![2, 3, 0]);
/// ```
#[must_use]
pub fn top_n(scores: &[f32], seen: &[usize], n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }

    let mut seen_iter = seen.iter().copied().peekable();
    let mut candidates: Vec<(usize, f32)> = Vec::with_capacity(scores.len() - seen.len().min(scores.len()));
    for (item, &score) in scores.iter().enumerate() {
        while seen_iter.next_if(|&s| s < item).is_some() {}
        if seen_iter.next_if_eq(&item).is_some() {
            continue;
        }
        candidates.push((item, score));
    }

    if candidates.len() > n {
        candidates.select_nth_unstable_by(n - 1, by_score);
        candidates.truncate(n);
    }
    candidates.sort_unstable_by(by_score);
    candidates.into_iter().map(|(item, _)| item).collect()
}
