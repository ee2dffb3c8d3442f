pub(crate) use super::*;
use crate::primitives::CooMatrix;
use proptest::prelude::*;

/// 3 playlists x 5 tracks: p0 = {1, 3}, p1 = {0, 1, 2}, p2 = {2, 3, 4}
fn scenario_urm() -> CsrMatrix {
    CooMatrix::from_triplets(
        3,
        5,
        vec![
            (0, 1, 1.0),
            (0, 3, 1.0),
            (1, 0, 1.0),
            (1, 1, 1.0),
            (1, 2, 1.0),
            (2, 2, 1.0),
            (2, 3, 1.0),
            (2, 4, 1.0),
        ],
    )
    .expect("in bounds")
    .to_csr()
}

fn raw_cooccurrence() -> SimilarityConfig {
    SimilarityConfig::default()
        .with_k(5)
        .with_shrink(0.0)
        .with_normalize(false)
}

#[test]
fn test_item_cooccurrence_counts() {
    let sim = compute_similarity(&scenario_urm(), Axis::Item, &raw_cooccurrence()).expect("valid");
    assert_eq!(sim.shape(), (5, 5));
    assert_eq!(sim.get(1, 0), 1.0);
    assert_eq!(sim.get(1, 2), 1.0);
    assert_eq!(sim.get(1, 3), 1.0);
    assert_eq!(sim.get(3, 4), 1.0);
    assert_eq!(sim.get(0, 4), 0.0);
}

#[test]
fn test_scenario_scores_for_first_playlist() {
    let urm = scenario_urm();
    let sim = compute_similarity(&urm, Axis::Item, &raw_cooccurrence()).expect("valid");
    let scores = sim.vecmat(urm.row(0)).expect("dims");
    // seen items are not excluded here, ranking does that
    assert_eq!(scores, vec![1.0, 1.0, 2.0, 1.0, 1.0]);
}

#[test]
fn test_cosine_normalized_with_shrink() {
    let urm = scenario_urm();
    let plain = SimilarityConfig::default().with_k(5).with_shrink(0.0);
    let sim = compute_similarity(&urm, Axis::Item, &plain).expect("valid");
    // items 1 and 3 share p0, both have two playlists: 1 / (sqrt2 * sqrt2)
    assert!((sim.get(1, 3) - 0.5).abs() < 1e-6);

    let shrunk = compute_similarity(&urm, Axis::Item, &plain.with_shrink(10.0)).expect("valid");
    assert!((shrunk.get(1, 3) - 1.0 / 12.0).abs() < 1e-6);
}

#[test]
fn test_diagonal_zero_and_k_bound() {
    let urm = scenario_urm();
    for k in 1..=4 {
        let sim = compute_similarity(&urm, Axis::Item, &raw_cooccurrence().with_k(k))
            .expect("valid");
        for i in 0..5 {
            assert_eq!(sim.get(i, i), 0.0);
            assert!(sim.row_nnz(i) <= k);
        }
    }
}

#[test]
fn test_knn_tie_break_keeps_smaller_index() {
    // item 1 is tied at 1.0 with items 0, 2 and 3
    let sim = compute_similarity(&scenario_urm(), Axis::Item, &raw_cooccurrence().with_k(2))
        .expect("valid");
    assert_eq!(sim.row(1).indices(), &[0, 2]);
}

#[test]
fn test_user_axis_shape() {
    let sim = compute_similarity(&scenario_urm(), Axis::User, &raw_cooccurrence()).expect("valid");
    assert_eq!(sim.shape(), (3, 3));
    // p0 and p1 share track 1, p0 and p2 share track 3
    assert_eq!(sim.get(0, 1), 1.0);
    assert_eq!(sim.get(0, 2), 1.0);
    assert_eq!(sim.get(1, 2), 1.0);
    assert_eq!(sim.get(0, 0), 0.0);
}

#[test]
fn test_empty_entity_has_empty_row() {
    let urm = CsrMatrix::from_dense(2, 3, &[1.0, 1.0, 0.0, 1.0, 0.0, 0.0]).expect("2x3");
    let sim = compute_similarity(&urm, Axis::Item, &raw_cooccurrence()).expect("valid");
    assert_eq!(sim.row_nnz(2), 0);
}

#[test]
fn test_p3alpha_rows_are_stochastic_when_normalized() {
    let config = SimilarityConfig::default()
        .with_k(5)
        .with_metric(SimilarityMetric::P3Alpha { alpha: 1.0 });
    let sim = compute_similarity(&scenario_urm(), Axis::Item, &config).expect("valid");
    for i in 0..5 {
        let sum: f32 = sim.row(i).values().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "row {i} sums to {sum}");
        assert_eq!(sim.get(i, i), 0.0);
    }
}

#[test]
fn test_rp3beta_with_zero_beta_matches_p3alpha() {
    let urm = scenario_urm();
    let p3 = SimilarityConfig::default()
        .with_k(5)
        .with_normalize(false)
        .with_metric(SimilarityMetric::P3Alpha { alpha: 0.8 });
    let rp3 = p3.with_metric(SimilarityMetric::RP3Beta { alpha: 0.8, beta: 0.0 });
    let a = compute_similarity(&urm, Axis::Item, &p3).expect("valid");
    let b = compute_similarity(&urm, Axis::Item, &rp3).expect("valid");
    assert_eq!(a, b);
}

#[test]
fn test_rp3beta_penalizes_popular_targets() {
    let urm = scenario_urm();
    let p3 = SimilarityConfig::default()
        .with_k(5)
        .with_normalize(false)
        .with_metric(SimilarityMetric::P3Alpha { alpha: 1.0 });
    let rp3 = p3.with_metric(SimilarityMetric::RP3Beta { alpha: 1.0, beta: 0.5 });
    let a = compute_similarity(&urm, Axis::Item, &p3).expect("valid");
    let b = compute_similarity(&urm, Axis::Item, &rp3).expect("valid");
    // item 2 appears in two playlists, item 0 in one
    assert!((b.get(1, 2) - a.get(1, 2) / 2.0f32.sqrt()).abs() < 1e-6);
    assert!((b.get(1, 0) - a.get(1, 0)).abs() < 1e-6);
}

#[test]
fn test_row_similarity_over_features() {
    // 3 tracks x 2 attributes, tracks 0 and 2 share attribute 1
    let icm = CsrMatrix::from_dense(3, 2, &[0.0, 1.0, 1.0, 0.0, 0.0, 1.0]).expect("3x2");
    let sim = compute_row_similarity(&icm, &raw_cooccurrence()).expect("valid");
    assert_eq!(sim.shape(), (3, 3));
    assert_eq!(sim.get(0, 2), 1.0);
    assert_eq!(sim.get(0, 1), 0.0);
}

#[test]
fn test_validate_rejects_bad_parameters() {
    let base = SimilarityConfig::default();
    assert!(base.with_k(0).validate().is_err());
    assert!(base.with_shrink(-1.0).validate().is_err());
    assert!(base.with_shrink(f32::NAN).validate().is_err());
    assert!(base
        .with_metric(SimilarityMetric::P3Alpha { alpha: -0.1 })
        .validate()
        .is_err());
    assert!(base
        .with_metric(SimilarityMetric::RP3Beta { alpha: 1.0, beta: f32::INFINITY })
        .validate()
        .is_err());

    let err = compute_similarity(&scenario_urm(), Axis::Item, &base.with_k(0)).unwrap_err();
    assert!(matches!(err, RecomendarError::InvalidHyperparameter { .. }));
}

#[test]
fn test_config_serde_defaults() {
    let config: SimilarityConfig =
        serde_json::from_str(r#"{"k": 50, "metric": {"type": "rp3_beta", "alpha": 1.0, "beta": 0.6}}"#)
            .expect("deserialize");
    assert_eq!(config.k, 50);
    assert_eq!(config.shrink, 10.0);
    assert_eq!(config.metric, SimilarityMetric::RP3Beta { alpha: 1.0, beta: 0.6 });
}

fn arb_urm() -> impl Strategy<Value = CsrMatrix> {
    (2usize..8, 2usize..8).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(prop::bool::weighted(0.4), rows * cols).prop_map(move |cells| {
            let dense: Vec<f32> = cells.iter().map(|&c| if c { 1.0 } else { 0.0 }).collect();
            CsrMatrix::from_dense(rows, cols, &dense).expect("generated shape")
        })
    })
}

proptest! {
    #[test]
    fn prop_rows_bounded_by_k_without_diagonal(urm in arb_urm(), k in 1usize..6) {
        let sim = compute_similarity(&urm, Axis::Item, &SimilarityConfig::default().with_k(k))
            .expect("valid");
        for i in 0..sim.nrows() {
            prop_assert!(sim.row_nnz(i) <= k);
            prop_assert_eq!(sim.get(i, i), 0.0);
        }
    }

    #[test]
    fn prop_shrink_never_increases_magnitude(
        urm in arb_urm(),
        low in 0.0f32..5.0,
        extra in 0.0f32..20.0,
        normalize in any::<bool>(),
    ) {
        let n = urm.ncols();
        let base = SimilarityConfig::default().with_k(n).with_normalize(normalize);
        let a = compute_similarity(&urm, Axis::Item, &base.with_shrink(low)).expect("valid");
        let b = compute_similarity(&urm, Axis::Item, &base.with_shrink(low + extra)).expect("valid");
        for i in 0..n {
            for j in 0..n {
                prop_assert!(b.get(i, j).abs() <= a.get(i, j).abs() + 1e-6);
            }
        }
    }
}
