//! Property-based tests using proptest.
//!
//! These tests verify the recommendation invariants on random interaction matrices.

use recomendar::prelude::*;
use recomendar::similarity::compute_similarity;
use proptest::prelude::*;

// Strategy for generating small binary interaction matrices
fn urm_strategy() -> impl Strategy<Value = CsrMatrix> {
    (2usize..8, 3usize..16).prop_flat_map(|(rows, cols)| {
        proptest::collection::vec(prop::bool::weighted(0.3), rows * cols).prop_map(move |cells| {
            let data: Vec<f32> = cells.into_iter().map(|c| if c { 1.0 } else { 0.0 }).collect();
            CsrMatrix::from_dense(rows, cols, &data).expect("Test data should be valid")
        })
    })
}

// Interaction matrix plus a track x attribute matrix with one row per track
fn case_strategy() -> impl Strategy<Value = (CsrMatrix, CsrMatrix)> {
    urm_strategy().prop_flat_map(|urm| {
        let items = urm.ncols();
        (1usize..5).prop_flat_map(move |attrs| {
            let urm = urm.clone();
            proptest::collection::vec(prop::bool::weighted(0.4), items * attrs).prop_map(
                move |cells| {
                    let data: Vec<f32> =
                        cells.into_iter().map(|c| if c { 1.0 } else { 0.0 }).collect();
                    let icm = CsrMatrix::from_dense(items, attrs, &data)
                        .expect("Test data should be valid");
                    (urm.clone(), icm)
                },
            )
        })
    })
}

// SLIM-BPR needs one playlist with a positive and a negative to sample
fn trainable(urm: &CsrMatrix, config: &ModelConfig) -> bool {
    config.kind() != ModelKind::SlimBpr
        || (0..urm.nrows()).any(|p| urm.row_nnz(p) > 0 && urm.row_nnz(p) < urm.ncols())
}

fn similarity_strategy() -> impl Strategy<Value = SimilarityConfig> {
    (1usize..20, 0.0f32..20.0, any::<bool>()).prop_map(|(k, shrink, normalize)| {
        SimilarityConfig::default()
            .with_k(k)
            .with_shrink(shrink)
            .with_normalize(normalize)
    })
}

fn model_strategy() -> impl Strategy<Value = ModelConfig> {
    prop_oneof![
        similarity_strategy().prop_map(ModelConfig::ItemCf),
        similarity_strategy().prop_map(ModelConfig::UserCf),
        similarity_strategy().prop_map(ModelConfig::ContentBased),
        (1usize..6, 1usize..20).prop_map(|(f, k)| {
            ModelConfig::ItemSvd(SvdConfig::default().with_n_factors(f).with_k(k))
        }),
        (1usize..4, 1usize..20, any::<u64>()).prop_map(|(epochs, k, seed)| {
            ModelConfig::SlimBpr(
                BprConfig::default()
                    .with_epochs(epochs)
                    .with_top_k(k)
                    .with_random_state(seed),
            )
        }),
        (1e-4f32..0.1, 0.0f32..=1.0, any::<bool>()).prop_map(|(alpha, l1_ratio, positive)| {
            ModelConfig::SlimElastic(
                ElasticNetConfig::default()
                    .with_alpha(alpha)
                    .with_l1_ratio(l1_ratio)
                    .with_positive_only(positive),
            )
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn similarity_rows_bounded_with_zero_diagonal(
        urm in urm_strategy(),
        config in similarity_strategy(),
    ) {
        for axis in [Axis::Item, Axis::User] {
            let sim = compute_similarity(&urm, axis, &config).expect("valid config");
            for i in 0..sim.nrows() {
                prop_assert!(sim.row_nnz(i) <= config.k);
                prop_assert_eq!(sim.get(i, i), 0.0);
            }
        }
    }

    #[test]
    fn recommendations_exclude_seen_and_fill_up(
        (urm, icm) in case_strategy(),
        config in model_strategy(),
    ) {
        prop_assume!(trainable(&urm, &config));
        let rec = Recommender::fit(urm.clone(), &config, Some(&icm)).expect("fit");
        for p in 0..urm.nrows() {
            let list = rec.recommend(p).expect("known playlist");
            let eligible = urm.ncols() - urm.row_nnz(p);
            prop_assert_eq!(list.len(), eligible.min(10));
            for &t in &list {
                prop_assert_eq!(urm.get(p, t), 0.0);
            }
            let mut sorted = list.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), list.len());
        }
    }

    #[test]
    fn recommendations_are_deterministic(
        (urm, icm) in case_strategy(),
        config in model_strategy(),
    ) {
        prop_assume!(trainable(&urm, &config));
        let rec = Recommender::fit(urm.clone(), &config, Some(&icm)).expect("fit");
        let again = Recommender::fit(urm.clone(), &config, Some(&icm)).expect("fit");
        for p in 0..urm.nrows() {
            let first = rec.recommend(p).expect("known playlist");
            prop_assert_eq!(&first, &rec.recommend(p).expect("known playlist"));
            prop_assert_eq!(&first, &again.recommend(p).expect("known playlist"));
        }
    }

    #[test]
    fn single_weight_ensemble_matches_standalone(
        (urm, icm) in case_strategy(),
        slot in 0usize..5,
    ) {
        let mut weights = [0.0; 5];
        weights[slot] = 1.0;
        let config = EnsembleConfig::default()
            .with_normalization(Normalization::None)
            .with_weights(&weights)
            .expect("five weights");
        prop_assume!(trainable(&urm, &config.slots[slot].model));
        let ensemble = config.fit(urm.clone(), Some(&icm)).expect("fit");
        let standalone = Recommender::fit(urm.clone(), &config.slots[slot].model, Some(&icm))
            .expect("fit");

        for p in 0..urm.nrows() {
            prop_assert_eq!(
                ensemble.recommend(p).expect("known playlist"),
                standalone.recommend(p).expect("known playlist")
            );
        }
    }

    #[test]
    fn shrink_never_increases_similarity(
        urm in urm_strategy(),
        shrink in 0.0f32..10.0,
        extra in 0.1f32..10.0,
    ) {
        let k = urm.ncols();
        let low = SimilarityConfig::default().with_k(k).with_shrink(shrink);
        let high = low.with_shrink(shrink + extra);
        let a = compute_similarity(&urm, Axis::Item, &low).expect("valid config");
        let b = compute_similarity(&urm, Axis::Item, &high).expect("valid config");
        for (i, j, v) in b.iter() {
            prop_assert!(v <= a.get(i, j) + 1e-6);
        }
    }
}
