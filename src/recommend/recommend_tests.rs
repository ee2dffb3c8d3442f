pub(crate) use super::*;
use crate::primitives::CooMatrix;

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

fn cooccurrence() -> SimilarityConfig {
    SimilarityConfig::default()
        .with_k(5)
        .with_shrink(0.0)
        .with_normalize(false)
}

fn all_configs() -> Vec<ModelConfig> {
    vec![
        ModelConfig::ItemCf(cooccurrence()),
        ModelConfig::UserCf(cooccurrence()),
        ModelConfig::ContentBased(cooccurrence()),
        ModelConfig::ItemSvd(SvdConfig::default().with_n_factors(3).with_k(4)),
        ModelConfig::SlimBpr(BprConfig::default().with_epochs(3)),
        ModelConfig::SlimElastic(ElasticNetConfig::default().with_alpha(1e-3)),
    ]
}

/// One-hot album attribute: tracks {0, 1} share album 0, {2, 3, 4} album 1.
fn features() -> CsrMatrix {
    CsrMatrix::from_dense(5, 2, &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0])
        .expect("5x2")
}

#[test]
fn test_item_cf_scenario() {
    let rec = Recommender::fit(scenario_urm(), &ModelConfig::ItemCf(cooccurrence()), None)
        .expect("fit");
    assert_eq!(rec.recommend(0).expect("known"), vec![2, 0, 4]);
    let scores = rec.score(0).expect("known");
    assert_eq!(scores, vec![1.0, 1.0, 2.0, 1.0, 1.0]);
}

#[test]
fn test_user_cf_scenario() {
    let rec = Recommender::fit(scenario_urm(), &ModelConfig::UserCf(cooccurrence()), None)
        .expect("fit");
    assert_eq!(rec.model().matrix().shape(), (3, 3));
    assert_eq!(rec.recommend(0).expect("known"), vec![2, 0, 4]);
}

#[test]
fn test_every_model_excludes_seen_and_is_deterministic() {
    let urm = Arc::new(scenario_urm());
    for config in all_configs() {
        let rec = Recommender::fit(Arc::clone(&urm), &config, Some(&features())).expect("fit");
        for p in 0..3 {
            let top = rec.recommend(p).expect("known");
            let seen = urm.row(p);
            assert!(top.iter().all(|&i| !seen.contains(i)), "{config:?} p{p}");
            assert_eq!(top.len(), 5 - seen.nnz(), "{config:?} p{p}");
            assert_eq!(top, rec.recommend(p).expect("known"));
        }
    }
}

#[test]
fn test_recommend_n_truncates() {
    let rec = Recommender::fit(scenario_urm(), &ModelConfig::ItemCf(cooccurrence()), None)
        .expect("fit");
    assert_eq!(rec.recommend_n(0, 1).expect("known"), vec![2]);
    assert!(rec.recommend_n(0, 0).expect("known").is_empty());
}

#[test]
fn test_unknown_playlist() {
    let rec = Recommender::fit(scenario_urm(), &ModelConfig::ItemCf(cooccurrence()), None)
        .expect("fit");
    let err = rec.recommend(3).unwrap_err();
    assert!(matches!(
        err,
        RecomendarError::UnknownPlaylist {
            playlist: 3,
            n_playlists: 3
        }
    ));
    assert!(rec.score(99).is_err());
}

#[test]
fn test_empty_playlist_scores_zero() {
    let urm = CsrMatrix::from_dense(2, 3, &[0.0, 0.0, 0.0, 1.0, 1.0, 0.0]).expect("2x3");
    let rec = Recommender::fit(urm, &ModelConfig::ItemCf(cooccurrence()), None).expect("fit");
    assert_eq!(rec.score(0).expect("known"), vec![0.0; 3]);
    // all ties, ascending index
    assert_eq!(rec.recommend(0).expect("known"), vec![0, 1, 2]);
}

#[test]
fn test_content_based_uses_features() {
    let rec = Recommender::fit(
        scenario_urm(),
        &ModelConfig::ContentBased(cooccurrence()),
        Some(&features()),
    )
    .expect("fit");
    // p0 = {1, 3}: track 0 shares an album with 1, tracks 2 and 4 with 3
    let scores = rec.score(0).expect("known");
    assert_eq!(scores[0], 1.0);
    assert_eq!(scores[2], 1.0);
    assert_eq!(scores[4], 1.0);
}

#[test]
fn test_content_based_requires_features() {
    let config = ModelConfig::ContentBased(cooccurrence());
    let err = Recommender::fit(scenario_urm(), &config, None).unwrap_err();
    assert!(matches!(err, RecomendarError::MissingFeatures(_)));

    let wrong = CsrMatrix::zeros(4, 2);
    let err = Recommender::fit(scenario_urm(), &config, Some(&wrong)).unwrap_err();
    assert!(matches!(err, RecomendarError::DimensionMismatch { .. }));
}

#[test]
fn test_invalid_config_fails_before_fit() {
    let config = ModelConfig::ItemCf(cooccurrence().with_k(0));
    let err = Recommender::fit(scenario_urm(), &config, None).unwrap_err();
    assert!(matches!(err, RecomendarError::InvalidHyperparameter { .. }));

    let config = ModelConfig::SlimBpr(BprConfig::default().with_epochs(0));
    assert!(config.validate().is_err());
}

#[test]
fn test_from_parts_checks_dimensions() {
    let urm = Arc::new(scenario_urm());
    let item_model = TrainedModel::new(ModelKind::ItemCf, CsrMatrix::zeros(5, 5));
    assert!(Recommender::from_parts(Arc::clone(&urm), item_model).is_ok());

    let wrong = TrainedModel::new(ModelKind::ItemCf, CsrMatrix::zeros(4, 4));
    assert!(matches!(
        Recommender::from_parts(Arc::clone(&urm), wrong).unwrap_err(),
        RecomendarError::DimensionMismatch { .. }
    ));

    let user_model = TrainedModel::new(ModelKind::UserCf, CsrMatrix::zeros(5, 5));
    assert!(Recommender::from_parts(urm, user_model).is_err());
}

#[test]
fn test_model_config_serde_tag() {
    for config in all_configs() {
        let json = serde_json::to_string(&config).expect("serialize");
        let back: ModelConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
    let svd: ModelConfig = serde_json::from_str(r#"{"model": "item_svd"}"#).expect("defaults");
    assert_eq!(svd, ModelConfig::ItemSvd(SvdConfig::default()));

    let elastic: ModelConfig =
        serde_json::from_str(r#"{"model": "slim_elastic", "alpha": 0.01, "positive_only": true}"#)
            .expect("defaults");
    assert_eq!(elastic.kind(), ModelKind::SlimElastic);
    assert_eq!(
        elastic,
        ModelConfig::SlimElastic(ElasticNetConfig::default().with_alpha(0.01))
    );
}

#[test]
fn test_slim_elastic_scores_through_learned_weights() {
    let rec = Recommender::fit(
        scenario_urm(),
        &ModelConfig::SlimElastic(ElasticNetConfig::default().with_alpha(1e-3)),
        None,
    )
    .expect("fit");
    let weights = rec.model().matrix();
    assert_eq!(weights.shape(), (5, 5));
    assert!(weights.iter().all(|(_, _, w)| w > 0.0));
    // track 0 is the cheapest way to reconstruct track 1 in p1
    assert!(weights.get(0, 1) > 0.5);
    let scores = rec.score(0).expect("known");
    assert_eq!(scores, weights.vecmat(rec.urm().row(0)).expect("square"));
    let top = rec.recommend(0).expect("known");
    assert!(!top.contains(&1) && !top.contains(&3));
}

#[test]
fn test_recommender_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Recommender>();
    assert_send_sync::<TrainedModel>();
}
