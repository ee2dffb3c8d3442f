use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recomendar::ensemble::{EnsembleConfig, EnsembleSlot};
use recomendar::prelude::*;
use recomendar::recommend::top_n;
use recomendar::similarity::compute_similarity;

/// Synthetic playlists: each draws 20 tracks, mostly from one of 10 genres.
fn generate_urm(n_playlists: usize, n_items: usize) -> CsrMatrix {
    let genre_size = n_items / 10;
    let mut state: u64 = 42;
    let mut next = move || {
        // LCG, deterministic across runs
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };

    let mut coo = CooMatrix::new(n_playlists, n_items);
    for p in 0..n_playlists {
        let genre = p % 10;
        for _ in 0..20 {
            let track = if next() % 5 == 0 {
                next() % n_items
            } else {
                genre * genre_size + next() % genre_size
            };
            coo.push(p, track, 1.0).expect("in range");
        }
    }
    coo.to_csr().binarized()
}

fn bench_item_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity_item_cosine");
    group.sample_size(20);

    for &n_items in &[500, 2_000, 5_000] {
        let urm = generate_urm(n_items * 2, n_items);
        let config = SimilarityConfig::default();
        group.throughput(Throughput::Elements(n_items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_items), &urm, |b, urm| {
            b.iter(|| compute_similarity(black_box(urm), Axis::Item, &config));
        });
    }

    group.finish();
}

fn bench_slim_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("slim_bpr_epoch");
    group.sample_size(10);

    for &n_items in &[500, 1_000] {
        let urm = generate_urm(n_items * 2, n_items);
        let config = BprConfig::default().with_epochs(1).with_top_k(100);
        group.throughput(Throughput::Elements(urm.nnz() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_items), &urm, |b, urm| {
            b.iter(|| config.fit(black_box(urm)));
        });
    }

    group.finish();
}

fn bench_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend_top10");

    for &n_items in &[1_000, 5_000] {
        let urm = generate_urm(n_items * 2, n_items);
        let config = EnsembleConfig::new(vec![
            EnsembleSlot::new(1.0, ModelConfig::ItemCf(SimilarityConfig::default())),
            EnsembleSlot::new(0.5, ModelConfig::UserCf(SimilarityConfig::default())),
        ]);
        let ensemble = config.fit(urm, None).expect("fit");

        group.bench_with_input(BenchmarkId::from_parameter(n_items), &ensemble, |b, ensemble| {
            b.iter(|| ensemble.recommend(black_box(7)));
        });
    }

    group.finish();
}

fn bench_top_n(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking_top_n");

    for &n_items in &[10_000, 100_000] {
        let scores: Vec<f32> = (0..n_items).map(|i| ((i * 7919) % 1000) as f32).collect();
        let seen: Vec<usize> = (0..n_items).step_by(97).collect();
        group.throughput(Throughput::Elements(n_items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_items), &scores, |b, scores| {
            b.iter(|| top_n(black_box(scores), &seen, 10));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_item_similarity,
    bench_slim_epoch,
    bench_recommend,
    bench_top_n
);
criterion_main!(benches);
