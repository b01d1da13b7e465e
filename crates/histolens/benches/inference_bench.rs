//! Benchmarks for classification and attribution latency.
//!
//! Run with: cargo bench --bench inference_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage};

use histolens_core::backend::Attribution;
use histolens_infer::ExplainablePipeline;
use histolens_models::default_registry;
use histolens_vision::Preprocessor;

/// Create a synthetic tile for benchmarking.
fn synthetic_tile(side: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(side, side, |x, y| {
        Rgb([(x * 7 % 256) as u8, ((x + y) * 3 % 256) as u8, (y * 5 % 256) as u8])
    }))
}

fn bench_pipeline(arch: &'static str, size: usize) -> ExplainablePipeline<Attribution> {
    let device = Default::default();
    let model = default_registry::<Attribution>()
        .create(arch, &serde_json::json!({}), &device)
        .unwrap();
    ExplainablePipeline::with_model(model, device)
        .with_preprocessor(Preprocessor::new().with_size(size))
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let tile = synthetic_tile(512);

    for size in [64usize, 128, 224] {
        let pipeline = bench_pipeline("tissuenet", size);
        group.bench_with_input(BenchmarkId::new("tissuenet", size), &size, |b, _| {
            b.iter(|| pipeline.classify(black_box(&tile)).unwrap())
        });
    }

    group.finish();
}

fn bench_explain(c: &mut Criterion) {
    let mut group = c.benchmark_group("explain");
    group.sample_size(10);
    let tile = synthetic_tile(512);

    for arch in ["tissuenet", "resnet18"] {
        let pipeline = bench_pipeline(arch, 224);
        group.bench_with_input(BenchmarkId::new(arch, 224), arch, |b, _| {
            b.iter(|| pipeline.explain(black_box(&tile), None).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify, bench_explain);
criterion_main!(benches);
