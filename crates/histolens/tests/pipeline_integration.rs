//! Integration tests for the full classify-and-explain pipeline.
//!
//! These tests verify end-to-end behavior with synthetic tiles: checkpoint
//! round trips, resolution handling, and cross-thread consistency.

use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use histolens_core::backend::Attribution;
use histolens_infer::ExplainablePipeline;
use histolens_models::{default_registry, AnyModel};
use histolens_vision::Preprocessor;

const TEST_SIZE: usize = 64;

/// Create a synthetic tile with enough structure that predictions are not
/// degenerate.
fn synthetic_tile(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 7 % 256) as u8;
        let g = ((x + y) * 3 % 256) as u8;
        let b = (y * 5 % 256) as u8;
        Rgb([r, g, b])
    }))
}

fn fresh_model(arch: &str) -> AnyModel<Attribution> {
    let device = Default::default();
    default_registry::<Attribution>()
        .create(arch, &serde_json::json!({ "width_mult": 0.25 }), &device)
        .unwrap()
}

fn pipeline_with(model: AnyModel<Attribution>) -> ExplainablePipeline<Attribution> {
    ExplainablePipeline::with_model(model, Default::default())
        .with_preprocessor(Preprocessor::new().with_size(TEST_SIZE))
}

#[test]
fn test_checkpoint_round_trip_preserves_predictions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.mpk");
    let device = Default::default();

    let original = fresh_model("tissuenet");
    original.save_weights(&path).unwrap();
    let restored = fresh_model("tissuenet").load_weights(&path, &device).unwrap();

    let tile = synthetic_tile(96, 96);
    let before = pipeline_with(original).classify(&tile).unwrap();
    let after = pipeline_with(restored).classify(&tile).unwrap();

    assert_eq!(before.label, after.label);
    assert_eq!(before.probabilities, after.probabilities);
}

#[test]
fn test_checkpoint_round_trip_preserves_attribution() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.mpk");
    let device = Default::default();

    let original = fresh_model("tissuenet");
    original.save_weights(&path).unwrap();
    let restored = fresh_model("tissuenet").load_weights(&path, &device).unwrap();

    let tile = synthetic_tile(96, 96);
    let before = pipeline_with(original).explain(&tile, None).unwrap();
    let after = pipeline_with(restored).explain(&tile, None).unwrap();

    assert_eq!(before.classification.label, after.classification.label);
    assert_eq!(before.cam.data(), after.cam.data());
}

#[test]
fn test_overlay_matches_processed_resolution() {
    // A tiny thumbnail and a full-scanner frame both land at the processed
    // resolution.
    for (width, height) in [(50, 50), (4000, 3000)] {
        let pipeline = pipeline_with(fresh_model("tissuenet"));
        let explanation = pipeline.explain(&synthetic_tile(width, height), None).unwrap();

        assert_eq!(explanation.overlay.width() as usize, TEST_SIZE);
        assert_eq!(explanation.overlay.height() as usize, TEST_SIZE);
        assert_eq!(explanation.cam.width(), TEST_SIZE);
        assert_eq!(explanation.cam.height(), TEST_SIZE);
    }
}

#[test]
fn test_uniform_gray_tile_is_deterministic() {
    // Full processed resolution, repeated calls on one pipeline.
    let gray = DynamicImage::ImageRgb8(RgbImage::from_pixel(224, 224, Rgb([128, 128, 128])));
    let pipeline = ExplainablePipeline::with_model(fresh_model("tissuenet"), Default::default());

    let first = pipeline.classify(&gray).unwrap();
    let second = pipeline.classify(&gray).unwrap();
    assert_eq!(first.label, second.label);
    assert_eq!(first.probabilities, second.probabilities);

    let cam_a = pipeline.explain(&gray, None).unwrap().cam;
    let cam_b = pipeline.explain(&gray, None).unwrap().cam;
    assert_eq!(cam_a.data(), cam_b.data());
}

#[test]
fn test_loaded_checkpoints_agree_across_threads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.mpk");

    fresh_model("tissuenet").save_weights(&path).unwrap();

    let tile = synthetic_tile(80, 80);
    let device = Default::default();
    let baseline_model = fresh_model("tissuenet").load_weights(&path, &device).unwrap();
    let baseline = pipeline_with(baseline_model).classify(&tile).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            let tile = tile.clone();
            std::thread::spawn(move || {
                let device = Default::default();
                let model = fresh_model("tissuenet").load_weights(&path, &device).unwrap();
                pipeline_with(model).classify(&tile).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert_eq!(result.label, baseline.label);
        assert_eq!(result.probabilities, baseline.probabilities);
    }
}

#[test]
fn test_both_architectures_serve_the_pipeline() {
    let tile = synthetic_tile(96, 96);
    let device = Default::default();
    let registry = default_registry::<Attribution>();

    for (arch, config) in [
        ("tissuenet", serde_json::json!({ "width_mult": 0.25 })),
        ("resnet18", serde_json::json!({ "base_channels": 8 })),
    ] {
        let model = registry.create(arch, &config, &device).unwrap();
        let pipeline = pipeline_with(model);

        let explanation = pipeline.explain(&tile, None).unwrap();
        let sum: f32 = explanation.classification.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-5, "{arch} probabilities sum to {sum}");

        for value in explanation.cam.data() {
            assert!((0.0..=1.0).contains(value), "{arch} cam value {value} out of range");
        }
    }
}
