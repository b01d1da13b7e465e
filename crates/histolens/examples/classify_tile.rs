//! Classify a tissue tile and render its attribution overlay.
//!
//! Run with: cargo run --example classify_tile --release -- tile.png
//!
//! With a trained checkpoint:
//!   cargo run --example classify_tile --release -- tile.png runs/model_best.mpk
//!
//! Without arguments a synthetic tile is used, with randomly initialized
//! weights, so the output demonstrates the pipeline rather than a diagnosis.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};

use histolens::prelude::*;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let image = match args.get(1) {
        Some(path) => ImageLoader::from_path(std::path::Path::new(path))
            .with_context(|| format!("failed to load {path}"))?,
        None => {
            println!("No image given, using a synthetic tile\n");
            synthetic_tile(256)
        }
    };

    let device = Default::default();
    let registry = default_registry::<Attribution>();
    let model = registry.create("tissuenet", &serde_json::json!({}), &device)?;

    let model = match args.get(2) {
        Some(checkpoint) => model
            .load_weights(checkpoint, &device)
            .with_context(|| format!("failed to load checkpoint {checkpoint}"))?,
        None => {
            println!("No checkpoint given, using randomly initialized weights\n");
            model
        }
    };

    let pipeline = ExplainablePipeline::with_model(model, device);
    let explanation = pipeline.explain(&image, None)?;

    println!(
        "Prediction: {} ({:.1}% confidence)",
        explanation.classification.label,
        explanation.classification.confidence * 100.0,
    );
    for (label, prob) in &explanation.classification.probabilities {
        println!("  {:<10} {:>6.1}%", label.as_str(), prob * 100.0);
    }

    explanation
        .overlay
        .save("gradcam.png")
        .context("failed to write gradcam.png")?;
    println!("\nWrote attribution overlay to gradcam.png");

    Ok(())
}

fn synthetic_tile(side: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(side, side, |x, y| {
        Rgb([(x * 7 % 256) as u8, ((x + y) * 3 % 256) as u8, (y * 5 % 256) as u8])
    }))
}
