//! histolens CLI for classification, attribution, and serving.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use histolens_core::backend::Attribution;
use histolens_infer::ExplainablePipeline;
use histolens_models::{
    default_registry, locate_checkpoint, metadata_path, AnyModel, CheckpointMetadata,
};
use histolens_server::ServerConfig;
use histolens_vision::ImageLoader;

#[derive(Parser)]
#[command(name = "histolens")]
#[command(author, version)]
#[command(about = "Explainable histopathology image classification")]
#[command(long_about = "histolens: benign/malignant tissue classification with Grad-CAM attribution.

EXAMPLES:
  # Classify a tile
  histolens predict --image tile.png --checkpoint runs/

  # Explain the malignant logit and save the overlay
  histolens explain --image tile.png --checkpoint runs/ --target-class 1 --output cam.png

  # Serve the HTTP API (use -v for request logs)
  histolens serve --checkpoint runs/ --bind 0.0.0.0:8000

AVAILABLE MODELS:
  TissueNet (tissuenet) - depthwise-separable CNN trained from scratch [default]
  ResNet-18 (resnet18)  - residual network")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an image
    Predict {
        /// Path to the image to classify
        #[arg(long, value_name = "PATH")]
        image: PathBuf,

        /// Checkpoint file or directory containing one
        #[arg(long, value_name = "PATH")]
        checkpoint: PathBuf,

        /// Model architecture; defaults to the checkpoint metadata
        #[arg(long, value_name = "MODEL")]
        arch: Option<String>,

        /// Print the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Classify an image and render the attribution overlay
    Explain {
        /// Path to the image to classify
        #[arg(long, value_name = "PATH")]
        image: PathBuf,

        /// Checkpoint file or directory containing one
        #[arg(long, value_name = "PATH")]
        checkpoint: PathBuf,

        /// Model architecture; defaults to the checkpoint metadata
        #[arg(long, value_name = "MODEL")]
        arch: Option<String>,

        /// Class index to attribute; defaults to the predicted class
        #[arg(long, value_name = "CLASS")]
        target_class: Option<usize>,

        /// Where to write the overlay PNG
        #[arg(long, default_value = "gradcam.png", value_name = "PATH")]
        output: PathBuf,
    },
    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0:8000", value_name = "ADDR")]
        bind: String,

        /// Checkpoint file or directory; without one the server starts degraded
        #[arg(long, value_name = "PATH")]
        checkpoint: Option<PathBuf>,

        /// Model architecture; defaults to the checkpoint metadata
        #[arg(long, value_name = "MODEL")]
        arch: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "30", value_name = "SECS")]
        timeout_secs: u64,

        /// Maximum request body size in MiB
        #[arg(long, default_value = "10", value_name = "MIB")]
        body_limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Predict {
            image,
            checkpoint,
            arch,
            json,
        } => handle_predict(&image, &checkpoint, arch.as_deref(), json),
        Commands::Explain {
            image,
            checkpoint,
            arch,
            target_class,
            output,
        } => handle_explain(&image, &checkpoint, arch.as_deref(), target_class, &output),
        Commands::Serve {
            bind,
            checkpoint,
            arch,
            timeout_secs,
            body_limit,
        } => handle_serve(
            &bind,
            checkpoint.as_deref(),
            arch.as_deref(),
            timeout_secs,
            body_limit,
        ),
    }
}

fn handle_predict(image: &Path, checkpoint: &Path, arch: Option<&str>, json: bool) -> Result<()> {
    let pipeline = load_pipeline(checkpoint, arch)?;
    let image = ImageLoader::from_path(image)
        .with_context(|| format!("failed to load image {}", image.display()))?;

    let result = pipeline.classify(&image)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_classification(&result);
    }
    Ok(())
}

fn handle_explain(
    image: &Path,
    checkpoint: &Path,
    arch: Option<&str>,
    target_class: Option<usize>,
    output: &Path,
) -> Result<()> {
    let pipeline = load_pipeline(checkpoint, arch)?;
    let decoded = ImageLoader::from_path(image)
        .with_context(|| format!("failed to load image {}", image.display()))?;

    let explanation = pipeline.explain(&decoded, target_class)?;

    print_classification(&explanation.classification);
    explanation
        .overlay
        .save(output)
        .with_context(|| format!("failed to write overlay to {}", output.display()))?;
    println!("\nWrote attribution overlay to {}", output.display());
    Ok(())
}

fn handle_serve(
    bind: &str,
    checkpoint: Option<&Path>,
    arch: Option<&str>,
    timeout_secs: u64,
    body_limit: usize,
) -> Result<()> {
    let device = Default::default();
    let mut pipeline = ExplainablePipeline::<Attribution>::new(device);

    match checkpoint {
        Some(path) => {
            let model = load_model(path, arch)?;
            println!("Loaded {} checkpoint from {}", model.architecture(), path.display());
            pipeline.attach_model(model);
        }
        None => {
            println!("No checkpoint given; serving degraded until one is loaded");
        }
    }

    let config = ServerConfig::new(bind)
        .with_request_timeout_secs(timeout_secs)
        .with_max_request_size(body_limit * 1024 * 1024);
    println!("Serving on http://{bind}");

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(histolens_server::serve(config, pipeline))?;
    Ok(())
}

/// Build a pipeline from a checkpoint path, consulting the sidecar metadata
/// for the architecture when `--arch` is not given.
fn load_pipeline(checkpoint: &Path, arch: Option<&str>) -> Result<ExplainablePipeline<Attribution>> {
    let device = Default::default();
    let model = load_model(checkpoint, arch)?;
    Ok(ExplainablePipeline::with_model(model, device))
}

fn load_model(checkpoint: &Path, arch: Option<&str>) -> Result<AnyModel<Attribution>> {
    let weights = resolve_checkpoint(checkpoint)?;
    let arch = resolve_arch(&weights, arch)?;

    let device = Default::default();
    let registry = default_registry::<Attribution>();
    let model = registry
        .create(&arch, &serde_json::json!({}), &device)
        .with_context(|| format!("failed to construct architecture '{arch}'"))?;

    model
        .load_weights(&weights, &device)
        .with_context(|| format!("failed to load weights from {}", weights.display()))
}

/// Accept either a checkpoint file or a run directory containing one.
fn resolve_checkpoint(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        locate_checkpoint(path)
            .ok_or_else(|| anyhow!("no checkpoint found in directory {}", path.display()))
    } else if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        bail!("checkpoint path {} does not exist", path.display());
    }
}

fn resolve_arch(weights: &Path, arch: Option<&str>) -> Result<String> {
    if let Some(name) = arch {
        return Ok(name.to_string());
    }
    match CheckpointMetadata::load(metadata_path(weights)) {
        Ok(metadata) => Ok(metadata.arch),
        Err(_) => {
            tracing::info!("no checkpoint metadata found, assuming tissuenet");
            Ok("tissuenet".to_string())
        }
    }
}

fn print_classification(result: &histolens_core::ClassificationResult) {
    println!("Prediction: {}", result.label);
    println!("Confidence: {:.1}%", result.confidence * 100.0);
    println!("\nClass probabilities:");
    for (label, prob) in &result.probabilities {
        println!("  {:<10} {:>6.1}%", label.as_str(), prob * 100.0);
    }
}
