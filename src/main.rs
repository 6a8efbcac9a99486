use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use tryon::garment::{open_garment_image, open_person_image};
use tryon::pose_landmarks::{FixedLandmarks, LandmarkSet, PoseEstimator};
use tryon::{Config, GarmentCategory, TryOn};

/// Dress a person photo in transparent garment images.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Person photograph (JPEG or PNG)
    person: PathBuf,

    /// Upper-body garment PNG with transparency
    #[arg(long)]
    shirt: Option<PathBuf>,

    /// Lower-body garment PNG with transparency
    #[arg(long)]
    pants: Option<PathBuf>,

    /// Landmarks as JSON instead of running a pose model
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// MoveNet single-pose ONNX model
    #[cfg(feature = "movenet")]
    #[arg(long, conflicts_with = "landmarks")]
    model: Option<PathBuf>,

    /// TOML file with placement tuning
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "tryon_result.png")]
    output: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if args.shirt.is_none() && args.pants.is_none() {
        bail!("nothing to try on: pass --shirt and/or --pants");
    }

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    let estimator = build_estimator(&args, &config)?;
    let tryon = TryOn::new(estimator, config.placement);

    let person = open_person_image(&args.person)
        .with_context(|| format!("failed to read person image {}", args.person.display()))?;
    let shirt = args
        .shirt
        .as_ref()
        .map(|p| {
            open_garment_image(p, GarmentCategory::Upper)
                .with_context(|| format!("failed to read shirt {}", p.display()))
        })
        .transpose()?;
    let pants = args
        .pants
        .as_ref()
        .map(|p| {
            open_garment_image(p, GarmentCategory::Lower)
                .with_context(|| format!("failed to read pants {}", p.display()))
        })
        .transpose()?;

    let result = tryon.dress(person, shirt.as_ref(), pants.as_ref())?;

    result
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("wrote {}", args.output.display());

    Ok(())
}

fn build_estimator(args: &Args, config: &Config) -> Result<Box<dyn PoseEstimator>> {
    if let Some(estimator) = model_estimator(args, config)? {
        return Ok(estimator);
    }

    let Some(path) = &args.landmarks else {
        bail!("no pose source: pass --landmarks (or --model with the movenet feature)");
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read landmarks {}", path.display()))?;
    let landmarks: LandmarkSet = serde_json::from_str(&json)
        .with_context(|| format!("invalid landmarks in {}", path.display()))?;

    Ok(Box::new(FixedLandmarks(Some(landmarks))))
}

#[cfg(feature = "movenet")]
fn model_estimator(args: &Args, config: &Config) -> Result<Option<Box<dyn PoseEstimator>>> {
    use tryon::pose_landmarks::model_movenet::MoveNetEstimator;

    let Some(model) = &args.model else {
        return Ok(None);
    };
    let estimator = MoveNetEstimator::new(model, config.detector.min_score)
        .with_context(|| format!("failed to load pose model {}", model.display()))?;
    info!("loaded pose model {}", model.display());
    Ok(Some(Box::new(estimator)))
}

#[cfg(not(feature = "movenet"))]
fn model_estimator(_args: &Args, _config: &Config) -> Result<Option<Box<dyn PoseEstimator>>> {
    Ok(None)
}
