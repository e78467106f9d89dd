use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{bail, Result};
use itertools::Itertools;
use kdam::tqdm;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warp3d::{
    eval::{Evaluation, GroundTruthPoses, PoseProvider, PredictedPoses},
    io::{
        dataset::{DatasetLayout, RgbdDataset, SevenScenesDataset, SubsetDataset},
        read_split, read_trajectory,
    },
    metrics::TransformMetrics,
    options::{EvalOptions, EvalOverrides},
};

#[derive(Parser)]
#[command(author, version, about = "Photometric evaluation of poses on 7-Scenes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Warps the neighbour frames into every target frame and reports the photometric loss
    Warp(WarpArgs),
    /// Compares a predicted trajectory with the ground truth one
    Poses(PosesArgs),
}

#[derive(Args)]
struct WarpArgs {
    /// Path to the 7-Scenes root directory
    #[arg(long)]
    data_path: PathBuf,
    /// Split file with `folder frame_index` lines
    #[arg(long)]
    split: Option<PathBuf>,
    /// Sequence folders to evaluate entirely (e.g. chess/seq-01), used without --split
    #[arg(long)]
    sequence: Vec<String>,
    /// JSON options file, the flags below override it
    #[arg(long)]
    options: Option<PathBuf>,
    #[command(flatten)]
    overrides: EvalOverrides,
    /// Where to write the JSON report
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct PosesArgs {
    /// Path to the 7-Scenes root directory
    #[arg(long)]
    data_path: PathBuf,
    /// Sequence folder, e.g. chess/seq-01
    #[arg(long)]
    sequence: String,
    /// Predicted trajectory, `frame_index tx ty tz qx qy qz qw` lines
    #[arg(long)]
    predicted: PathBuf,
    #[arg(long, default_value = "flat")]
    layout: DatasetLayout,
}

fn run_warp(args: WarpArgs) -> Result<()> {
    let options = EvalOptions::load(args.options.as_deref(), &args.overrides)?;

    let dataset: Box<dyn RgbdDataset> = {
        let dataset = match &args.split {
            Some(split) => SevenScenesDataset::new(&args.data_path, read_split(split)?)?,
            None if !args.sequence.is_empty() => {
                SevenScenesDataset::new(&args.data_path, Vec::new())?
                    .with_layout(options.layout)
                    .with_sequences(&args.sequence, &options.frame_ids)?
            }
            None => bail!("either --split or --sequence is required"),
        }
        .with_layout(options.layout)
        .with_size(options.width, options.height)
        .with_depth_scale(options.depth_scale);

        match options.max_samples {
            Some(max_samples) => Box::new(SubsetDataset::first(Box::new(dataset), max_samples)),
            None => Box::new(dataset),
        }
    };

    let poses: Box<dyn PoseProvider + '_> = match &options.predicted_poses {
        Some(dir) => {
            let folders = (0..dataset.len())
                .filter_map(|index| dataset.entry(index))
                .map(|entry| entry.folder.as_str())
                .unique()
                .collect::<Vec<_>>();
            Box::new(PredictedPoses::from_dir(dir, folders)?)
        }
        None => Box::new(GroundTruthPoses::new(dataset.as_ref())),
    };

    let count = dataset.len();
    info!("Evaluating {count} samples");

    let evaluation = Evaluation::new(options)?;
    let mut results = Vec::new();
    for index in tqdm!(0..count, total = count, desc = "Warping samples") {
        results.extend(evaluation.evaluate_index(dataset.as_ref(), poses.as_ref(), index)?);
    }

    let report = evaluation.report(results);
    println!("{report}");
    if let Some(path) = &args.report {
        report.write_json(path)?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}

fn run_poses(args: PosesArgs) -> Result<()> {
    let dataset = SevenScenesDataset::new(&args.data_path, Vec::new())?.with_layout(args.layout);
    let gt_trajectory = dataset.trajectory(&args.sequence)?;
    let (metrics, count) =
        TransformMetrics::aligned_trajectory_error(&read_trajectory(&args.predicted)?, &gt_trajectory)?;
    println!("{count} poses compared");
    println!("Mean trajectory error: {metrics}");
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Warp(args) => run_warp(args),
        Command::Poses(args) => run_poses(args),
    }
}
