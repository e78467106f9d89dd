//! Photometric evaluation of poses by warping neighbour frames into target frames.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use ndarray::{Array2, Array3};
use serde_derive::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::Error,
    image::{resize_depth, IntoImageRgb8, RgbdFrame},
    io::{
        dataset::{offset_frame_index, DatasetError, RgbdDataset, Sample},
        read_trajectory,
    },
    loss::ReprojectionLoss,
    metrics::{LossStats, TransformMetrics},
    options::EvalOptions,
    trajectory::Trajectory,
    transform::Transform,
    warp::warp_image,
};

/// Source of the camera to world poses used for warping.
pub trait PoseProvider {
    fn pose(&self, folder: &str, frame_index: usize) -> Result<Transform, Error>;

    /// Pose of the frame `frame_id` of a loaded sample.
    fn sample_pose(&self, sample: &Sample, frame_id: i32) -> Result<Transform, Error> {
        let frame_index = offset_frame_index(sample.entry.frame_index, frame_id)?;
        self.pose(&sample.entry.folder, frame_index)
    }
}

/// Poses read from the dataset's ground truth.
pub struct GroundTruthPoses<'a> {
    dataset: &'a dyn RgbdDataset,
}

impl<'a> GroundTruthPoses<'a> {
    pub fn new(dataset: &'a dyn RgbdDataset) -> Self {
        Self { dataset }
    }
}

impl PoseProvider for GroundTruthPoses<'_> {
    fn pose(&self, folder: &str, frame_index: usize) -> Result<Transform, Error> {
        Ok(self.dataset.pose(folder, frame_index)?)
    }

    /// Uses the pose loaded with the sample, reading the dataset only when it is missing.
    fn sample_pose(&self, sample: &Sample, frame_id: i32) -> Result<Transform, Error> {
        match sample
            .frame(frame_id)
            .and_then(|frame| frame.camera_to_world.as_ref())
        {
            Some(pose) => Ok(pose.clone()),
            None => {
                let frame_index = offset_frame_index(sample.entry.frame_index, frame_id)?;
                self.pose(&sample.entry.folder, frame_index)
            }
        }
    }
}

/// Predicted trajectories, one per sequence folder, stamped with frame indices.
#[derive(Default)]
pub struct PredictedPoses {
    trajectories: HashMap<String, Trajectory>,
}

impl PredictedPoses {
    pub fn new(trajectories: HashMap<String, Trajectory>) -> Self {
        Self { trajectories }
    }

    /// Path of the trajectory file of `folder` under `dir`: `dir/<folder>.txt`.
    pub fn trajectory_path(dir: &Path, folder: &str) -> PathBuf {
        dir.join(format!("{folder}.txt"))
    }

    /// Reads the trajectories of `folders` from `dir`.
    pub fn from_dir<'f, I>(dir: &Path, folders: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'f str>,
    {
        let mut trajectories = HashMap::new();
        for folder in folders.into_iter().unique() {
            let path = Self::trajectory_path(dir, folder);
            let trajectory = read_trajectory(&path)?;
            info!("Read {} predicted poses from {}", trajectory.len(), path.display());
            trajectories.insert(folder.to_string(), trajectory);
        }
        Ok(Self { trajectories })
    }

    pub fn insert(&mut self, folder: &str, trajectory: Trajectory) {
        self.trajectories.insert(folder.to_string(), trajectory);
    }
}

impl PoseProvider for PredictedPoses {
    fn pose(&self, folder: &str, frame_index: usize) -> Result<Transform, Error> {
        self.trajectories
            .get(folder)
            .and_then(|trajectory| trajectory.at_time(frame_index as f32))
            .cloned()
            .ok_or_else(|| {
                DatasetError::MissingFrame(format!(
                    "no predicted pose for {folder} frame {frame_index}"
                ))
                .into()
            })
    }
}

/// Result of warping one source frame into its target frame.
#[derive(Clone, Debug, Serialize)]
pub struct WarpResult {
    pub folder: String,
    pub frame_index: usize,
    pub frame_id: i32,
    pub scale: usize,
    /// Reprojection loss of the warped source.
    pub loss: LossStats,
    /// Reprojection loss of the unwarped source.
    pub identity_loss: LossStats,
    /// Fraction of target pixels that land inside the source image.
    pub valid_ratio: f32,
    /// Error of the used relative pose against the ground truth one.
    pub pose_error: TransformMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warped_image: Option<PathBuf>,
}

/// Aggregate of the results sharing a frame id and scale.
#[derive(Clone, Debug, Serialize)]
pub struct FrameSummary {
    pub frame_id: i32,
    pub scale: usize,
    /// Statistics of the per-sample mean losses.
    pub loss: LossStats,
    pub identity_loss: LossStats,
    pub valid_ratio: f32,
    pub pose_error: TransformMetrics,
}

impl FrameSummary {
    fn from_results<'r, I: Iterator<Item = &'r WarpResult> + Clone>(
        frame_id: i32,
        scale: usize,
        results: I,
    ) -> Self {
        let count = results.clone().count().max(1) as f32;
        let mut pose_error = TransformMetrics::default();
        for result in results.clone() {
            pose_error.angle += result.pose_error.angle / count;
            pose_error.translation += result.pose_error.translation / count;
        }

        Self {
            frame_id,
            scale,
            loss: LossStats::from_values(results.clone().map(|r| r.loss.mean)),
            identity_loss: LossStats::from_values(results.clone().map(|r| r.identity_loss.mean)),
            valid_ratio: results.map(|r| r.valid_ratio).sum::<f32>() / count,
            pose_error,
        }
    }
}

impl std::fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "frame {} -> 0, scale {}", self.frame_id, self.scale)?;
        writeln!(f, "  warped loss   {}", self.loss)?;
        writeln!(f, "  identity loss {}", self.identity_loss)?;
        writeln!(f, "  valid ratio   {:.4}", self.valid_ratio)?;
        write!(f, "  pose error    {}", self.pose_error)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EvalReport {
    pub options: EvalOptions,
    pub samples: Vec<WarpResult>,
    pub summaries: Vec<FrameSummary>,
}

impl EvalReport {
    /// Builds the report, summarizing `samples` per frame id and scale.
    pub fn new(options: EvalOptions, samples: Vec<WarpResult>) -> Self {
        let summaries = options
            .source_frame_ids()
            .cartesian_product(options.scales.iter().copied())
            .map(|(frame_id, scale)| {
                FrameSummary::from_results(
                    frame_id,
                    scale,
                    samples
                        .iter()
                        .filter(move |r| r.frame_id == frame_id && r.scale == scale),
                )
            })
            .collect();

        Self {
            options,
            samples,
            summaries,
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

impl std::fmt::Display for EvalReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} warps evaluated", self.samples.len())?;
        for summary in &self.summaries {
            writeln!(f, "{summary}")?;
        }
        Ok(())
    }
}

/// File name of a saved warped image.
pub fn warped_image_name(folder: &str, frame_index: usize, frame_id: i32, scale: usize) -> String {
    let folder = folder.replace(['/', '\\'], "_");
    if scale == 0 {
        format!("warped_{folder}_{frame_index:06}_{frame_id}to0.jpg")
    } else {
        format!("warped_{folder}_{frame_index:06}_{frame_id}to0_scale{scale}.jpg")
    }
}

/// Warps the source frames of every dataset sample into their target frame
/// and measures the photometric loss.
pub struct Evaluation {
    options: EvalOptions,
    loss: ReprojectionLoss,
}

impl Evaluation {
    pub fn new(options: EvalOptions) -> Result<Self, Error> {
        options.validate()?;
        if let Some(output_dir) = &options.output_dir {
            std::fs::create_dir_all(output_dir)?;
        }
        let loss = ReprojectionLoss::new(options.ssim_weight);
        Ok(Self { options, loss })
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Evaluates every sample of the dataset.
    pub fn evaluate(
        &self,
        dataset: &dyn RgbdDataset,
        poses: &dyn PoseProvider,
    ) -> Result<EvalReport, Error> {
        let count = self
            .options
            .max_samples
            .map_or(dataset.len(), |max| max.min(dataset.len()));
        if count == 0 {
            warn!("Dataset is empty, nothing to evaluate");
        }

        let mut results = Vec::new();
        for index in 0..count {
            results.extend(self.evaluate_index(dataset, poses, index)?);
        }
        Ok(self.report(results))
    }

    /// Loads and evaluates the sample at `index`.
    pub fn evaluate_index(
        &self,
        dataset: &dyn RgbdDataset,
        poses: &dyn PoseProvider,
        index: usize,
    ) -> Result<Vec<WarpResult>, Error> {
        let sample = dataset.get(index, &self.options.frame_ids)?;
        self.evaluate_sample(&sample, poses)
    }

    /// Summarizes results into a report.
    pub fn report(&self, results: Vec<WarpResult>) -> EvalReport {
        let report = EvalReport::new(self.options.clone(), results);
        for summary in &report.summaries {
            info!(
                "frame {} scale {}: loss {:.5} identity {:.5}",
                summary.frame_id, summary.scale, summary.loss.mean, summary.identity_loss.mean
            );
        }
        report
    }

    /// Warps every source frame of `sample` into its target frame at every scale.
    pub fn evaluate_sample(
        &self,
        sample: &Sample,
        poses: &dyn PoseProvider,
    ) -> Result<Vec<WarpResult>, Error> {
        let entry = &sample.entry;
        let target = sample.frame(0).ok_or_else(|| {
            DatasetError::MissingFrame(format!(
                "target frame of {} {}",
                entry.folder, entry.frame_index
            ))
        })?;
        self.check_frame_size(sample, target)?;
        let target_pose = poses.sample_pose(sample, 0)?;

        let mut results = Vec::new();
        for frame_id in self.options.source_frame_ids() {
            let source = sample.frame(frame_id).ok_or_else(|| {
                DatasetError::MissingFrame(format!(
                    "frame {frame_id} of {} {}",
                    entry.folder, entry.frame_index
                ))
            })?;
            self.check_frame_size(sample, source)?;
            let source_pose = poses.sample_pose(sample, frame_id)?;
            let target_to_source = Transform::relative(&target_pose, &source_pose);

            let pose_error = match (&target.camera_to_world, &source.camera_to_world) {
                (Some(gt_target), Some(gt_source)) => TransformMetrics::new(
                    &target_to_source,
                    &Transform::relative(gt_target, gt_source),
                ),
                _ => TransformMetrics::default(),
            };

            for &scale in &self.options.scales {
                let (mut result, warped) =
                    self.warp_frame(target, source, &target_to_source, scale)?;
                result.warped_image = self.save_warped(
                    &warped,
                    warped_image_name(&entry.folder, entry.frame_index, frame_id, scale),
                )?;
                result.folder = entry.folder.clone();
                result.frame_index = entry.frame_index;
                result.frame_id = frame_id;
                result.pose_error = pose_error.clone();

                debug!(
                    "{} {} frame {frame_id} scale {scale}: loss {:.5}, identity {:.5}",
                    entry.folder, entry.frame_index, result.loss.mean, result.identity_loss.mean
                );
                results.push(result);
            }
        }

        Ok(results)
    }

    /// Scales are validated against the option size, so frames must have it.
    fn check_frame_size(&self, sample: &Sample, frame: &RgbdFrame) -> Result<(), Error> {
        let size = (frame.image.width(), frame.image.height());
        let depth_size = (frame.image.depth.dim().1, frame.image.depth.dim().0);
        if size != (self.options.width, self.options.height) || depth_size != size {
            return Err(Error::invalid_parameter(format!(
                "{} {}: frame is {}x{} (depth {}x{}), expected {}x{}",
                sample.entry.folder,
                sample.entry.frame_index,
                size.0,
                size.1,
                depth_size.0,
                depth_size.1,
                self.options.width,
                self.options.height
            )));
        }
        Ok(())
    }

    fn warp_frame(
        &self,
        target: &RgbdFrame,
        source: &RgbdFrame,
        target_to_source: &Transform,
        scale: usize,
    ) -> Result<(WarpResult, Array3<f32>), Error> {
        let (target, source, depth) = if self.options.v1_multiscale {
            let target = target.at_scale(scale);
            let source = source.at_scale(scale);
            let depth = target.image.depth.clone();
            (target, source, depth)
        } else {
            // Depth of the scale brought back to the full resolution.
            let (width, height) = (target.image.width(), target.image.height());
            let low = resize_depth(&target.image.depth.view(), width >> scale, height >> scale);
            let depth: Array2<f32> = resize_depth(&low.view(), width, height);
            (target.at_scale(0), source.at_scale(0), depth)
        };

        let target_color = target.image.color_f32();
        let source_color = source.image.color_f32();
        let warp = warp_image(
            &source_color.view(),
            &depth.view(),
            &target.camera,
            target_to_source,
        )?;

        let loss = if self.options.mask_invalid_depth {
            self.loss
                .compute_masked(&warp.image.view(), &target_color.view(), &depth.view())?
        } else {
            self.loss.compute(&warp.image.view(), &target_color.view())?
        };
        let identity_loss = self.loss.compute(&source_color.view(), &target_color.view())?;

        let result = WarpResult {
            folder: String::new(),
            frame_index: 0,
            frame_id: 0,
            scale,
            loss: LossStats::from_values(loss.iter().copied()),
            identity_loss: LossStats::from_values(identity_loss.iter().copied()),
            valid_ratio: warp.valid_ratio(source.image.width(), source.image.height()),
            pose_error: TransformMetrics::default(),
            warped_image: None,
        };
        Ok((result, warp.image))
    }

    fn save_warped(&self, image: &Array3<f32>, file_name: String) -> Result<Option<PathBuf>, Error> {
        let Some(output_dir) = &self.options.output_dir else {
            return Ok(None);
        };
        let path = output_dir.join(file_name);
        image.view().into_image_rgb8().save(&path)?;
        Ok(Some(path))
    }
}
