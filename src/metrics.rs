use ordered_float::OrderedFloat;
use serde_derive::Serialize;

use crate::{error::Error, trajectory::Trajectory, transform::Transform};

/// Metrics for comparing two transforms.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TransformMetrics {
    /// Angle between the two transforms in radians.
    pub angle: f32,
    /// Translation vector size between the two transforms.
    pub translation: f32,
}

impl TransformMetrics {
    /// Creates a new `TransformMetrics` from two transforms.
    pub fn new(lfs: &Transform, rhs: &Transform) -> Self {
        let lfs_inv = lfs.inverse();
        let diff = &lfs_inv * rhs;

        Self {
            angle: diff.angle(),
            translation: diff.translation().norm(),
        }
    }

    /// Mean pose error between two trajectories of same length.
    pub fn mean_trajectory_error(
        pred_trajectory: &Trajectory,
        gt_trajectory: &Trajectory,
    ) -> Result<Self, Error> {
        if pred_trajectory.len() != gt_trajectory.len() {
            return Err(Error::invalid_parameter(
                "Pred and GT trajectories have different lengths.",
            ));
        }

        if pred_trajectory.is_empty() {
            return Ok(Self::default());
        }

        let mut accum_metrics = TransformMetrics::default();
        for (pred, gt) in pred_trajectory.iter().zip(gt_trajectory.iter()) {
            let metrics = Self::new(&pred.0, &gt.0);
            accum_metrics.angle += metrics.angle;
            accum_metrics.translation += metrics.translation;
        }

        let count = pred_trajectory.len() as f32;
        accum_metrics.angle /= count;
        accum_metrics.translation /= count;
        Ok(accum_metrics)
    }

    /// Mean pose error between the frames that both trajectories share, paired
    /// by timestamp. Both trajectories are anchored at their first shared frame.
    ///
    /// # Returns
    ///
    /// * The mean error and the number of compared poses.
    pub fn aligned_trajectory_error(
        pred_trajectory: &Trajectory,
        gt_trajectory: &Trajectory,
    ) -> Result<(Self, usize), Error> {
        let (pred, gt) = pred_trajectory.align_by_time(gt_trajectory);
        if pred.is_empty() {
            return Err(Error::invalid_parameter(
                "Pred and GT trajectories have no timestamp in common.",
            ));
        }

        let metrics =
            Self::mean_trajectory_error(&pred.first_frame_at_origin(), &gt.first_frame_at_origin())?;
        Ok((metrics, pred.len()))
    }

    /// Returns the total error of the two transforms.
    pub fn total(&self) -> f32 {
        self.angle + self.translation
    }
}

impl std::fmt::Display for TransformMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "angle: {:.2}°, translation: {:.5}",
            self.angle.to_degrees(),
            self.translation
        )
    }
}

/// Summary statistics of a set of loss values.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LossStats {
    pub mean: f32,
    pub median: f32,
    pub min: f32,
    pub max: f32,
    pub count: usize,
}

impl LossStats {
    /// Computes the statistics ignoring non finite values.
    pub fn from_values<I: IntoIterator<Item = f32>>(values: I) -> Self {
        let mut values = values
            .into_iter()
            .filter(|v| v.is_finite())
            .map(OrderedFloat)
            .collect::<Vec<_>>();
        if values.is_empty() {
            return Self::default();
        }
        values.sort_unstable();

        let count = values.len();
        let sum: f32 = values.iter().map(|v| v.0).sum();
        let median = if count % 2 == 1 {
            values[count / 2].0
        } else {
            (values[count / 2 - 1].0 + values[count / 2].0) * 0.5
        };

        Self {
            mean: sum / count as f32,
            median,
            min: values[0].0,
            max: values[count - 1].0,
            count,
        }
    }
}

impl std::fmt::Display for LossStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mean: {:.5}, median: {:.5}, min: {:.5}, max: {:.5} ({} samples)",
            self.mean, self.median, self.min, self.max, self.count
        )
    }
}
