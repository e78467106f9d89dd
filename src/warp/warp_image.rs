use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use super::{grid_sample, BackprojectDepth, Project3D};
use crate::{camera::CameraIntrinsics, error::Error, transform::Transform};

/// Source image resampled on the target pixel grid.
pub struct Warp {
    /// Warped image, shape `[height, width, channels]`.
    pub image: Array3<f32>,
    /// Source pixel coordinates `(x, y)` of every target pixel, shape `[height, width, 2]`.
    pub coords: Array3<f32>,
}

impl Warp {
    /// Pixels whose sampling coordinates fall inside the source image.
    pub fn valid_mask(&self, source_width: usize, source_height: usize) -> Array2<bool> {
        const TOLERANCE: f32 = 1e-3;
        let max_u = source_width.saturating_sub(1) as f32 + TOLERANCE;
        let max_v = source_height.saturating_sub(1) as f32 + TOLERANCE;

        let (height, width, _) = self.coords.dim();
        Array2::from_shape_fn((height, width), |(y, x)| {
            let (u, v) = (self.coords[(y, x, 0)], self.coords[(y, x, 1)]);
            u >= -TOLERANCE && v >= -TOLERANCE && u <= max_u && v <= max_v
        })
    }

    /// Fraction of target pixels that see the source image.
    pub fn valid_ratio(&self, source_width: usize, source_height: usize) -> f32 {
        let mask = self.valid_mask(source_width, source_height);
        if mask.is_empty() {
            return 0.0;
        }
        mask.iter().filter(|valid| **valid).count() as f32 / mask.len() as f32
    }
}

/// Warps `source` into the target view.
///
/// # Arguments
///
/// * `source` - Source image, shape `[height, width, channels]`.
/// * `target_depth` - Depth of the target frame in metres.
/// * `camera` - Intrinsics shared by both frames.
/// * `target_to_source` - Transform from target camera points to source camera points.
pub fn warp_image(
    source: &ArrayView3<f32>,
    target_depth: &ArrayView2<f32>,
    camera: &CameraIntrinsics,
    target_to_source: &Transform,
) -> Result<Warp, Error> {
    let (height, width) = target_depth.dim();
    let points = BackprojectDepth::new(height, width).forward(target_depth, &camera.inverse_matrix4())?;
    let coords = Project3D::new(height, width).forward(
        &points.view(),
        &camera.matrix4(),
        &target_to_source.to_matrix4(),
    )?;
    let image = grid_sample(source, &coords.view())?;

    Ok(Warp { image, coords })
}
