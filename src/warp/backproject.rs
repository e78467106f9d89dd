use nalgebra::Matrix4;
use ndarray::{Array2, ArrayView2, Axis};

use crate::error::Error;

/// Lifts every pixel of a depth map into a 3D homogeneous camera point.
pub struct BackprojectDepth {
    height: usize,
    width: usize,
    /// Homogeneous pixel grid `[x, y, 1]`, shape `[3, height * width]`, row major pixels.
    pix_coords: Array2<f32>,
}

impl BackprojectDepth {
    pub fn new(height: usize, width: usize) -> Self {
        let mut pix_coords = Array2::<f32>::ones((3, height * width));
        for (i, mut column) in pix_coords.axis_iter_mut(Axis(1)).enumerate() {
            column[0] = (i % width) as f32;
            column[1] = (i / width) as f32;
        }

        Self {
            height,
            width,
            pix_coords,
        }
    }

    /// Computes `depth * K^-1 * [x, y, 1]` for every pixel.
    ///
    /// # Arguments
    ///
    /// * `depth` - Depth map with shape `[height, width]`.
    /// * `inv_k` - Inverse of the 4x4 intrinsic matrix.
    ///
    /// # Returns
    ///
    /// * Homogeneous points `[X, Y, Z, 1]` with shape `[4, height * width]`.
    pub fn forward(&self, depth: &ArrayView2<f32>, inv_k: &Matrix4<f32>) -> Result<Array2<f32>, Error> {
        if depth.dim() != (self.height, self.width) {
            return Err(Error::invalid_parameter(format!(
                "depth shape {:?} does not match the backprojection grid {:?}",
                depth.dim(),
                (self.height, self.width)
            )));
        }

        let inv_k = inv_k.fixed_slice::<3, 3>(0, 0);
        let mut points = Array2::<f32>::ones((4, self.height * self.width));
        for ((mut point, pixel), z) in points
            .axis_iter_mut(Axis(1))
            .zip(self.pix_coords.axis_iter(Axis(1)))
            .zip(depth.iter())
        {
            for row in 0..3 {
                let ray = inv_k[(row, 0)] * pixel[0] + inv_k[(row, 1)] * pixel[1] + inv_k[(row, 2)] * pixel[2];
                point[row] = ray * z;
            }
        }

        Ok(points)
    }
}
