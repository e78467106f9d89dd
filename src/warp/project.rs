use nalgebra::{Matrix4, Vector4};
use ndarray::{Array3, ArrayView2, Axis};

use crate::error::Error;

/// Projects homogeneous camera points into the pixel grid of another camera.
pub struct Project3D {
    height: usize,
    width: usize,
    eps: f32,
}

impl Project3D {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            eps: 1e-7,
        }
    }

    /// Computes the pixel coordinates of `K * T * points`.
    ///
    /// # Arguments
    ///
    /// * `points` - Homogeneous points with shape `[4, height * width]`.
    /// * `k` - 4x4 intrinsic matrix of the destination camera.
    /// * `t` - Transform from the points' camera into the destination camera.
    ///
    /// # Returns
    ///
    /// * Pixel coordinates `(x, y)` with shape `[height, width, 2]`. Points that land
    ///   on or behind the destination camera plane get `NaN` coordinates.
    pub fn forward(
        &self,
        points: &ArrayView2<f32>,
        k: &Matrix4<f32>,
        t: &Matrix4<f32>,
    ) -> Result<Array3<f32>, Error> {
        if points.dim() != (4, self.height * self.width) {
            return Err(Error::invalid_parameter(format!(
                "points shape {:?} does not match the projection grid {:?}",
                points.dim(),
                (4, self.height * self.width)
            )));
        }

        let projection = k * t;
        let mut pix_coords = Array3::<f32>::zeros((self.height, self.width, 2));
        for (i, point) in points.axis_iter(Axis(1)).enumerate() {
            let cam = projection * Vector4::new(point[0], point[1], point[2], point[3]);
            let (row, col) = (i / self.width, i % self.width);
            if cam[2] <= 0.0 {
                pix_coords[(row, col, 0)] = f32::NAN;
                pix_coords[(row, col, 1)] = f32::NAN;
            } else {
                pix_coords[(row, col, 0)] = cam[0] / (cam[2] + self.eps);
                pix_coords[(row, col, 1)] = cam[1] / (cam[2] + self.eps);
            }
        }

        Ok(pix_coords)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Vector3};
    use ndarray::Array2;

    use super::Project3D;
    use crate::{camera::CameraIntrinsics, warp::BackprojectDepth};

    #[test]
    fn identity_should_give_back_the_pixel_grid() {
        let camera = CameraIntrinsics::from_simple_intrinsic(40.0, 40.0, 8.0, 6.0);
        let depth = Array2::from_shape_fn((12, 16), |(y, _)| 1.0 + y as f32);
        let points = BackprojectDepth::new(12, 16)
            .forward(&depth.view(), &camera.inverse_matrix4())
            .unwrap();
        let coords = Project3D::new(12, 16)
            .forward(&points.view(), &camera.matrix4(), &Matrix4::identity())
            .unwrap();

        for ((y, x), _) in depth.indexed_iter() {
            assert_relative_eq!(coords[(y, x, 0)], x as f32, epsilon = 1e-3);
            assert_relative_eq!(coords[(y, x, 1)], y as f32, epsilon = 1e-3);
        }
    }

    #[test]
    fn translation_should_shift_pixels() {
        let camera = CameraIntrinsics::from_simple_intrinsic(50.0, 50.0, 8.0, 6.0);
        let depth = Array2::from_elem((12, 16), 2.0);
        let points = BackprojectDepth::new(12, 16)
            .forward(&depth.view(), &camera.inverse_matrix4())
            .unwrap();
        let shift = Matrix4::new_translation(&Vector3::new(-0.08, 0.0, 0.0));
        let coords = Project3D::new(12, 16)
            .forward(&points.view(), &camera.matrix4(), &shift)
            .unwrap();

        assert_relative_eq!(coords[(3, 5, 0)], 3.0, epsilon = 1e-3);
        assert_relative_eq!(coords[(3, 5, 1)], 3.0, epsilon = 1e-3);
    }

    #[test]
    fn points_behind_camera_should_be_nan() {
        let camera = CameraIntrinsics::from_simple_intrinsic(50.0, 50.0, 8.0, 6.0);
        let depth = Array2::from_elem((12, 16), 1.0);
        let points = BackprojectDepth::new(12, 16)
            .forward(&depth.view(), &camera.inverse_matrix4())
            .unwrap();
        let behind = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -2.0));
        let coords = Project3D::new(12, 16)
            .forward(&points.view(), &camera.matrix4(), &behind)
            .unwrap();
        assert!(coords.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn wrong_points_shape_should_fail() {
        let points = Array2::<f32>::zeros((4, 10));
        assert!(Project3D::new(12, 16)
            .forward(&points.view(), &Matrix4::identity(), &Matrix4::identity())
            .is_err());
    }
}
