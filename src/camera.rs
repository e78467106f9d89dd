use nalgebra::{Matrix4, Vector3};

/// Camera intrinsic parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length and pixel scale in the X-axis.
    pub fx: f64,
    /// Focal length and pixel scale in the Y-axis.
    pub fy: f64,
    /// Camera X-center.
    pub cx: f64,
    /// Camera Y-center.
    pub cy: f64,
    pub width: Option<usize>,
    pub height: Option<usize>,
}

impl CameraIntrinsics {
    pub fn from_simple_intrinsic(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width: None,
            height: None,
        }
    }

    /// Intrinsics shared by every sequence of the 7-Scenes dataset (Kinect v1, 640x480).
    pub fn seven_scenes() -> Self {
        Self {
            fx: 585.0,
            fy: 585.0,
            cx: 320.0,
            cy: 240.0,
            width: Some(640),
            height: Some(480),
        }
    }

    /// Project a 3D point into image space.
    ///
    /// # Arguments
    ///
    /// * point: The 3D point.
    ///
    /// # Returns
    ///
    /// * (x and y) coordinates.
    pub fn project(&self, point: &Vector3<f32>) -> (f32, f32) {
        (
            point[0] * self.fx as f32 / point[2] + self.cx as f32,
            point[1] * self.fy as f32 / point[2] + self.cy as f32,
        )
    }

    pub fn backproject(&self, x: f32, y: f32, z: f32) -> Vector3<f32> {
        Vector3::new(
            (x - self.cx as f32) * z / self.fx as f32,
            (y - self.cy as f32) * z / self.fy as f32,
            z,
        )
    }

    /// Scale the camera parameters according to the given scale.
    ///
    /// # Arguments
    ///
    /// * scale: The scale factor.
    ///
    /// # Returns
    ///
    /// * A new camera with scaled parameters.
    pub fn scale(&self, scale: f64) -> Self {
        Self {
            fx: self.fx * scale,
            fy: self.fy * scale,
            cx: self.cx * scale,
            cy: self.cy * scale,
            width: self.width.map(|w| (w as f64 * scale) as usize),
            height: self.height.map(|h| (h as f64 * scale) as usize),
        }
    }

    /// Adapts the intrinsics to images resized from `(src_width, src_height)`
    /// into `(width, height)`. Each axis is scaled independently.
    pub fn resize(&self, src_width: usize, src_height: usize, width: usize, height: usize) -> Self {
        let sx = width as f64 / src_width as f64;
        let sy = height as f64 / src_height as f64;
        Self {
            fx: self.fx * sx,
            fy: self.fy * sy,
            cx: self.cx * sx,
            cy: self.cy * sy,
            width: Some(width),
            height: Some(height),
        }
    }

    /// The 4x4 homogeneous intrinsic matrix K.
    #[rustfmt::skip]
    pub fn matrix4(&self) -> Matrix4<f32> {
        Matrix4::new(
            self.fx as f32, 0.0, self.cx as f32, 0.0,
            0.0, self.fy as f32, self.cy as f32, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Closed form inverse of [`Self::matrix4`].
    #[rustfmt::skip]
    pub fn inverse_matrix4(&self) -> Matrix4<f32> {
        let (fx, fy, cx, cy) = (
            self.fx as f32,
            self.fy as f32,
            self.cx as f32,
            self.cy as f32,
        );
        Matrix4::new(
            1.0 / fx, 0.0, -cx / fx, 0.0,
            0.0, 1.0 / fy, -cy / fy, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Vector3};

    use super::CameraIntrinsics;

    #[test]
    fn project_should_invert_backproject() {
        let camera = CameraIntrinsics::seven_scenes();
        let point = camera.backproject(100.0, 400.0, 2.5);
        let (x, y) = camera.project(&point);
        assert_relative_eq!(x, 100.0, epsilon = 1e-3);
        assert_relative_eq!(y, 400.0, epsilon = 1e-3);
    }

    #[test]
    fn inverse_matrix_should_match_generic_inverse() {
        let camera = CameraIntrinsics::seven_scenes();
        let inv_k = camera.inverse_matrix4();
        assert_relative_eq!(camera.matrix4() * inv_k, Matrix4::identity(), epsilon = 1e-6);
        assert_relative_eq!(
            camera.matrix4().try_inverse().unwrap(),
            inv_k,
            epsilon = 1e-6
        );
    }

    #[test]
    fn resize_should_scale_axes_independently() {
        let camera = CameraIntrinsics::seven_scenes().resize(640, 480, 320, 192);
        assert_eq!(camera.fx, 292.5);
        assert_eq!(camera.fy, 585.0 * 0.4);
        assert_eq!(camera.cx, 160.0);
        assert_eq!(camera.cy, 96.0);
        assert_eq!(camera.width, Some(320));
        assert_eq!(camera.height, Some(192));
    }

    #[test]
    fn scale_should_halve_parameters() {
        let camera = CameraIntrinsics::seven_scenes().scale(0.5);
        assert_eq!(camera.fx, 292.5);
        assert_eq!(camera.cy, 120.0);
        assert_eq!(camera.width, Some(320));
        assert_eq!(camera.height, Some(240));
    }

    #[test]
    fn matrix_should_project_like_project() {
        let camera = CameraIntrinsics::seven_scenes();
        let point = Vector3::new(0.3, -0.2, 1.7);
        let hom = camera.matrix4() * point.push(1.0);
        let (x, y) = camera.project(&point);
        assert_relative_eq!(hom[0] / hom[2], x, epsilon = 1e-4);
        assert_relative_eq!(hom[1] / hom[2], y, epsilon = 1e-4);
    }
}
