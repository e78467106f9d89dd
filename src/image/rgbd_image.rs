use ndarray::{Array2, Array3};

use crate::{camera::CameraIntrinsics, transform::Transform};

use super::{resize_depth, resize_rgb, to_float_image};

/// A convenience struct that holds a color image and a metric depth image of the same size.
pub struct RgbdImage {
    /// Color image, shape `[height, width, 3]`.
    pub color: Array3<u8>,
    /// Depth in metres, 0 for invalid pixels.
    pub depth: Array2<f32>,
}

impl RgbdImage {
    pub fn new(color: Array3<u8>, depth: Array2<f32>) -> Self {
        Self { color, depth }
    }

    pub fn width(&self) -> usize {
        self.color.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.color.shape()[0]
    }

    /// Color converted to floats in [0, 1].
    pub fn color_f32(&self) -> Array3<f32> {
        to_float_image(&self.color.view())
    }

    /// Resizes color (bilinear) and depth (nearest).
    pub fn resize(&self, width: usize, height: usize) -> RgbdImage {
        RgbdImage {
            color: resize_rgb(&self.color.view(), width, height),
            depth: resize_depth(&self.depth.view(), width, height),
        }
    }
}

/// One frame of a sequence: image, intrinsics and ground truth pose.
pub struct RgbdFrame {
    pub camera: CameraIntrinsics,
    pub image: RgbdImage,
    /// Ground truth camera to world pose, when the dataset has one.
    pub camera_to_world: Option<Transform>,
}

impl RgbdFrame {
    pub fn new(
        camera: CameraIntrinsics,
        image: RgbdImage,
        camera_to_world: Option<Transform>,
    ) -> Self {
        Self {
            camera,
            image,
            camera_to_world,
        }
    }

    /// Resizes the image and adapts the intrinsics accordingly.
    pub fn resize(&self, width: usize, height: usize) -> RgbdFrame {
        RgbdFrame {
            camera: self
                .camera
                .resize(self.image.width(), self.image.height(), width, height),
            image: self.image.resize(width, height),
            camera_to_world: self.camera_to_world.clone(),
        }
    }

    /// Frame at pyramid `scale`, that is, with each side divided by `2^scale`.
    /// Sides never shrink below one pixel.
    pub fn at_scale(&self, scale: usize) -> RgbdFrame {
        let (width, height) = (self.image.width(), self.image.height());
        self.resize(
            width.checked_shr(scale as u32).unwrap_or(0).max(1),
            height.checked_shr(scale as u32).unwrap_or(0).max(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3};
    use rstest::rstest;

    use super::*;
    use crate::unit_test::gradient_rgb;

    #[rstest]
    fn at_scale_should_halve_sizes(gradient_rgb: Array3<u8>) {
        let frame = RgbdFrame::new(
            CameraIntrinsics::from_simple_intrinsic(50.0, 50.0, 32.0, 24.0),
            RgbdImage::new(gradient_rgb, Array2::from_elem((48, 64), 1.5)),
            None,
        );

        let scaled = frame.at_scale(1);
        assert_eq!(scaled.image.width(), 32);
        assert_eq!(scaled.image.height(), 24);
        assert_eq!(scaled.image.depth.dim(), (24, 32));
        assert_eq!(scaled.camera.fx, 25.0);
        assert_eq!(scaled.camera.cy, 12.0);
        assert!(scaled.image.depth.iter().all(|d| *d == 1.5));

        let tiny = frame.at_scale(9);
        assert_eq!(tiny.image.depth.dim(), (1, 1));

        let same = frame.at_scale(0);
        assert_eq!(same.camera, frame.camera.resize(64, 48, 64, 48));
        assert_eq!(same.image.color, frame.image.color);
    }
}
