use nalgebra::{Isometry3, Matrix4, Quaternion, Rotation3, Translation3, UnitQuaternion, Vector3};

use std::ops;

/// Rigid transform. Dataset poses are camera to world.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform(Isometry3<f32>);

impl Transform {
    pub fn eye() -> Self {
        Self(Isometry3::identity())
    }

    /// Creates a transform from a translation and a (non normalized) rotation quaternion.
    pub fn new(translation: &Vector3<f32>, rotation: &Quaternion<f32>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::from(*translation),
            UnitQuaternion::from_quaternion(*rotation),
        ))
    }

    /// Creates a transform from a 4x4 homogeneous matrix. The upper-left 3x3
    /// block is projected to the closest rotation.
    pub fn from_matrix4(matrix: &Matrix4<f32>) -> Self {
        let translation = Translation3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(
            &matrix.fixed_slice::<3, 3>(0, 0).into_owned(),
        ));
        Self(Isometry3::from_parts(translation, rotation))
    }

    pub fn to_matrix4(&self) -> Matrix4<f32> {
        self.0.to_homogeneous()
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f32 {
        self.0.rotation.angle()
    }

    pub fn translation(&self) -> Vector3<f32> {
        self.0.translation.vector
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.0.rotation
    }

    /// Transform that maps points in the camera of `target` into the camera of `source`,
    /// given both camera to world poses.
    pub fn relative(target: &Transform, source: &Transform) -> Transform {
        &source.inverse() * target
    }
}

/// Relative transform between two homogeneous 4x4 poses: `pose2^-1 * pose1`.
/// With camera to world poses, it takes points from camera 1 into camera 2.
/// Returns `None` when `pose2` is singular.
pub fn relative_pose_matrix(pose1: &Matrix4<f32>, pose2: &Matrix4<f32>) -> Option<Matrix4<f32>> {
    pose2.try_inverse().map(|pose2_inv| pose2_inv * pose1)
}

impl ops::Mul<&Vector3<f32>> for &Transform {
    type Output = Vector3<f32>;

    fn mul(self, rhs: &Vector3<f32>) -> Self::Output {
        self.0.transform_point(&(*rhs).into()).coords
    }
}

impl ops::Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Self::Output {
        Transform(self.0 * rhs.0)
    }
}

impl From<Transform> for Matrix4<f32> {
    fn from(transform: Transform) -> Self {
        transform.0.into()
    }
}

impl From<&Transform> for Matrix4<f32> {
    fn from(transform: &Transform) -> Self {
        transform.to_matrix4()
    }
}
