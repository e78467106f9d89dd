use std::ops::Index;

use crate::transform::Transform;

/// Trajectory of camera poses, ground truth or predicted.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    /// Camera poses, transforms points from camera to world.
    pub camera_to_world: Vec<Transform>,
    /// Timestamps of each pose. For 7-Scenes these are frame indices.
    pub times: Vec<f32>,
}

impl Trajectory {
    /// Adds a new pose to the trajectory.
    ///
    /// # Arguments
    ///
    /// * `camera_to_world` - Transform from camera to world.
    /// * `time` - Timestamp of the pose.
    pub fn push(&mut self, camera_to_world: Transform, time: f32) {
        self.camera_to_world.push(camera_to_world);
        self.times.push(time);
    }

    /// Returns the number of poses in the trajectory.
    pub fn len(&self) -> usize {
        self.camera_to_world.len()
    }

    /// Returns true if the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.camera_to_world.is_empty()
    }

    /// Returns the transform that takes points from the camera at `from_index`
    /// into the camera at `dest_index`.
    pub fn get_relative_transform(
        &self,
        from_index: usize,
        dest_index: usize,
    ) -> Option<Transform> {
        let from = self.camera_to_world.get(from_index)?;
        let dest = self.camera_to_world.get(dest_index)?;
        Some(Transform::relative(from, dest))
    }

    /// Position of the pose stamped with `time`.
    pub fn index_of(&self, time: f32) -> Option<usize> {
        self.times
            .iter()
            .position(|stamp| (stamp - time).abs() < 1e-3)
    }

    /// Returns the pose stamped with `time`.
    pub fn at_time(&self, time: f32) -> Option<&Transform> {
        self.index_of(time).map(|index| &self.camera_to_world[index])
    }

    /// Returns the iterator over poses and timestamps.
    pub fn iter(&self) -> impl Iterator<Item = (Transform, f32)> + '_ {
        self.camera_to_world
            .iter()
            .zip(self.times.iter())
            .map(|(camera_to_world, time)| (camera_to_world.clone(), *time))
    }

    /// Creates a new trajectory with the poses transformed in such a way that the first pose is at origin.
    pub fn first_frame_at_origin(&self) -> Self {
        if self.camera_to_world.is_empty() {
            return self.clone();
        }

        let first_inv = self.camera_to_world[0].inverse();
        Self {
            camera_to_world: self
                .camera_to_world
                .iter()
                .map(|transform| &first_inv * transform)
                .collect::<Vec<Transform>>(),
            times: self.times.clone(),
        }
    }

    /// Pairs the poses of `self` with the ones of `reference` stamped with the
    /// same time. Follows the order of `reference`; when `self` repeats a
    /// timestamp its first pose is used.
    ///
    /// # Returns
    ///
    /// * `(self poses, reference poses)` of equal length.
    pub fn align_by_time(&self, reference: &Trajectory) -> (Self, Self) {
        let mut aligned = Trajectory::default();
        let mut aligned_reference = Trajectory::default();
        for (reference_pose, time) in reference.iter() {
            if let Some(pose) = self.at_time(time) {
                aligned.push(pose.clone(), time);
                aligned_reference.push(reference_pose, time);
            }
        }
        (aligned, aligned_reference)
    }
}

impl FromIterator<(Transform, f32)> for Trajectory {
    /// Creates a new trajectory from the `(Transform, f32)` iterator.
    /// Use with the `collect::<Trajectory>` method.
    fn from_iter<T: IntoIterator<Item = (Transform, f32)>>(iter: T) -> Self {
        let mut trajectory = Trajectory::default();
        for (transform, time) in iter {
            trajectory.push(transform, time);
        }
        trajectory
    }
}

impl Index<usize> for Trajectory {
    type Output = Transform;
    /// Returns the pose at the given index.
    fn index(&self, index: usize) -> &Self::Output {
        &self.camera_to_world[index]
    }
}
