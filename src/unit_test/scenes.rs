use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma, RgbImage};
use nalgebra::{UnitQuaternion, Vector3};
use rstest::fixture;
use tempfile::TempDir;

use crate::{
    camera::CameraIntrinsics,
    image::SEVEN_SCENES_INVALID_DEPTH,
    io::{dataset::DatasetLayout, write_pose},
    transform::Transform,
};

pub const SYNTHETIC_FOLDER: &str = "synthetic/seq-01";

/// A sequence of a camera looking at a textured plane, written in the 7-Scenes format.
pub struct SyntheticScene {
    root: PathBuf,
    _dir: Option<TempDir>,
    pub camera: CameraIntrinsics,
    pub width: usize,
    pub height: usize,
    /// Distance from the world origin to the plane `z = plane_depth`.
    pub plane_depth: f32,
    /// Camera to world poses.
    pub poses: Vec<Transform>,
}

impl SyntheticScene {
    pub fn path(&self) -> &Path {
        &self.root
    }
}

fn texture(x: f32, y: f32, channel: usize) -> f32 {
    let phase = channel as f32 * 0.9;
    0.5 + 0.25 * (x * 10.0 + phase).sin() + 0.2 * (y * 8.0 - phase).cos()
}

fn synthetic_pose(index: usize) -> Transform {
    let i = index as f32;
    let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.01 * i, 0.005 * i));
    Transform::new(&Vector3::new(0.15 * i, 0.05 * i, 0.02 * i), rotation.quaternion())
}

/// Writes `count` frames into `root`/[`SYNTHETIC_FOLDER`]. The camera is the
/// 7-Scenes one scaled down to 80x60 and the pixels of the top-left 4x4 corner
/// have invalid depth.
pub fn write_synthetic_sequence(root: &Path, layout: DatasetLayout, count: usize) -> SyntheticScene {
    let (width, height) = (80, 60);
    let camera = CameraIntrinsics::seven_scenes().resize(640, 480, width, height);
    let plane_depth = 2.0;

    let sequence_dir = root.join(SYNTHETIC_FOLDER);
    let (color_dir, depth_dir, pose_dir) = match layout {
        DatasetLayout::Flat => (sequence_dir.clone(), sequence_dir.clone(), sequence_dir.clone()),
        DatasetLayout::Split => (
            sequence_dir.join("rgb"),
            sequence_dir.join("depth"),
            sequence_dir.join("poses"),
        ),
    };
    for dir in [&color_dir, &depth_dir, &pose_dir] {
        std::fs::create_dir_all(dir).unwrap();
    }

    let poses = (0..count).map(synthetic_pose).collect::<Vec<_>>();
    for (index, pose) in poses.iter().enumerate() {
        let mut color = RgbImage::new(width as u32, height as u32);
        let mut depth = ImageBuffer::<Luma<u16>, Vec<u16>>::new(width as u32, height as u32);

        for y in 0..height {
            for x in 0..width {
                let ray = Vector3::new(
                    (x as f32 - camera.cx as f32) / camera.fx as f32,
                    (y as f32 - camera.cy as f32) / camera.fy as f32,
                    1.0,
                );
                let origin = pose.translation();
                let world_ray = pose.rotation() * ray;
                let s = (plane_depth - origin[2]) / world_ray[2];
                let point = origin + world_ray * s;

                let rgb = [0, 1, 2].map(|c| (texture(point[0], point[1], c) * 255.0).round() as u8);
                color.put_pixel(x as u32, y as u32, image::Rgb(rgb));

                let raw_depth = if x < 4 && y < 4 {
                    SEVEN_SCENES_INVALID_DEPTH
                } else {
                    (s * 1000.0).round() as u16
                };
                depth.put_pixel(x as u32, y as u32, Luma([raw_depth]));
            }
        }

        color
            .save(color_dir.join(format!("frame-{index:06}.color.png")))
            .unwrap();
        depth
            .save(depth_dir.join(format!("frame-{index:06}.depth.png")))
            .unwrap();
        write_pose(pose_dir.join(format!("frame-{index:06}.pose.txt")), pose).unwrap();
    }

    SyntheticScene {
        root: root.to_path_buf(),
        _dir: None,
        camera,
        width,
        height,
        plane_depth,
        poses,
    }
}

#[fixture]
pub fn synthetic_sequence() -> SyntheticScene {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = write_synthetic_sequence(dir.path(), DatasetLayout::Flat, 5);
    scene._dir = Some(dir);
    scene
}
