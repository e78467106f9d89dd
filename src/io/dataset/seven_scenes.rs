use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use nshare::ToNdarray2;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    camera::CameraIntrinsics,
    image::{depth_from_raw, resize_depth, IntoArray3, RgbdFrame, RgbdImage, SEVEN_SCENES_INVALID_DEPTH},
    io::{read_pose, read_split, SplitEntry},
    trajectory::Trajectory,
    transform::Transform,
};

use super::core::{offset_frame_index, DatasetError, RgbdDataset, Sample};

/// Directory layout of a 7-Scenes sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetLayout {
    /// Official layout: `seq-XX/frame-XXXXXX.{color.png,depth.png,pose.txt}`.
    #[default]
    Flat,
    /// One folder per modality: `seq-XX/{rgb,depth,poses}/frame-XXXXXX.*`.
    Split,
}

impl FromStr for DatasetLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(DatasetLayout::Flat),
            "split" => Ok(DatasetLayout::Split),
            _ => Err(format!("Invalid dataset layout: {s}, use flat or split")),
        }
    }
}

impl DatasetLayout {
    fn file_path(&self, sequence_dir: &Path, kind: &str, frame_name: String) -> PathBuf {
        match self {
            DatasetLayout::Flat => sequence_dir.join(frame_name),
            DatasetLayout::Split => sequence_dir.join(kind).join(frame_name),
        }
    }
}

/// Parser for the Microsoft 7-Scenes dataset. Available at:
/// https://www.microsoft.com/en-us/research/project/rgb-d-dataset-7-scenes/
/// Shotton et al., Scene Coordinate Regression Forests for Camera Relocalization
/// in RGB-D Images. CVPR, 2013.
pub struct SevenScenesDataset {
    base_dir: PathBuf,
    entries: Vec<SplitEntry>,
    layout: DatasetLayout,
    camera: CameraIntrinsics,
    depth_scale: f32,
    size: Option<(usize, usize)>,
}

impl SevenScenesDataset {
    /// Dataset over the given split entries.
    pub fn new<P: AsRef<Path>>(base_dir: P, entries: Vec<SplitEntry>) -> Result<Self, DatasetError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        if !base_dir.is_dir() {
            return Err(DatasetError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset directory {} not found", base_dir.display()),
            )));
        }

        Ok(Self {
            base_dir,
            entries,
            layout: DatasetLayout::default(),
            camera: CameraIntrinsics::seven_scenes(),
            depth_scale: 0.001,
            size: None,
        })
    }

    /// Dataset over the entries of a split file (`folder frame_index [side]` lines).
    pub fn from_split_file<P: AsRef<Path>, S: AsRef<Path>>(
        base_dir: P,
        split_file: S,
    ) -> Result<Self, DatasetError> {
        Self::new(base_dir, read_split(split_file)?)
    }

    pub fn with_layout(mut self, layout: DatasetLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Output image size. Frames are resized and intrinsics rescaled on load.
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Factor converting raw depth values into metres.
    pub fn with_depth_scale(mut self, depth_scale: f32) -> Self {
        self.depth_scale = depth_scale;
        self
    }

    /// Intrinsics for the native resolution, given by `camera.width` and `camera.height`
    /// (the loaded image size is used when they are missing).
    pub fn with_camera(mut self, camera: CameraIntrinsics) -> Self {
        self.camera = camera;
        self
    }

    /// Replaces the entries with every frame of the given sequences whose
    /// window `frame_ids` is complete.
    pub fn with_sequences(
        mut self,
        folders: &[String],
        frame_ids: &[i32],
    ) -> Result<Self, DatasetError> {
        let mut entries = Vec::new();
        for folder in folders {
            entries.extend(self.sequence_entries(folder, frame_ids)?);
        }
        self.entries = entries;
        Ok(self)
    }

    fn color_path(&self, folder: &str, frame_index: usize) -> PathBuf {
        self.layout.file_path(
            &self.base_dir.join(folder),
            "rgb",
            format!("frame-{frame_index:06}.color.png"),
        )
    }

    fn depth_path(&self, folder: &str, frame_index: usize) -> PathBuf {
        self.layout.file_path(
            &self.base_dir.join(folder),
            "depth",
            format!("frame-{frame_index:06}.depth.png"),
        )
    }

    fn pose_path(&self, folder: &str, frame_index: usize) -> PathBuf {
        self.layout.file_path(
            &self.base_dir.join(folder),
            "poses",
            format!("frame-{frame_index:06}.pose.txt"),
        )
    }

    /// Sorted frame indices of a sequence, found from its color images.
    pub fn frame_indices(&self, folder: &str) -> Result<Vec<usize>, DatasetError> {
        let pattern = self.color_path(folder, 0).with_file_name("frame-*.color.png");
        let pattern = pattern.to_str().ok_or_else(|| {
            DatasetError::Parser(format!("non UTF-8 path: {}", pattern.display()))
        })?;

        let mut indices = glob::glob(pattern)?
            .filter_map(|entry| entry.ok())
            .filter_map(|path| {
                path.file_name()?
                    .to_str()?
                    .strip_prefix("frame-")?
                    .split('.')
                    .next()?
                    .parse::<usize>()
                    .ok()
            })
            .collect::<Vec<usize>>();
        indices.sort_unstable();
        Ok(indices)
    }

    /// Entries of a sequence for which every frame of the window exists.
    pub fn sequence_entries(
        &self,
        folder: &str,
        frame_ids: &[i32],
    ) -> Result<Vec<SplitEntry>, DatasetError> {
        let indices = self.frame_indices(folder)?;
        let entries = indices
            .iter()
            .filter(|index| {
                frame_ids.iter().all(|frame_id| {
                    offset_frame_index(**index, *frame_id)
                        .map(|other| indices.binary_search(&other).is_ok())
                        .unwrap_or(false)
                })
            })
            .map(|index| SplitEntry::new(folder, *index))
            .collect::<Vec<_>>();

        if entries.is_empty() {
            warn!("No complete frame window in {folder}");
        }
        Ok(entries)
    }

    /// Ground truth trajectory of a whole sequence, stamped with frame indices.
    pub fn trajectory(&self, folder: &str) -> Result<Trajectory, DatasetError> {
        self.frame_indices(folder)?
            .into_iter()
            .map(|index| -> Result<(Transform, f32), DatasetError> {
                Ok((self.pose(folder, index)?, index as f32))
            })
            .collect()
    }

    /// Loads one frame, resized to the dataset output size.
    pub fn get_frame(&self, folder: &str, frame_index: usize) -> Result<RgbdFrame, DatasetError> {
        let color_path = self.color_path(folder, frame_index);
        if !color_path.is_file() {
            return Err(DatasetError::MissingFrame(color_path.display().to_string()));
        }

        let color = image::open(&color_path)?.into_rgb8().into_array3();
        let (height, width, _) = color.dim();

        let raw_depth = image::open(self.depth_path(folder, frame_index))?
            .into_luma16()
            .into_ndarray2();
        let mut depth = depth_from_raw(&raw_depth.view(), self.depth_scale, SEVEN_SCENES_INVALID_DEPTH);
        if depth.dim() != (height, width) {
            warn!(
                "Depth of {} has shape {:?}, resizing it to {width}x{height}",
                color_path.display(),
                depth.dim()
            );
            depth = resize_depth(&depth.view(), width, height);
        }

        let camera = self.camera.resize(
            self.camera.width.unwrap_or(width),
            self.camera.height.unwrap_or(height),
            width,
            height,
        );
        let pose = self.pose(folder, frame_index)?;
        let frame = RgbdFrame::new(camera, RgbdImage::new(color, depth), Some(pose));

        Ok(match self.size {
            Some((out_width, out_height)) => frame.resize(out_width, out_height),
            None => frame,
        })
    }
}

impl RgbdDataset for SevenScenesDataset {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, index: usize) -> Option<&SplitEntry> {
        self.entries.get(index)
    }

    fn get(&self, index: usize, frame_ids: &[i32]) -> Result<Sample, DatasetError> {
        let entry = self.entries.get(index).ok_or_else(|| {
            DatasetError::MissingFrame(format!(
                "entry {index} out of range, dataset has {}",
                self.entries.len()
            ))
        })?;
        debug!("Loading {} frame {}", entry.folder, entry.frame_index);

        let frames = frame_ids
            .iter()
            .map(|frame_id| -> Result<(i32, RgbdFrame), DatasetError> {
                let frame_index = offset_frame_index(entry.frame_index, *frame_id)?;
                Ok((*frame_id, self.get_frame(&entry.folder, frame_index)?))
            })
            .collect::<Result<BTreeMap<i32, RgbdFrame>, DatasetError>>()?;

        Ok(Sample {
            entry: entry.clone(),
            frames,
        })
    }

    fn pose(&self, folder: &str, frame_index: usize) -> Result<Transform, DatasetError> {
        read_pose(self.pose_path(folder, frame_index))
    }
}
