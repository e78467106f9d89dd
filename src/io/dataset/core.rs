use std::collections::BTreeMap;

use image::ImageError;

use crate::{image::RgbdFrame, io::SplitEntry, transform::Transform};
use std::io::Error;

#[derive(Debug)]
pub enum DatasetError {
    Io(Error),
    Parser(String),
    Image(ImageError),
    /// A frame requested by a sample window is not part of the dataset.
    MissingFrame(String),
}

impl From<Error> for DatasetError {
    fn from(err: Error) -> Self {
        DatasetError::Io(err)
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Io(err) => Some(err),
            DatasetError::Parser(_) => None,
            DatasetError::Image(err) => Some(err),
            DatasetError::MissingFrame(_) => None,
        }
    }
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DatasetError::Io(err) => write!(f, "IO error: {err}"),
            DatasetError::Parser(err) => write!(f, "Parser error: {err}"),
            DatasetError::Image(err) => write!(f, "Image error: {err}"),
            DatasetError::MissingFrame(err) => write!(f, "Missing frame: {err}"),
        }
    }
}

impl From<ImageError> for DatasetError {
    fn from(err: ImageError) -> Self {
        DatasetError::Image(err)
    }
}

impl From<glob::PatternError> for DatasetError {
    fn from(err: glob::PatternError) -> Self {
        DatasetError::Parser(err.to_string())
    }
}

/// A temporal window of frames around one split entry, keyed by frame id
/// (offset from the entry's frame index, 0 being the target frame).
pub struct Sample {
    pub entry: SplitEntry,
    pub frames: BTreeMap<i32, RgbdFrame>,
}

impl Sample {
    pub fn frame(&self, frame_id: i32) -> Option<&RgbdFrame> {
        self.frames.get(&frame_id)
    }
}

/// Offsets `frame_index` by `frame_id`, failing when it leaves the sequence start.
pub fn offset_frame_index(frame_index: usize, frame_id: i32) -> Result<usize, DatasetError> {
    let index = frame_index as i64 + frame_id as i64;
    usize::try_from(index).map_err(|_| {
        DatasetError::MissingFrame(format!("frame {frame_index} with offset {frame_id}"))
    })
}

pub trait RgbdDataset {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn entry(&self, index: usize) -> Option<&SplitEntry>;
    /// Loads the window `frame_ids` around the entry at `index`.
    fn get(&self, index: usize, frame_ids: &[i32]) -> Result<Sample, DatasetError>;
    /// Ground truth camera to world pose of a frame.
    fn pose(&self, folder: &str, frame_index: usize) -> Result<Transform, DatasetError>;
}

pub struct SubsetDataset {
    dataset: Box<dyn RgbdDataset>,
    indices: Vec<usize>,
}

impl SubsetDataset {
    pub fn new(dataset: Box<dyn RgbdDataset>, indices: Vec<usize>) -> Self {
        Self { dataset, indices }
    }

    /// Keeps at most the first `max_len` entries.
    pub fn first(dataset: Box<dyn RgbdDataset>, max_len: usize) -> Self {
        let indices = (0..dataset.len().min(max_len)).collect();
        Self { dataset, indices }
    }
}

impl RgbdDataset for SubsetDataset {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, index: usize) -> Option<&SplitEntry> {
        self.dataset.entry(*self.indices.get(index)?)
    }

    fn get(&self, index: usize, frame_ids: &[i32]) -> Result<Sample, DatasetError> {
        let inner_index = self.indices.get(index).ok_or_else(|| {
            DatasetError::MissingFrame(format!("subset index {index} out of range"))
        })?;
        self.dataset.get(*inner_index, frame_ids)
    }

    fn pose(&self, folder: &str, frame_index: usize) -> Result<Transform, DatasetError> {
        self.dataset.pose(folder, frame_index)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        io::dataset::SevenScenesDataset,
        unit_test::{synthetic_sequence, SyntheticScene, SYNTHETIC_FOLDER},
    };

    #[rstest]
    fn subset_should_remap_indices(synthetic_sequence: SyntheticScene) {
        let dataset = SevenScenesDataset::new(
            synthetic_sequence.path(),
            (1..4).map(|index| SplitEntry::new(SYNTHETIC_FOLDER, index)).collect(),
        )
        .unwrap();

        let subset = SubsetDataset::new(Box::new(dataset), vec![2, 0]);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.entry(0), Some(&SplitEntry::new(SYNTHETIC_FOLDER, 3)));
        assert_eq!(subset.get(1, &[0]).unwrap().entry.frame_index, 1);
        assert!(subset.entry(2).is_none());
        assert!(matches!(subset.get(2, &[0]), Err(DatasetError::MissingFrame(_))));

        let first = SubsetDataset::first(Box::new(subset), 10);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn offset_should_fail_before_sequence_start() {
        assert_eq!(offset_frame_index(5, -1).unwrap(), 4);
        assert_eq!(offset_frame_index(5, 2).unwrap(), 7);
        assert!(matches!(
            offset_frame_index(0, -1),
            Err(DatasetError::MissingFrame(_))
        ));
    }
}
