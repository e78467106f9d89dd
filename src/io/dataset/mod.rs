mod core;
pub use self::core::{offset_frame_index, DatasetError, RgbdDataset, Sample, SubsetDataset};

mod seven_scenes;
pub use seven_scenes::{DatasetLayout, SevenScenesDataset};
