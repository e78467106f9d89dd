mod images;
pub(crate) use images::{gradient_rgb, textured_rgb};

mod scenes;
pub(crate) use scenes::{
    synthetic_sequence, write_synthetic_sequence, SyntheticScene, SYNTHETIC_FOLDER,
};
