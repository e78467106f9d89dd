mod rgb;
pub use rgb::{resize_rgb, to_float_image, IntoArray3, IntoImageRgb8};

mod depth;
pub use depth::{depth_from_raw, resize_depth, SEVEN_SCENES_INVALID_DEPTH};

mod rgbd_image;
pub use rgbd_image::{RgbdFrame, RgbdImage};
