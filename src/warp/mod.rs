//! Inverse warping of a source frame into a target frame given the target
//! depth, the intrinsics and the target to source camera transform.

mod backproject;
pub use backproject::BackprojectDepth;

mod project;
pub use project::Project3D;

mod sampling;
pub use sampling::{grid_sample, sample_bilinear};

mod warp_image;
pub use warp_image::{warp_image, Warp};
