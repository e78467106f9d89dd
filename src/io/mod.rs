pub mod dataset;

mod pose;
pub use pose::{
    parse_pose_matrix, read_pose, read_pose_matrix, read_trajectory, write_pose,
    write_trajectory,
};

mod split;
pub use split::{parse_split, read_split, SplitEntry};
