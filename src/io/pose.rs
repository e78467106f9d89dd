use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use nalgebra::{Matrix4, Quaternion, Vector3};

use super::dataset::DatasetError;
use crate::{trajectory::Trajectory, transform::Transform};

/// Parses a 4x4 row major matrix written as 16 whitespace separated numbers,
/// the format of 7-Scenes `frame-XXXXXX.pose.txt` files.
pub fn parse_pose_matrix(text: &str) -> Result<Matrix4<f32>, DatasetError> {
    let values = text
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|err| DatasetError::Parser(format!("invalid pose value `{token}`: {err}")))
        })
        .collect::<Result<Vec<f32>, DatasetError>>()?;

    if values.len() != 16 {
        return Err(DatasetError::Parser(format!(
            "a pose needs 16 values, found {}",
            values.len()
        )));
    }

    if values.iter().any(|v| !v.is_finite()) {
        return Err(DatasetError::Parser("pose has non finite values".to_string()));
    }

    Ok(Matrix4::from_row_slice(&values))
}

pub fn read_pose_matrix<P: AsRef<Path>>(path: P) -> Result<Matrix4<f32>, DatasetError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_pose_matrix(&text).map_err(|err| match err {
        DatasetError::Parser(msg) => {
            DatasetError::Parser(format!("{}: {msg}", path.as_ref().display()))
        }
        err => err,
    })
}

/// Reads a camera to world pose.
pub fn read_pose<P: AsRef<Path>>(path: P) -> Result<Transform, DatasetError> {
    Ok(Transform::from_matrix4(&read_pose_matrix(path)?))
}

pub fn write_pose<P: AsRef<Path>>(path: P, pose: &Transform) -> Result<(), DatasetError> {
    let matrix = pose.to_matrix4();
    let mut writer = BufWriter::new(File::create(path)?);
    for row in matrix.row_iter() {
        writeln!(
            writer,
            "{:e}\t{:e}\t{:e}\t{:e}",
            row[0], row[1], row[2], row[3]
        )?;
    }
    Ok(())
}

/// Reads a trajectory with lines `frame_index tx ty tz qx qy qz qw`.
/// Lines starting with `#` and empty lines are skipped.
pub fn read_trajectory<P: AsRef<Path>>(path: P) -> Result<Trajectory, DatasetError> {
    let reader = BufReader::new(File::open(path)?);
    let mut trajectory = Trajectory::default();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let tokens = line
            .split_whitespace()
            .map(|token| token.parse::<f32>())
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|err| DatasetError::Parser(format!("line {}: {err}", line_number + 1)))?;

        if tokens.len() != 8 {
            return Err(DatasetError::Parser(format!(
                "line {}: expected 8 values, found {}",
                line_number + 1,
                tokens.len()
            )));
        }

        trajectory.push(
            Transform::new(
                &Vector3::new(tokens[1], tokens[2], tokens[3]),
                &Quaternion::new(tokens[7], tokens[4], tokens[5], tokens[6]),
            ),
            tokens[0],
        );
    }

    Ok(trajectory)
}

pub fn write_trajectory<P: AsRef<Path>>(
    path: P,
    trajectory: &Trajectory,
) -> Result<(), DatasetError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "# frame_index tx ty tz qx qy qz qw")?;
    for (pose, time) in trajectory.iter() {
        let t = pose.translation();
        let q = pose.rotation();
        writeln!(
            writer,
            "{time} {} {} {} {} {} {} {}",
            t[0], t[1], t[2], q.i, q.j, q.k, q.w
        )?;
    }
    Ok(())
}
