use std::path::Path;

use serde_derive::Serialize;

use super::dataset::DatasetError;

/// One line of a split file: the sequence folder and the target frame index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitEntry {
    pub folder: String,
    pub frame_index: usize,
}

impl SplitEntry {
    pub fn new<S: Into<String>>(folder: S, frame_index: usize) -> Self {
        Self {
            folder: folder.into(),
            frame_index,
        }
    }
}

/// Parses split lines with the format `folder frame_index [side]`.
/// The side token, used by stereo datasets, is ignored.
pub fn parse_split(text: &str) -> Result<Vec<SplitEntry>, DatasetError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_number, line)| {
            let mut tokens = line.split_whitespace();
            let (folder, index) = match (tokens.next(), tokens.next()) {
                (Some(folder), Some(index)) => (folder, index),
                _ => {
                    return Err(DatasetError::Parser(format!(
                        "split line {}: expected `folder frame_index`",
                        line_number + 1
                    )))
                }
            };
            let frame_index = index.parse::<usize>().map_err(|err| {
                DatasetError::Parser(format!("split line {}: {err}", line_number + 1))
            })?;
            Ok(SplitEntry::new(folder, frame_index))
        })
        .collect()
}

pub fn read_split<P: AsRef<Path>>(path: P) -> Result<Vec<SplitEntry>, DatasetError> {
    parse_split(&std::fs::read_to_string(path)?)
}
