use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};

use crate::{error::Error, io::dataset::DatasetLayout};

/// Parameters of a photometric warping evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Input image height.
    pub height: usize,
    /// Input image width.
    pub width: usize,
    /// Frame offsets loaded around each target frame. The first must be 0.
    pub frame_ids: Vec<i32>,
    /// Pyramid levels to evaluate; level `s` divides each side by `2^s`.
    pub scales: Vec<usize>,
    /// Warp the source image of each scale instead of the full resolution one.
    pub v1_multiscale: bool,
    pub ssim_weight: f32,
    /// Pixels with no depth take the target value in the warped image.
    pub mask_invalid_depth: bool,
    /// Metres per raw depth unit.
    pub depth_scale: f32,
    pub layout: DatasetLayout,
    pub max_samples: Option<usize>,
    /// Where warped images are saved, nothing is saved if unset.
    pub output_dir: Option<PathBuf>,
    /// Directory with one predicted trajectory per sequence.
    pub predicted_poses: Option<PathBuf>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            height: 480,
            width: 640,
            frame_ids: vec![0, -1, 1],
            scales: vec![0],
            v1_multiscale: false,
            ssim_weight: 0.85,
            mask_invalid_depth: false,
            depth_scale: 0.001,
            layout: DatasetLayout::Flat,
            max_samples: None,
            output_dir: None,
            predicted_poses: None,
        }
    }
}

/// Command line values that replace the ones of [`EvalOptions`]. Unset fields keep them.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct EvalOverrides {
    #[arg(long)]
    pub width: Option<usize>,
    #[arg(long)]
    pub height: Option<usize>,
    /// Comma separated frame offsets, starting with 0
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub frame_ids: Option<Vec<i32>>,
    /// Comma separated pyramid scales
    #[arg(long, value_delimiter = ',')]
    pub scales: Option<Vec<usize>>,
    #[arg(long, action)]
    pub v1_multiscale: bool,
    #[arg(long, action)]
    pub mask_invalid_depth: bool,
    #[arg(long)]
    pub ssim_weight: Option<f32>,
    #[arg(long)]
    pub depth_scale: Option<f32>,
    /// Dataset layout: flat or split
    #[arg(long)]
    pub layout: Option<DatasetLayout>,
    /// Maximum number of samples to evaluate
    #[arg(long)]
    pub max_samples: Option<usize>,
    /// Directory where the warped images are saved
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Directory with predicted trajectories, `<folder>.txt` per sequence
    #[arg(long)]
    pub predicted_poses: Option<PathBuf>,
}

impl EvalOptions {
    /// Options of the JSON file at `path` (or the defaults) with `overrides` applied, validated.
    pub fn load(path: Option<&Path>, overrides: &EvalOverrides) -> Result<Self, Error> {
        let options = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        }
        .merge_overrides(overrides);
        options.validate()?;
        Ok(options)
    }

    /// Flags only switch boolean options on.
    pub fn merge_overrides(mut self, overrides: &EvalOverrides) -> Self {
        if let Some(width) = overrides.width {
            self.width = width;
        }
        if let Some(height) = overrides.height {
            self.height = height;
        }
        if let Some(frame_ids) = &overrides.frame_ids {
            self.frame_ids = frame_ids.clone();
        }
        if let Some(scales) = &overrides.scales {
            self.scales = scales.clone();
        }
        self.v1_multiscale |= overrides.v1_multiscale;
        self.mask_invalid_depth |= overrides.mask_invalid_depth;
        if let Some(ssim_weight) = overrides.ssim_weight {
            self.ssim_weight = ssim_weight;
        }
        if let Some(depth_scale) = overrides.depth_scale {
            self.depth_scale = depth_scale;
        }
        if let Some(layout) = overrides.layout {
            self.layout = layout;
        }
        if overrides.max_samples.is_some() {
            self.max_samples = overrides.max_samples;
        }
        if overrides.output_dir.is_some() {
            self.output_dir = overrides.output_dir.clone();
        }
        if overrides.predicted_poses.is_some() {
            self.predicted_poses = overrides.predicted_poses.clone();
        }
        self
    }

    /// Reads options from a JSON file. Missing fields take their default value.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let options: EvalOptions = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(options)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.frame_ids.first() != Some(&0) {
            return Err(Error::invalid_parameter(format!(
                "frame_ids must start with 0, got {:?}",
                self.frame_ids
            )));
        }
        if !self.frame_ids.iter().all_unique() {
            return Err(Error::invalid_parameter(format!(
                "frame_ids must be unique, got {:?}",
                self.frame_ids
            )));
        }
        if self.scales.is_empty() {
            return Err(Error::invalid_parameter("at least one scale is required"));
        }
        for &scale in &self.scales {
            if scale >= usize::BITS as usize
                || self.width >> scale < 2
                || self.height >> scale < 2
            {
                return Err(Error::invalid_parameter(format!(
                    "scale {scale} shrinks the {}x{} input below 2x2",
                    self.width, self.height
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.ssim_weight) {
            return Err(Error::invalid_parameter(format!(
                "ssim_weight must be in [0, 1], got {}",
                self.ssim_weight
            )));
        }
        if self.depth_scale <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "depth_scale must be positive, got {}",
                self.depth_scale
            )));
        }
        Ok(())
    }

    /// Frame ids other than the target's.
    pub fn source_frame_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.frame_ids.iter().copied().filter(|id| *id != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_should_be_valid() {
        let options = EvalOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.source_frame_ids().collect::<Vec<_>>(), vec![-1, 1]);
    }

    #[test]
    fn should_reject_bad_frame_ids() {
        let mut options = EvalOptions {
            frame_ids: vec![-1, 0, 1],
            ..Default::default()
        };
        assert!(options.validate().is_err());

        options.frame_ids = vec![0, 1, 1];
        assert!(options.validate().is_err());
    }

    #[test]
    fn should_reject_bad_scales_and_weights() {
        let options = EvalOptions {
            width: 8,
            height: 8,
            scales: vec![0, 3],
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = EvalOptions {
            scales: vec![],
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = EvalOptions {
            ssim_weight: 1.5,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn partial_json_should_use_defaults() {
        let options: EvalOptions =
            serde_json::from_str(r#"{"width": 320, "height": 240, "layout": "split"}"#).unwrap();
        assert_eq!(options.width, 320);
        assert_eq!(options.height, 240);
        assert_eq!(options.layout, DatasetLayout::Split);
        assert_eq!(options.frame_ids, vec![0, -1, 1]);
        assert_eq!(options.ssim_weight, 0.85);
    }

    #[test]
    fn overrides_should_replace_json_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(
            &path,
            r#"{"width": 320, "height": 240, "scales": [0, 1], "v1_multiscale": true, "max_samples": 4}"#,
        )
        .unwrap();

        let overrides = EvalOverrides {
            height: Some(160),
            frame_ids: Some(vec![0, -2, 2]),
            mask_invalid_depth: true,
            layout: Some(DatasetLayout::Split),
            output_dir: Some(PathBuf::from("warped")),
            ..Default::default()
        };
        let options = EvalOptions::load(Some(&path), &overrides).unwrap();

        assert_eq!(options.width, 320);
        assert_eq!(options.height, 160);
        assert_eq!(options.frame_ids, vec![0, -2, 2]);
        assert_eq!(options.scales, vec![0, 1]);
        assert!(options.v1_multiscale);
        assert!(options.mask_invalid_depth);
        assert_eq!(options.layout, DatasetLayout::Split);
        assert_eq!(options.max_samples, Some(4));
        assert_eq!(options.output_dir, Some(PathBuf::from("warped")));
        assert_eq!(options.predicted_poses, None);
    }

    #[test]
    fn empty_overrides_should_keep_options() {
        let options = EvalOptions {
            scales: vec![0, 2],
            v1_multiscale: true,
            ..Default::default()
        };
        assert_eq!(
            options.clone().merge_overrides(&EvalOverrides::default()),
            options
        );
        assert_eq!(
            EvalOptions::load(None, &EvalOverrides::default()).unwrap(),
            EvalOptions::default()
        );
    }

    #[test]
    fn invalid_overrides_should_fail_to_load() {
        let overrides = EvalOverrides {
            frame_ids: Some(vec![1, 0]),
            ..Default::default()
        };
        assert!(matches!(
            EvalOptions::load(None, &overrides),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn json_file_should_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        let options = EvalOptions {
            scales: vec![0, 1],
            max_samples: Some(3),
            output_dir: Some(PathBuf::from("/tmp/warped")),
            ..Default::default()
        };
        options.to_json_file(&path).unwrap();
        assert_eq!(EvalOptions::from_json_file(&path).unwrap(), options);
    }
}
