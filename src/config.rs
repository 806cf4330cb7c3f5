//! Job configuration for the stitching pipeline.
//!
//! A [`StitchConfig`] is the only input of a job. It can be loaded from a
//! JSON file or built programmatically:
//!
//! ```no_run
//! use drone_stitch::StitchConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = StitchConfig::from_json_file(Path::new("job.json"))?;
//!
//! // Or use defaults for a working directory
//! let config = StitchConfig::new("/data/job_42");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::cluster::ClusterPolicy;
use crate::constants::defaults;
use crate::error::{Result, StitchError};
use crate::stitch::{StitchMode, StitchSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration of one stitching job.
///
/// Fields other than `working_dir` fall back to their defaults when
/// missing from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchConfig {
    /// Job directory containing `images/`; output goes to `opencv_output/`
    pub working_dir: PathBuf,

    /// Maximum images per cluster before another cluster is added
    #[serde(default = "default_divide_threshold")]
    pub divide_threshold: usize,

    /// Pair-matching confidence threshold passed to the stitcher
    #[serde(default = "default_pano_confidence")]
    pub pano_confidence: f64,

    /// `1` selects scans mode, any other value panorama mode
    #[serde(default = "default_scans")]
    pub scans: i32,

    /// Half-width in degrees of the NORMAL and ROTATED windows
    #[serde(default = "default_rotation_tolerance")]
    pub rotation_tolerance_deg: f64,

    #[serde(default)]
    pub cluster_policy: ClusterPolicy,

    /// Write each cluster's oriented inputs next to the mosaics
    #[serde(default = "default_dump_cluster_inputs")]
    pub dump_cluster_inputs: bool,

    /// Keep only the central fraction of each image, in (0, 1]
    #[serde(default)]
    pub crop_ratio: Option<f64>,
}

fn default_divide_threshold() -> usize {
    defaults::DIVIDE_THRESHOLD
}

fn default_pano_confidence() -> f64 {
    defaults::PANO_CONFIDENCE
}

fn default_scans() -> i32 {
    defaults::SCANS
}

fn default_rotation_tolerance() -> f64 {
    defaults::ROTATION_TOLERANCE_DEG
}

fn default_dump_cluster_inputs() -> bool {
    defaults::DUMP_CLUSTER_INPUTS
}

impl StitchConfig {
    /// Default configuration for `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            divide_threshold: defaults::DIVIDE_THRESHOLD,
            pano_confidence: defaults::PANO_CONFIDENCE,
            scans: defaults::SCANS,
            rotation_tolerance_deg: defaults::ROTATION_TOLERANCE_DEG,
            cluster_policy: ClusterPolicy::default(),
            dump_cluster_inputs: defaults::DUMP_CLUSTER_INPUTS,
            crop_ratio: None,
        }
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns `StitchError::InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.divide_threshold == 0 {
            return Err(StitchError::invalid_parameter("divide_threshold", self.divide_threshold));
        }
        if !self.pano_confidence.is_finite() || self.pano_confidence <= 0.0 {
            return Err(StitchError::invalid_parameter("pano_confidence", self.pano_confidence));
        }
        if !self.rotation_tolerance_deg.is_finite() || self.rotation_tolerance_deg < 0.0 {
            return Err(StitchError::invalid_parameter(
                "rotation_tolerance_deg",
                self.rotation_tolerance_deg,
            ));
        }
        if let Some(ratio) = self.crop_ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(StitchError::invalid_parameter("crop_ratio", ratio));
            }
        }
        if let ClusterPolicy::BySimilarity { max_iterations: 0, .. } = self.cluster_policy {
            return Err(StitchError::invalid_parameter("cluster_policy.max_iterations", 0));
        }
        Ok(())
    }

    /// Number of clusters planned for `image_count` listed images
    ///
    /// Always at least one, even for an empty listing.
    pub fn n_clusters(&self, image_count: usize) -> usize {
        image_count.div_ceil(self.divide_threshold.max(1)).max(1)
    }

    pub fn stitch_mode(&self) -> StitchMode {
        StitchMode::from_scans(self.scans)
    }

    pub fn stitch_settings(&self) -> StitchSettings {
        StitchSettings {
            mode: self.stitch_mode(),
            pano_confidence: self.pano_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StitchConfig::new("/tmp/job");
        assert_eq!(config.divide_threshold, 80);
        assert_eq!(config.pano_confidence, 1.0);
        assert_eq!(config.stitch_mode(), StitchMode::Scans);
        assert_eq!(config.cluster_policy, ClusterPolicy::ByCount);
        assert!(config.dump_cluster_inputs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_n_clusters() {
        let mut config = StitchConfig::new("/tmp/job");
        assert_eq!(config.n_clusters(0), 1);
        assert_eq!(config.n_clusters(80), 1);
        assert_eq!(config.n_clusters(81), 2);
        assert_eq!(config.n_clusters(165), 3);

        config.divide_threshold = 60;
        assert_eq!(config.n_clusters(121), 3);
        assert_eq!(config.n_clusters(120), 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = StitchConfig::new("/tmp/job");

        let mut config = base.clone();
        config.divide_threshold = 0;
        assert!(matches!(
            config.validate(),
            Err(StitchError::InvalidParameter { ref parameter, .. }) if parameter == "divide_threshold"
        ));

        let mut config = base.clone();
        config.pano_confidence = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.rotation_tolerance_deg = -1.0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.crop_ratio = Some(1.5);
        assert!(config.validate().is_err());
        config.crop_ratio = Some(0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StitchConfig =
            serde_json::from_str(r#"{ "working_dir": "/data/a", "scans": 0 }"#).unwrap();
        assert_eq!(config.divide_threshold, 80);
        assert_eq!(config.stitch_mode(), StitchMode::Panorama);
        assert_eq!(config.crop_ratio, None);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");

        let mut config = StitchConfig::new(dir.path());
        config.cluster_policy = ClusterPolicy::by_similarity();
        config.to_json_file(&path).unwrap();

        let loaded = StitchConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
