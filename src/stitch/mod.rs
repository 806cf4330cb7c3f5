//! Cluster stitching
//!
//! The [`PanoramaStitcher`] trait is the boundary to the pairwise/multi-image
//! stitcher. [`StitchEngine`] drives it one cluster at a time and turns
//! outcomes into the job's filesystem artifacts.

pub mod engine;
#[cfg(feature = "opencv")]
pub mod opencv;

pub use engine::{ClusterFailure, JobReport, JobState, StitchEngine};
#[cfg(feature = "opencv")]
pub use self::opencv::OpenCvStitcher;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stitching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StitchMode {
    /// Roughly linear capture path, affine model
    Scans,
    /// Wide-angle / rotational overlap, spherical model
    Panorama,
}

impl StitchMode {
    /// `1` selects scans mode, any other scan count selects panorama mode
    pub fn from_scans(scans: i32) -> Self {
        if scans == 1 {
            StitchMode::Scans
        } else {
            StitchMode::Panorama
        }
    }
}

/// Per-call stitcher parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StitchSettings {
    pub mode: StitchMode,
    /// Minimum match confidence for accepting an image pair
    pub pano_confidence: f64,
}

/// Non-OK status reported by a stitcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StitchStatus {
    NeedMoreImages,
    HomographyEstimationFailed,
    CameraParamsAdjustFailed,
    /// Any code outside the known set
    Other(i32),
}

impl StitchStatus {
    /// Numeric code, matching OpenCV's `Stitcher::Status`
    pub fn code(self) -> i32 {
        match self {
            StitchStatus::NeedMoreImages => 1,
            StitchStatus::HomographyEstimationFailed => 2,
            StitchStatus::CameraParamsAdjustFailed => 3,
            StitchStatus::Other(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => StitchStatus::NeedMoreImages,
            2 => StitchStatus::HomographyEstimationFailed,
            3 => StitchStatus::CameraParamsAdjustFailed,
            other => StitchStatus::Other(other),
        }
    }
}

impl fmt::Display for StitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StitchStatus::NeedMoreImages => write!(f, "ERR_NEED_MORE_IMGS"),
            StitchStatus::HomographyEstimationFailed => write!(f, "ERR_HOMOGRAPHY_EST_FAIL"),
            StitchStatus::CameraParamsAdjustFailed => write!(f, "ERR_CAMERA_PARAMS_ADJUST_FAIL"),
            StitchStatus::Other(code) => write!(f, "status {}", code),
        }
    }
}

/// Why a stitch call produced no mosaic
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StitchFailure {
    /// The stitcher returned a non-OK status
    #[error("stitcher returned {0}")]
    Status(StitchStatus),
    /// The stitcher raised instead of returning
    #[error("{0}")]
    Raised(String),
}

impl StitchFailure {
    pub fn code(&self) -> Option<i32> {
        match self {
            StitchFailure::Status(status) => Some(status.code()),
            StitchFailure::Raised(_) => None,
        }
    }
}

/// Multi-image stitcher
pub trait PanoramaStitcher {
    /// Stitch `images` (already oriented) into one mosaic
    fn stitch(
        &mut self,
        images: &[RgbImage],
        settings: &StitchSettings,
    ) -> std::result::Result<RgbImage, StitchFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_scans() {
        assert_eq!(StitchMode::from_scans(1), StitchMode::Scans);
        assert_eq!(StitchMode::from_scans(0), StitchMode::Panorama);
        assert_eq!(StitchMode::from_scans(3), StitchMode::Panorama);
    }

    #[test]
    fn test_status_codes() {
        for code in 1..=3 {
            assert_eq!(StitchStatus::from_code(code).code(), code);
        }
        assert_eq!(StitchStatus::from_code(9), StitchStatus::Other(9));
        assert_eq!(StitchFailure::Raised("x".into()).code(), None);
        assert_eq!(
            StitchFailure::Status(StitchStatus::NeedMoreImages).to_string(),
            "stitcher returned ERR_NEED_MORE_IMGS"
        );
    }
}
