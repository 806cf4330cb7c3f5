//! # Drone Stitch
//!
//! A Rust crate for stitching geotagged aerial survey photographs into
//! mosaics (step 1 of the survey processing chain).
//!
//! A job works on one directory and:
//! - Orders photographs by capture time and derives each image's heading
//!   from consecutive GPS fixes
//! - Votes the dominant flight direction and tags every image NORMAL,
//!   ROTATED (turned 180° before stitching) or DISCARD
//! - Splits the kept sequence into clusters small enough to stitch
//! - Stitches every cluster into `opencv_output/opencv_<i>.jpg`, stopping
//!   at the first failing cluster
//!
//! The outcome of a job is readable from its output artifacts alone, see
//! [`output`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use drone_stitch::{stitch_run, StitchConfig};
//!
//! let report = stitch_run(&StitchConfig::new("/data/job_42"))?;
//! println!("{} of {} clusters stitched", report.mosaics.len(), report.n_clusters);
//! # Ok::<(), drone_stitch::StitchError>(())
//! ```

pub mod error;
pub mod constants;
pub mod config;
pub mod geometry;
pub mod metadata;
pub mod sequence;
pub mod orientation;
pub mod cluster;
pub mod image_loader;
pub mod stitch;
pub mod output;
pub mod diagnostics;
pub mod pipeline;

pub use cluster::{Cluster, ClusterPolicy};
pub use config::StitchConfig;
pub use error::{Result, StitchError};
pub use geometry::Coordinate;
pub use metadata::{ExifExtractor, ImageMetadata, MetadataReader};
pub use orientation::Orientation;
pub use output::{JobOutcome, OutputLayout, OutputSummary};
pub use pipeline::{align_images, stitch_run_with, AlignedSequence};
#[cfg(feature = "opencv")]
pub use pipeline::stitch_run;
pub use sequence::{ImageRecord, ImageSequence};
pub use stitch::{JobReport, JobState, PanoramaStitcher, StitchFailure, StitchMode, StitchSettings};
