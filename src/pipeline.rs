//! Job entry points
//!
//! [`align_images`] turns a directory of geotagged photographs into an
//! ordered, orientation-tagged sequence. [`stitch_run_with`] runs a whole
//! job against a [`StitchConfig`] and leaves its outcome in the output
//! directory artifacts.

use crate::config::StitchConfig;
use crate::diagnostics;
use crate::error::{Result, StitchError};
use crate::image_loader;
use crate::metadata::MetadataReader;
use crate::orientation::{Orientation, OrientationClassifier};
use crate::output::OutputLayout;
use crate::sequence::ImageSequence;
use crate::stitch::{JobReport, PanoramaStitcher, StitchEngine};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Ordered sequence with DISCARD images removed
#[derive(Debug, Clone)]
pub struct AlignedSequence {
    /// Kept records in capture order, each tagged NORMAL or ROTATED
    pub sequence: ImageSequence,
    /// Dominant flight direction in [0, 180)
    pub standard_angle: u16,
    /// Number of images dropped as DISCARD
    pub discarded: usize,
}

impl AlignedSequence {
    pub fn rotated_count(&self) -> usize {
        self.sequence
            .records()
            .iter()
            .filter(|r| r.orientation == Orientation::Rotated)
            .count()
    }
}

/// Align every supported image in `dir`
///
/// # Errors
///
/// Returns `StitchError::EmptyInput` when `dir` holds no supported image,
/// and any metadata error of the first offending image.
pub fn align_images(dir: &Path, reader: &dyn MetadataReader, tolerance_deg: f64) -> Result<AlignedSequence> {
    let paths = image_loader::list_images(dir)?;
    if paths.is_empty() {
        return Err(StitchError::EmptyInput {
            path: dir.to_path_buf(),
        });
    }
    align_paths(&paths, reader, tolerance_deg)
}

/// Align an explicit list of images
pub fn align_paths(paths: &[PathBuf], reader: &dyn MetadataReader, tolerance_deg: f64) -> Result<AlignedSequence> {
    let mut sequence = ImageSequence::read(paths, reader)?;
    sequence.sort_by_capture_time();
    sequence.assign_headings();

    let classification = sequence.classify(&OrientationClassifier::new(tolerance_deg));
    info!(
        "Standard angle {}°: {} normal, {} rotated, {} discarded",
        classification.standard_angle,
        classification.count(Orientation::Normal),
        classification.count(Orientation::Rotated),
        classification.count(Orientation::Discard)
    );

    let discarded = sequence.drop_discarded();
    Ok(AlignedSequence {
        sequence,
        standard_angle: classification.standard_angle,
        discarded,
    })
}

/// Run one job with injected collaborators
///
/// Stitch failures end in a [`JobReport`] with a failed state and an
/// `error.txt` artifact. Errors before stitching (bad metadata, empty
/// input, partitioning) are also written to `error.txt` and then returned.
///
/// # Errors
///
/// Returns `StitchError::InvalidParameter` for an invalid configuration,
/// `StitchError::IoError` when the output directory cannot be written, and
/// any alignment or partitioning error.
pub fn stitch_run_with(
    config: &StitchConfig,
    reader: &dyn MetadataReader,
    stitcher: &mut dyn PanoramaStitcher,
) -> Result<JobReport> {
    config.validate()?;

    let layout = OutputLayout::new(&config.working_dir);
    layout.prepare()?;

    let images_dir = layout.images_dir();
    let paths = image_loader::list_images(&images_dir)?;
    let n_clusters = config.n_clusters(paths.len());
    layout.write_cluster_marker(n_clusters)?;
    info!(
        "{} images in {}, planning {} clusters",
        paths.len(),
        images_dir.display(),
        n_clusters
    );

    let aligned = if paths.is_empty() {
        Err(StitchError::EmptyInput { path: images_dir })
    } else {
        align_paths(&paths, reader, config.rotation_tolerance_deg)
    };
    let aligned = record_failure(&layout, aligned)?;

    let coordinates = aligned.sequence.coordinates();
    let clusters = record_failure(&layout, config.cluster_policy.partition(&coordinates, n_clusters))?;

    if let Err(e) = diagnostics::plot_clusters(&coordinates, &clusters, &layout.plot_path()) {
        warn!("Cluster plot skipped: {}", e);
    }

    let mut engine = StitchEngine::new(&layout, stitcher, config.stitch_settings())
        .with_input_dump(config.dump_cluster_inputs)
        .with_crop_ratio(config.crop_ratio);
    engine.run(&aligned.sequence, &clusters)
}

/// Run one job with EXIF metadata and the OpenCV stitcher
#[cfg(feature = "opencv")]
pub fn stitch_run(config: &StitchConfig) -> Result<JobReport> {
    let reader = crate::metadata::ExifExtractor;
    let mut stitcher = crate::stitch::OpenCvStitcher::new();
    stitch_run_with(config, &reader, &mut stitcher)
}

/// Write a pre-stitch failure to `error.txt` before handing it back
fn record_failure<T>(layout: &OutputLayout, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        let message = format!("Stitching step 1 failed | Error : {}", e);
        match layout.write_error(&message) {
            Ok(()) => e,
            Err(io) => {
                warn!("Could not record failure '{}': {}", message, io);
                e
            }
        }
    })
}
