//! Integration tests for the complete stitching job
//!
//! These tests run `stitch_run_with` end to end on a temporary job
//! directory:
//! - Cluster planning and by-count partitioning
//! - Fail-fast stitching and the error/flag artifacts
//! - Orientation handling of return legs and off-course images
//! - Metadata failures before stitching
//!
//! Metadata comes from an in-memory table and stitching from a scripted
//! stitcher, so no geotagged photographs or native OpenCV are required.

use drone_stitch::output::{inspect, job_outcome};
use drone_stitch::stitch::StitchStatus;
use drone_stitch::{
    align_images, stitch_run_with, Coordinate, ImageMetadata, JobOutcome, JobState, MetadataReader,
    OutputLayout, PanoramaStitcher, StitchConfig, StitchError, StitchFailure, StitchSettings,
};
use drone_stitch::metadata::GpsFix;
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Metadata keyed by file name
#[derive(Default)]
struct TableReader {
    table: HashMap<String, ImageMetadata>,
}

impl MetadataReader for TableReader {
    fn read(&self, path: &Path) -> drone_stitch::Result<ImageMetadata> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.table
            .get(&name)
            .cloned()
            .ok_or_else(|| StitchError::MissingGeotag {
                path: path.to_path_buf(),
            })
    }
}

/// Records every call and fails on a chosen call index
#[derive(Default)]
struct ScriptedStitcher {
    fail_on: Option<usize>,
    /// Image count of each call
    calls: Vec<usize>,
    /// Whether the marker pixel of each input was still top-left
    upright: Vec<bool>,
}

impl PanoramaStitcher for ScriptedStitcher {
    fn stitch(
        &mut self,
        images: &[RgbImage],
        _settings: &StitchSettings,
    ) -> Result<RgbImage, StitchFailure> {
        let call = self.calls.len();
        self.calls.push(images.len());
        self.upright
            .extend(images.iter().map(|img| img.get_pixel(0, 0)[0] == 255));

        if self.fail_on == Some(call) {
            return Err(StitchFailure::Status(StitchStatus::HomographyEstimationFailed));
        }
        Ok(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])))
    }
}

/// Job directory whose images/ holds one small PNG per fix
struct Job {
    dir: TempDir,
    reader: TableReader,
}

impl Job {
    fn new(fixes: &[(f64, f64)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir_all(&images).unwrap();

        // Red marker in the top-left corner reveals 180° rotations
        let mut img = RgbImage::new(4, 4);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));

        let mut reader = TableReader::default();
        for (i, &(lat, lon)) in fixes.iter().enumerate() {
            let name = format!("img_{:04}.png", i);
            img.save(images.join(&name)).unwrap();
            reader.table.insert(
                name,
                ImageMetadata {
                    gps: GpsFix {
                        coordinate: Coordinate::new(lat, lon),
                        altitude: Some(120.0),
                    },
                    date_time: format!(
                        "2024:05:01 {:02}:{:02}:{:02}",
                        10 + i / 3600,
                        (i / 60) % 60,
                        i % 60
                    ),
                },
            );
        }

        Self { dir, reader }
    }

    fn config(&self) -> StitchConfig {
        StitchConfig::new(self.dir.path())
    }

    fn layout(&self) -> OutputLayout {
        OutputLayout::new(self.dir.path())
    }
}

/// Straight westbound flight, heading 90°
fn westbound(count: usize) -> Vec<(f64, f64)> {
    (0..count).map(|i| (37.5, 127.0 - i as f64 * 1e-4)).collect()
}

// ============================================================================
// End-to-End Scenarios
// ============================================================================

#[test]
fn test_165_images_three_equal_clusters() {
    init_logger();
    let job = Job::new(&westbound(165));
    let mut stitcher = ScriptedStitcher::default();

    let report = stitch_run_with(&job.config(), &job.reader, &mut stitcher).unwrap();

    assert_eq!(report.n_clusters, 3);
    assert_eq!(stitcher.calls, vec![55, 55, 55]);
    assert!(job.layout().cluster_marker_path(3).exists());
    assert!(stitcher.upright.iter().all(|&up| up));
}

#[test]
fn test_121_images_remainder_goes_first() {
    init_logger();
    let job = Job::new(&westbound(121));
    let mut config = job.config();
    config.divide_threshold = 60;
    let mut stitcher = ScriptedStitcher::default();

    let report = stitch_run_with(&config, &job.reader, &mut stitcher).unwrap();

    assert_eq!(report.n_clusters, 3);
    assert_eq!(stitcher.calls, vec![41, 40, 40]);
}

#[test]
fn test_failing_cluster_stops_job() {
    init_logger();
    let job = Job::new(&westbound(165));
    let mut stitcher = ScriptedStitcher {
        fail_on: Some(1),
        ..Default::default()
    };

    let report = stitch_run_with(&job.config(), &job.reader, &mut stitcher).unwrap();
    let layout = job.layout();

    assert_eq!(report.state, JobState::PartialFailed { cluster: 1 });
    assert_eq!(stitcher.calls.len(), 2, "clusters after the failure are never attempted");

    let error = fs::read_to_string(layout.error_path()).unwrap();
    assert!(error.contains("cluster : 1"), "error.txt was: {}", error);
    assert!(error.contains("code : 2"));
    assert!(!layout.flag_path().exists());
    assert!(layout.mosaic_path(0).exists());
    assert!(!layout.mosaic_path(1).exists());
    assert!(!layout.mosaic_path(2).exists());

    assert_eq!(job_outcome(&layout).unwrap(), JobOutcome::Failed);
}

#[test]
fn test_all_clusters_succeed() {
    init_logger();
    let job = Job::new(&westbound(165));
    let mut stitcher = ScriptedStitcher::default();

    let report = stitch_run_with(&job.config(), &job.reader, &mut stitcher).unwrap();
    let layout = job.layout();

    assert!(report.is_success());
    assert!(layout.flag_path().exists());
    assert!(!layout.error_path().exists());
    assert!(layout.plot_path().exists());

    let summary = inspect(&layout).unwrap().unwrap();
    assert_eq!(summary.planned_clusters, Some(3));
    assert_eq!(summary.mosaics, vec![0, 1, 2]);
    assert_eq!(summary.outcome(), JobOutcome::Done);

    // Oriented inputs of every cluster are kept next to the mosaics
    let dumped = fs::read_dir(layout.cluster_dump_dir(2)).unwrap().count();
    assert_eq!(dumped, 55);
}

#[test]
fn test_plot_failure_does_not_stop_job() {
    init_logger();
    // Diagonal flight with a heading of about 116.57°, so a zero tolerance
    // discards every image and leaves nothing to plot
    let fixes: Vec<(f64, f64)> = (0..6)
        .map(|i| (37.5 + i as f64 * 1e-4, 127.0 - i as f64 * 2e-4))
        .collect();
    let job = Job::new(&fixes);
    let mut config = job.config();
    config.rotation_tolerance_deg = 0.0;
    let mut stitcher = ScriptedStitcher::default();

    let report = stitch_run_with(&config, &job.reader, &mut stitcher).unwrap();
    let layout = job.layout();

    assert!(report.is_success());
    assert_eq!(stitcher.calls, vec![0]);
    assert!(!layout.plot_path().exists());
    assert!(layout.cluster_marker_path(1).exists());
    assert!(layout.mosaic_path(0).exists());
    assert!(layout.flag_path().exists());
    assert!(!layout.error_path().exists());
}

#[test]
fn test_rerun_clears_previous_output() {
    init_logger();
    let job = Job::new(&westbound(10));
    let mut failing = ScriptedStitcher {
        fail_on: Some(0),
        ..Default::default()
    };
    stitch_run_with(&job.config(), &job.reader, &mut failing).unwrap();
    assert!(job.layout().error_path().exists());

    let mut stitcher = ScriptedStitcher::default();
    let report = stitch_run_with(&job.config(), &job.reader, &mut stitcher).unwrap();
    assert!(report.is_success());
    assert!(!job.layout().error_path().exists());
}

// ============================================================================
// Orientation
// ============================================================================

/// Ten westbound fixes, ten eastbound fixes back, then one sideways jump
fn there_and_back() -> Vec<(f64, f64)> {
    let step = 1e-4;
    let mut fixes: Vec<(f64, f64)> = (0..10).map(|i| (37.5, 127.0 - i as f64 * step)).collect();
    fixes.extend((10..20).map(|i| (37.5, 127.0 + (i as f64 - 18.0) * step)));
    fixes.push((37.5 + step, 127.0 + step));
    fixes
}

#[test]
fn test_return_leg_rotated_and_jump_discarded() {
    init_logger();
    let job = Job::new(&there_and_back());

    let aligned = align_images(&job.layout().images_dir(), &job.reader, 5.0).unwrap();
    assert_eq!(aligned.standard_angle, 90);
    assert_eq!(aligned.discarded, 1);
    assert_eq!(aligned.sequence.len(), 20);
    assert_eq!(aligned.rotated_count(), 10);
}

#[test]
fn test_rotated_images_are_turned_before_stitching() {
    init_logger();
    let job = Job::new(&there_and_back());
    let mut stitcher = ScriptedStitcher::default();

    let report = stitch_run_with(&job.config(), &job.reader, &mut stitcher).unwrap();

    assert!(report.is_success());
    assert_eq!(stitcher.calls, vec![20]);
    let mut expected = vec![true; 10];
    expected.extend(vec![false; 10]);
    assert_eq!(stitcher.upright, expected);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_missing_geotag_fails_before_stitching() {
    init_logger();
    let mut job = Job::new(&westbound(12));
    job.reader.table.remove("img_0005.png");
    let mut stitcher = ScriptedStitcher::default();

    let result = stitch_run_with(&job.config(), &job.reader, &mut stitcher);

    match result {
        Err(StitchError::MissingGeotag { path }) => {
            assert!(path.ends_with("img_0005.png"));
        }
        other => panic!("Expected MissingGeotag, got: {:?}", other.map(|r| r.state)),
    }
    let layout = job.layout();
    assert!(stitcher.calls.is_empty());
    assert!(layout.cluster_marker_path(1).exists());
    assert!(fs::read_to_string(layout.error_path()).unwrap().contains("img_0005.png"));
    assert!(!layout.flag_path().exists());
}

#[test]
fn test_empty_job_directory() {
    init_logger();
    let job = Job::new(&[]);
    let mut stitcher = ScriptedStitcher::default();

    let result = stitch_run_with(&job.config(), &job.reader, &mut stitcher);

    assert!(matches!(result, Err(StitchError::EmptyInput { .. })));
    assert!(job.layout().error_path().exists());
}

#[test]
fn test_invalid_config_leaves_directory_untouched() {
    init_logger();
    let job = Job::new(&westbound(3));
    let mut config = job.config();
    config.divide_threshold = 0;
    let mut stitcher = ScriptedStitcher::default();

    let result = stitch_run_with(&config, &job.reader, &mut stitcher);

    assert!(matches!(result, Err(StitchError::InvalidParameter { .. })));
    assert_eq!(job_outcome(&job.layout()).unwrap(), JobOutcome::NotStarted);
}
