//! Sequential per-cluster stitching with fail-fast job semantics
//!
//! State machine per job:
//!
//! ```text
//! Pending -> Stitching(i) -> ClusterDone(i) -> Stitching(i+1) -> ... -> AllDone
//!                         \-> ClusterFailed(i) -> PartialFailed(i)
//! ```
//!
//! Only one cluster's decoded images are resident at a time. The first
//! failing cluster writes `error.txt` and ends the job; later clusters are
//! never attempted. `flag.txt` is written only after every cluster produced
//! its mosaic.

use super::{PanoramaStitcher, StitchFailure, StitchSettings};
use crate::cluster::Cluster;
use crate::error::{Result, StitchError};
use crate::image_loader;
use crate::output::OutputLayout;
use crate::sequence::{ImageRecord, ImageSequence};
use image::RgbImage;
use log::{debug, error, info};
use std::path::PathBuf;

/// Position of the job in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Stitching { cluster: usize },
    ClusterDone { cluster: usize },
    ClusterFailed { cluster: usize },
    AllDone,
    PartialFailed { cluster: usize },
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::AllDone | JobState::PartialFailed { .. })
    }
}

/// The cluster that ended a job
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFailure {
    pub cluster: usize,
    pub code: Option<i32>,
    pub message: String,
}

impl ClusterFailure {
    fn from_stitch(cluster: usize, failure: &StitchFailure) -> Self {
        Self {
            cluster,
            code: failure.code(),
            message: failure.to_string(),
        }
    }

    /// Non-I/O artifact errors count against the cluster; I/O errors end the run
    fn from_artifact(cluster: usize, result: Result<()>) -> Result<std::result::Result<(), Self>> {
        match result {
            Ok(()) => Ok(Ok(())),
            Err(e @ StitchError::IoError { .. }) => Err(e),
            Err(e) => Ok(Err(Self {
                cluster,
                code: None,
                message: e.to_string(),
            })),
        }
    }

    fn into_error(self) -> StitchError {
        StitchError::StitchFailure {
            cluster: self.cluster,
            code: self.code,
            message: self.message,
        }
    }
}

/// Summary of one stitching job
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub n_clusters: usize,
    /// Mosaic paths of clusters that stitched, in cluster order
    pub mosaics: Vec<PathBuf>,
    pub failure: Option<ClusterFailure>,
    pub state: JobState,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.state == JobState::AllDone
    }
}

/// Drives a [`PanoramaStitcher`] over the clusters of one job
pub struct StitchEngine<'a> {
    layout: &'a OutputLayout,
    stitcher: &'a mut dyn PanoramaStitcher,
    settings: StitchSettings,
    dump_inputs: bool,
    crop_ratio: Option<f64>,
    state: JobState,
}

impl<'a> StitchEngine<'a> {
    pub fn new(
        layout: &'a OutputLayout,
        stitcher: &'a mut dyn PanoramaStitcher,
        settings: StitchSettings,
    ) -> Self {
        Self {
            layout,
            stitcher,
            settings,
            dump_inputs: false,
            crop_ratio: None,
            state: JobState::Pending,
        }
    }

    /// Write each cluster's oriented inputs to `cluster_<i>/`
    pub fn with_input_dump(mut self, enabled: bool) -> Self {
        self.dump_inputs = enabled;
        self
    }

    /// Centre-crop every input to `ratio` before stitching
    pub fn with_crop_ratio(mut self, ratio: Option<f64>) -> Self {
        self.crop_ratio = ratio;
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn transition(&mut self, next: JobState) {
        debug!("Job state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Stitch every cluster in order
    ///
    /// Stitch failures, including a mosaic or input dump that cannot be
    /// encoded, are recorded in `error.txt` and reported through
    /// [`JobReport::failure`], never as `Err`.
    ///
    /// # Errors
    ///
    /// Returns `StitchError::IoError` when an artifact cannot be written.
    pub fn run(&mut self, sequence: &ImageSequence, clusters: &[Cluster]) -> Result<JobReport> {
        let n_clusters = clusters.len();
        let mut mosaics = Vec::with_capacity(n_clusters);

        for (idx, cluster) in clusters.iter().enumerate() {
            self.transition(JobState::Stitching { cluster: idx });
            info!("Stitching cluster {}/{} ({} images)", idx + 1, n_clusters, cluster.len());

            let path = self.layout.mosaic_path(idx);
            let outcome = match self.stitch_cluster(idx, sequence, cluster)? {
                Ok(mosaic) => ClusterFailure::from_artifact(idx, image_loader::save_jpeg(&mosaic, &path))?
                    .map(|()| (mosaic.width(), mosaic.height())),
                Err(failure) => Err(failure),
            };

            match outcome {
                Ok((width, height)) => {
                    info!("Cluster {} stitched: {}x{} -> {}", idx, width, height, path.display());
                    mosaics.push(path);
                    self.transition(JobState::ClusterDone { cluster: idx });
                }
                Err(failure) => {
                    error!("Cluster {} failed: {}", idx, failure.message);
                    self.transition(JobState::ClusterFailed { cluster: idx });

                    let message = format!(
                        "{} | n_cluster : {}",
                        failure.clone().into_error(),
                        n_clusters
                    );
                    self.layout.write_error(&message)?;
                    self.transition(JobState::PartialFailed { cluster: idx });

                    return Ok(JobReport {
                        n_clusters,
                        mosaics,
                        failure: Some(failure),
                        state: self.state,
                    });
                }
            }
        }

        self.layout.write_flag()?;
        self.transition(JobState::AllDone);
        info!("All {} clusters stitched", n_clusters);

        Ok(JobReport {
            n_clusters,
            mosaics,
            failure: None,
            state: self.state,
        })
    }

    /// Load one cluster and stitch it
    ///
    /// The outer `Result` carries artifact write errors; the inner one the
    /// cluster outcome. Undecodable inputs count as a cluster failure.
    fn stitch_cluster(
        &mut self,
        idx: usize,
        sequence: &ImageSequence,
        cluster: &Cluster,
    ) -> Result<std::result::Result<RgbImage, ClusterFailure>> {
        let records: Vec<&ImageRecord> = match cluster
            .indices
            .iter()
            .map(|&i| sequence.get(i))
            .collect::<Option<Vec<_>>>()
        {
            Some(records) => records,
            None => {
                return Ok(Err(ClusterFailure {
                    cluster: idx,
                    code: None,
                    message: format!("cluster index out of range (sequence has {} images)", sequence.len()),
                }))
            }
        };

        let mut images = Vec::with_capacity(records.len());
        for record in &records {
            match image_loader::load_oriented(&record.path, record.orientation, self.crop_ratio) {
                Ok(image) => images.push(image),
                Err(e) => {
                    return Ok(Err(ClusterFailure {
                        cluster: idx,
                        code: None,
                        message: e.to_string(),
                    }))
                }
            }
        }

        if self.dump_inputs {
            let dir = self.layout.create_cluster_dump_dir(idx)?;
            for (position, (record, image)) in records.iter().zip(&images).enumerate() {
                let path = dir.join(format!("{}_{}", position, record.file_name()));
                if let Err(failure) = ClusterFailure::from_artifact(idx, image_loader::save_image(image, &path))? {
                    return Ok(Err(failure));
                }
            }
        }

        Ok(self
            .stitcher
            .stitch(&images, &self.settings)
            .map_err(|failure| ClusterFailure::from_stitch(idx, &failure)))
    }
}
