//! Job directory layout and artifacts
//!
//! The job owns `<working_dir>/opencv_output/` exclusively while it runs.
//! Status consumers read the artifacts written here:
//!
//! | Artifact | Meaning |
//! |---|---|
//! | `c_<N>.txt` | planned cluster count, written before stitching |
//! | `clustered.png` | clustering diagnostic plot |
//! | `opencv_<i>.jpg` | mosaic of cluster `i` |
//! | `error.txt` | job failed; human-readable reason |
//! | `flag.txt` | every cluster stitched |

use crate::constants::layout;
use crate::error::{Result, StitchError};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Paths of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    working_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn images_dir(&self) -> PathBuf {
        self.working_dir.join(layout::IMAGES_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.working_dir.join(layout::OUTPUT_DIR)
    }

    pub fn cluster_marker_path(&self, n_clusters: usize) -> PathBuf {
        self.output_dir()
            .join(format!("{}{}.txt", layout::CLUSTER_MARKER_PREFIX, n_clusters))
    }

    pub fn plot_path(&self) -> PathBuf {
        self.output_dir().join(layout::CLUSTER_PLOT)
    }

    pub fn mosaic_path(&self, cluster: usize) -> PathBuf {
        self.output_dir()
            .join(format!("{}{}.jpg", layout::MOSAIC_PREFIX, cluster))
    }

    pub fn cluster_dump_dir(&self, cluster: usize) -> PathBuf {
        self.output_dir()
            .join(format!("{}{}", layout::CLUSTER_DUMP_PREFIX, cluster))
    }

    pub fn error_path(&self) -> PathBuf {
        self.output_dir().join(layout::ERROR_FILE)
    }

    pub fn flag_path(&self) -> PathBuf {
        self.output_dir().join(layout::FLAG_FILE)
    }

    /// Delete any previous output and create an empty output directory
    pub fn prepare(&self) -> Result<()> {
        let dir = self.output_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| StitchError::io(format!("Failed to clear {}", dir.display()), e))?;
        }
        fs::create_dir_all(&dir)
            .map_err(|e| StitchError::io(format!("Failed to create {}", dir.display()), e))
    }

    /// Empty `c_<N>.txt` marker
    pub fn write_cluster_marker(&self, n_clusters: usize) -> Result<()> {
        write_file(&self.cluster_marker_path(n_clusters), "")
    }

    pub fn write_error(&self, message: &str) -> Result<()> {
        write_file(&self.error_path(), message)
    }

    pub fn write_flag(&self) -> Result<()> {
        write_file(&self.flag_path(), "1")
    }

    /// Create (or reuse) the dump directory of one cluster
    pub fn create_cluster_dump_dir(&self, cluster: usize) -> Result<PathBuf> {
        let dir = self.cluster_dump_dir(cluster);
        fs::create_dir_all(&dir)
            .map_err(|e| StitchError::io(format!("Failed to create {}", dir.display()), e))?;
        Ok(dir)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| StitchError::io(format!("Failed to write {}", path.display()), e))
}

/// Outcome derived from artifacts alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobOutcome {
    /// No output directory
    NotStarted,
    /// Output exists without error or completion flag
    InProgress,
    /// `flag.txt` present
    Done,
    /// `error.txt` present
    Failed,
}

/// Snapshot of a job's output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    /// From `c_<N>.txt`
    pub planned_clusters: Option<usize>,
    /// Indices of existing `opencv_<i>.jpg`, ascending
    pub mosaics: Vec<usize>,
    /// Contents of `error.txt`
    pub error: Option<String>,
    pub flag: bool,
}

impl OutputSummary {
    pub fn outcome(&self) -> JobOutcome {
        if self.error.is_some() {
            JobOutcome::Failed
        } else if self.flag {
            JobOutcome::Done
        } else {
            JobOutcome::InProgress
        }
    }
}

/// Read the artifacts of a job
///
/// Returns `Ok(None)` when the output directory does not exist.
pub fn inspect(layout: &OutputLayout) -> Result<Option<OutputSummary>> {
    let dir = layout.output_dir();
    if !dir.is_dir() {
        return Ok(None);
    }

    let entries =
        fs::read_dir(&dir).map_err(|e| StitchError::io(format!("Failed to read {}", dir.display()), e))?;

    let mut summary = OutputSummary {
        planned_clusters: None,
        mosaics: Vec::new(),
        error: None,
        flag: false,
    };

    for entry in entries {
        let entry = entry.map_err(|e| StitchError::io(format!("Failed to read {}", dir.display()), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();

        if name == layout::ERROR_FILE {
            let text = fs::read_to_string(entry.path())
                .map_err(|e| StitchError::io(format!("Failed to read {}", name), e))?;
            summary.error = Some(text);
        } else if name == layout::FLAG_FILE {
            summary.flag = true;
        } else if let Some(n) = numbered(&name, layout::CLUSTER_MARKER_PREFIX, ".txt") {
            summary.planned_clusters = Some(n);
        } else if let Some(i) = numbered(&name, layout::MOSAIC_PREFIX, ".jpg") {
            summary.mosaics.push(i);
        }
    }

    summary.mosaics.sort_unstable();
    Ok(Some(summary))
}

/// Parse `<prefix><number><suffix>`
fn numbered(name: &str, prefix: &str, suffix: &str) -> Option<usize> {
    name.strip_prefix(prefix)?.strip_suffix(suffix)?.parse().ok()
}

/// Outcome of the job rooted at `working_dir`
pub fn job_outcome(layout: &OutputLayout) -> Result<JobOutcome> {
    Ok(inspect(layout)?.map_or(JobOutcome::NotStarted, |summary| summary.outcome()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = OutputLayout::new("/data/job");
        assert_eq!(layout.images_dir(), PathBuf::from("/data/job/images"));
        assert_eq!(layout.mosaic_path(2), PathBuf::from("/data/job/opencv_output/opencv_2.jpg"));
        assert_eq!(layout.cluster_marker_path(3), PathBuf::from("/data/job/opencv_output/c_3.txt"));
        assert_eq!(layout.cluster_dump_dir(0), PathBuf::from("/data/job/opencv_output/cluster_0"));
    }

    #[test]
    fn test_prepare_clears_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.prepare().unwrap();
        layout.write_flag().unwrap();
        assert!(layout.flag_path().exists());

        layout.prepare().unwrap();
        assert!(!layout.flag_path().exists());
        assert!(layout.output_dir().is_dir());
    }

    #[test]
    fn test_inspect_states() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        assert_eq!(job_outcome(&layout).unwrap(), JobOutcome::NotStarted);

        layout.prepare().unwrap();
        layout.write_cluster_marker(3).unwrap();
        fs::write(layout.mosaic_path(1), b"").unwrap();
        fs::write(layout.mosaic_path(0), b"").unwrap();
        fs::write(layout.output_dir().join("clustered.png"), b"").unwrap();

        let summary = inspect(&layout).unwrap().unwrap();
        assert_eq!(summary.planned_clusters, Some(3));
        assert_eq!(summary.mosaics, vec![0, 1]);
        assert_eq!(summary.outcome(), JobOutcome::InProgress);

        layout.write_error("Stitching step 1 failed | cluster : 2").unwrap();
        let summary = inspect(&layout).unwrap().unwrap();
        assert_eq!(summary.outcome(), JobOutcome::Failed);
        assert!(summary.error.unwrap().contains("cluster : 2"));
    }

    #[test]
    fn test_numbered_names() {
        assert_eq!(numbered("c_12.txt", "c_", ".txt"), Some(12));
        assert_eq!(numbered("cluster_1", "c_", ".txt"), None);
        assert_eq!(numbered("opencv_x.jpg", "opencv_", ".jpg"), None);
    }
}
