//! Error types for the drone_stitch library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for drone_stitch operations
pub type Result<T> = std::result::Result<T, StitchError>;

/// Error taxonomy for the alignment, clustering and stitching pipeline
#[derive(Error, Debug)]
pub enum StitchError {
    /// Image carries no GPS tag block; the job cannot be ordered or classified
    #[error("No EXIF geotagging found in {}", path.display())]
    MissingGeotag { path: PathBuf },

    /// Altitude was explicitly requested but is absent
    #[error("No altitude data found in {}", path.display())]
    MissingAltitude { path: PathBuf },

    /// Image carries no capture timestamp
    #[error("No capture time found in {}", path.display())]
    MissingTimestamp { path: PathBuf },

    /// Capture timestamp is not shaped like `YYYY:MM:DD HH:MM:SS`
    #[error("Invalid capture time '{value}' in {}", path.display())]
    InvalidTimestamp { path: PathBuf, value: String },

    /// EXIF metadata could not be parsed
    #[error("EXIF processing error: {message}")]
    ExifError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Image buffer could not be encoded to its output format
    #[error("Failed to save image: {message}")]
    ImageEncodeError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The stitcher rejected or crashed on a cluster
    #[error("Stitching step 1 failed | cluster : {cluster} | code : {} | Error : {message}", code.map_or_else(|| "-".to_string(), |c| c.to_string()))]
    StitchFailure {
        cluster: usize,
        code: Option<i32>,
        message: String,
    },

    /// Read/write failure against the job directory
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// No usable image in the input directory
    #[error("No images found in {}", path.display())]
    EmptyInput { path: PathBuf },

    /// Diagnostic plot could not be rendered
    #[error("Diagnostics error: {message}")]
    DiagnosticsError { message: String },

    /// OpenCV operation failed
    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {operation}")]
    OpenCvError {
        operation: String,
        #[source]
        source: Option<opencv::Error>,
    },
}

impl StitchError {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            message: message.into(),
            source,
        }
    }

    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an image encode error with context
    pub fn image_encode<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageEncodeError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an EXIF processing error with context
    pub fn exif<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ExifError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create an OpenCV error with context
    #[cfg(feature = "opencv")]
    pub fn opencv(operation: impl Into<String>, source: opencv::Error) -> Self {
        Self::OpenCvError {
            operation: operation.into(),
            source: Some(source),
        }
    }

    /// Errors that invalidate the image ordering and stop the job before stitching
    pub fn is_job_fatal(&self) -> bool {
        matches!(
            self,
            StitchError::MissingGeotag { .. }
                | StitchError::MissingTimestamp { .. }
                | StitchError::InvalidTimestamp { .. }
                | StitchError::ExifError { .. }
                | StitchError::EmptyInput { .. }
                | StitchError::InvalidParameter { .. }
        )
    }

    /// Get operator-facing error description
    pub fn user_message(&self) -> String {
        match self {
            StitchError::MissingGeotag { path } => format!(
                "Image {} has no GPS data. Every photo must be geotagged.",
                path.display()
            ),
            StitchError::MissingTimestamp { path } | StitchError::InvalidTimestamp { path, .. } => {
                format!(
                    "Image {} has no usable capture time. Photos cannot be ordered.",
                    path.display()
                )
            }
            StitchError::StitchFailure { cluster, .. } => format!(
                "Cluster {} could not be stitched. Try lowering the pano confidence or the cluster size.",
                cluster
            ),
            StitchError::EmptyInput { .. } => "No images were uploaded for this job.".to_string(),
            _ => "Stitching failed. Please check the job log.".to_string(),
        }
    }
}
