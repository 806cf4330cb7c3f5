//! Defaults and fixed names for the step 1 stitching pipeline
//!
//! Tunables live in [`defaults`]; the filesystem contract shared with the
//! status-polling side lives in [`layout`].

/// Default tunables
pub mod defaults {
    /// Maximum number of images per cluster before another cluster is planned
    pub const DIVIDE_THRESHOLD: usize = 80;

    /// Minimum feature-match confidence for accepting an image pair
    pub const PANO_CONFIDENCE: f64 = 1.0;

    /// Scan-count value selecting scans mode; anything else selects panorama mode
    pub const SCANS: i32 = 1;

    /// Half-width of the NORMAL / ROTATED acceptance window in degrees
    pub const ROTATION_TOLERANCE_DEG: f64 = 5.0;

    /// Whether the oriented inputs of each cluster are written next to the mosaics
    pub const DUMP_CLUSTER_INPUTS: bool = true;
}

/// Job directory layout
pub mod layout {
    /// Subdirectory holding the source photographs
    pub const IMAGES_DIR: &str = "images";

    /// Output directory, recreated at job start
    pub const OUTPUT_DIR: &str = "opencv_output";

    /// Prefix of the planned-cluster-count marker (`c_<N>.txt`)
    pub const CLUSTER_MARKER_PREFIX: &str = "c_";

    /// Prefix of per-cluster mosaics (`opencv_<i>.jpg`)
    pub const MOSAIC_PREFIX: &str = "opencv_";

    /// Prefix of per-cluster input dumps (`cluster_<i>/`)
    pub const CLUSTER_DUMP_PREFIX: &str = "cluster_";

    /// Diagnostic scatter plot
    pub const CLUSTER_PLOT: &str = "clustered.png";

    /// Present iff the job failed
    pub const ERROR_FILE: &str = "error.txt";

    /// Present iff every cluster stitched
    pub const FLAG_FILE: &str = "flag.txt";
}

/// Heading histogram used to vote the standard angle
pub mod histogram {
    /// One bin per integer degree of the half circle
    pub const BINS: usize = 180;

    /// Weight added to the bin of the folded angle
    pub const CENTER_WEIGHT: u32 = 2;

    /// Weight added to each neighbouring bin (wrapping at 0/179)
    pub const NEIGHBOR_WEIGHT: u32 = 1;
}

/// K-means clustering over coordinates
pub mod kmeans {
    /// Iteration cap
    pub const MAX_ITERATIONS: usize = 200;

    /// Seed used for centroid initialisation
    pub const SEED: u64 = 42;

    /// Absolute tolerance of the centroid convergence test
    pub const ABSOLUTE_TOLERANCE: f64 = 1e-8;

    /// Relative tolerance of the centroid convergence test
    pub const RELATIVE_TOLERANCE: f64 = 1e-5;
}

/// Diagnostic plot geometry
pub mod plot {
    pub const WIDTH: u32 = 1000;
    pub const HEIGHT: u32 = 750;

    /// Pixels between the plot frame and the canvas edge
    pub const MARGIN: u32 = 50;

    /// Marker radius in pixels
    pub const MARKER_RADIUS: i32 = 5;

    /// Number of grid divisions per axis
    pub const GRID_DIVISIONS: u32 = 10;
}

/// JPEG quality used for mosaics and cluster dumps
pub const JPEG_QUALITY: u8 = 95;
