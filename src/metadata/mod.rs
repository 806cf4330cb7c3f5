//! EXIF metadata extraction module
//!
//! This module reads the GPS fix and capture time embedded in each aerial
//! photograph. The [`MetadataReader`] trait is the seam the pipeline uses,
//! so jobs can be driven from other metadata sources in tests.

pub mod extractor;

pub use extractor::{ExifExtractor, GpsFix, ImageMetadata, MetadataReader, RawMetadata};
