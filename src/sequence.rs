//! Capture-time ordering and per-image records
//!
//! All per-image state (path, GPS fix, capture time, heading, orientation)
//! travels together in one [`ImageRecord`], so dropping discarded images
//! can never desynchronise coordinates, headings and orientations.

use crate::error::{Result, StitchError};
use crate::geometry::{headings, Coordinate};
use crate::metadata::{ImageMetadata, MetadataReader};
use crate::orientation::{Classification, Orientation, OrientationClassifier};
use log::{debug, info};
use std::path::PathBuf;

/// One source photograph and everything derived for it
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub coordinate: Coordinate,
    pub altitude: Option<f64>,
    /// Raw capture time as stored in EXIF
    pub captured_at: String,
    /// `HHMMSS` ordering key derived from `captured_at`
    pub time_key: u32,
    /// Heading of the leg ending at this image, in [0, 360)
    pub heading: f64,
    pub orientation: Orientation,
}

impl ImageRecord {
    /// Build a record from extracted metadata
    ///
    /// Heading and orientation are filled in later by [`ImageSequence`].
    pub fn from_metadata(path: PathBuf, metadata: ImageMetadata) -> Result<Self> {
        let time_key = time_of_day_key(&metadata.date_time).ok_or_else(|| {
            StitchError::InvalidTimestamp {
                path: path.clone(),
                value: metadata.date_time.clone(),
            }
        })?;

        Ok(Self {
            path,
            coordinate: metadata.gps.coordinate,
            altitude: metadata.gps.altitude,
            captured_at: metadata.date_time,
            time_key,
            heading: 0.0,
            orientation: Orientation::Normal,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Ordering key of a `YYYY:MM:DD HH:MM:SS` timestamp
///
/// Only the time of day is used (`12:34:56` -> `123456`), so ordering is
/// bounded to a single day.
pub fn time_of_day_key(date_time: &str) -> Option<u32> {
    let time = date_time.trim().split(' ').nth(1)?;
    let digits: String = time.chars().filter(|&c| c != ':').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Ordered, index-aligned collection of image records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSequence {
    records: Vec<ImageRecord>,
}

impl ImageSequence {
    pub fn new(records: Vec<ImageRecord>) -> Self {
        Self { records }
    }

    /// Read metadata for every path
    ///
    /// Any image without a usable geotag or timestamp fails the whole read.
    pub fn read(paths: &[PathBuf], reader: &dyn MetadataReader) -> Result<Self> {
        let mut records = Vec::with_capacity(paths.len());
        for (i, path) in paths.iter().enumerate() {
            let metadata = reader.read(path)?;
            debug!(
                "[{}/{}] {} at {} ({:.7}, {:.7})",
                i + 1,
                paths.len(),
                path.display(),
                metadata.date_time,
                metadata.gps.coordinate.latitude,
                metadata.gps.coordinate.longitude
            );
            records.push(ImageRecord::from_metadata(path.clone(), metadata)?);
        }
        info!("Read metadata of {} images", records.len());
        Ok(Self { records })
    }

    /// Stable ascending sort by time of day; equal keys keep their input order
    pub fn sort_by_capture_time(&mut self) {
        self.records.sort_by_key(|record| record.time_key);
        debug!(
            "Sorted order: {:?}",
            self.records.iter().map(ImageRecord::file_name).collect::<Vec<_>>()
        );
    }

    /// Fill each record's heading from consecutive GPS fixes
    pub fn assign_headings(&mut self) {
        let angles = headings(&self.coordinates());
        for (record, angle) in self.records.iter_mut().zip(angles) {
            record.heading = angle;
        }
    }

    /// Tag every record and return the vote
    ///
    /// Sequences shorter than two images have no heading and stay NORMAL.
    pub fn classify(&mut self, classifier: &OrientationClassifier) -> Classification {
        if self.records.len() < 2 {
            for record in &mut self.records {
                record.orientation = Orientation::Normal;
            }
            return Classification {
                standard_angle: 0,
                orientations: vec![Orientation::Normal; self.records.len()],
            };
        }

        let classification = classifier.classify_all(&self.headings());
        for (record, &orientation) in self.records.iter_mut().zip(&classification.orientations) {
            record.orientation = orientation;
        }
        classification
    }

    /// Remove DISCARD records, returning how many were dropped
    pub fn drop_discarded(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|record| record.orientation.is_kept());
        before - self.records.len()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.records.iter().map(|r| r.coordinate).collect()
    }

    pub fn headings(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.heading).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::GpsFix;
    use approx::assert_abs_diff_eq;

    fn record(name: &str, time: &str, lat: f64, lon: f64) -> ImageRecord {
        ImageRecord::from_metadata(
            PathBuf::from(name),
            ImageMetadata {
                gps: GpsFix {
                    coordinate: Coordinate::new(lat, lon),
                    altitude: None,
                },
                date_time: time.to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_time_of_day_key() {
        assert_eq!(time_of_day_key("2021:07:23 12:34:56"), Some(123456));
        assert_eq!(time_of_day_key("2021:07:23 00:00:07"), Some(7));
        assert_eq!(time_of_day_key("2021:07:23"), None);
        assert_eq!(time_of_day_key("2021:07:23 ab:cd:ef"), None);
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let err = ImageRecord::from_metadata(
            PathBuf::from("x.jpg"),
            ImageMetadata {
                gps: GpsFix {
                    coordinate: Coordinate::new(0.0, 0.0),
                    altitude: None,
                },
                date_time: "garbage".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, StitchError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_sort_ignores_date_and_is_stable() {
        let mut seq = ImageSequence::new(vec![
            record("c.jpg", "2024:01:02 10:00:02", 0.0, 0.0),
            record("a.jpg", "2024:01:01 10:00:05", 0.0, 0.0),
            record("b.jpg", "2024:01:03 10:00:02", 0.0, 0.0),
            record("d.jpg", "2024:01:01 09:59:59", 0.0, 0.0),
        ]);
        seq.sort_by_capture_time();
        let names: Vec<String> = seq.records().iter().map(ImageRecord::file_name).collect();
        assert_eq!(names, ["d.jpg", "c.jpg", "b.jpg", "a.jpg"]);
    }

    #[test]
    fn test_discard_keeps_fields_aligned() {
        // west, west, north (turn), west
        let mut seq = ImageSequence::new(vec![
            record("0.jpg", "2024:01:01 10:00:00", 0.0, 0.000),
            record("1.jpg", "2024:01:01 10:00:01", 0.0, -0.001),
            record("2.jpg", "2024:01:01 10:00:02", 0.0, -0.002),
            record("3.jpg", "2024:01:01 10:00:03", 0.001, -0.002),
            record("4.jpg", "2024:01:01 10:00:04", 0.001, -0.003),
            record("5.jpg", "2024:01:01 10:00:05", 0.001, -0.004),
        ]);
        seq.assign_headings();
        let classification = seq.classify(&OrientationClassifier::new(5.0));
        assert_eq!(classification.standard_angle, 90);

        let dropped = seq.drop_discarded();
        assert_eq!(dropped, 1);
        assert_eq!(seq.len(), 5);
        for record in seq.records() {
            assert_ne!(record.file_name(), "3.jpg");
            assert_abs_diff_eq!(record.heading, 90.0, epsilon = 1e-6);
            assert_eq!(record.orientation, Orientation::Normal);
        }
    }

    #[test]
    fn test_single_image_stays_normal() {
        let mut seq = ImageSequence::new(vec![record("only.jpg", "2024:01:01 10:00:00", 1.0, 1.0)]);
        seq.assign_headings();
        let classification = seq.classify(&OrientationClassifier::default());
        assert_eq!(classification.orientations, vec![Orientation::Normal]);
        assert_eq!(seq.drop_discarded(), 0);
    }
}
