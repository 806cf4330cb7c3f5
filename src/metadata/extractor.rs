//! EXIF metadata extraction and parsing
//!
//! Extracts the GPS fix (latitude, longitude, optional altitude) and the
//! capture timestamp that drive image ordering and orientation.

use crate::error::{Result, StitchError};
use crate::geometry::{dms_to_decimal, Coordinate};
use exif::{Context, Field, In, Rational, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// GPS position recorded by the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub coordinate: Coordinate,
    /// Metres above sea level, negative below; `None` when not recorded
    pub altitude: Option<f64>,
}

/// Metadata needed to sequence one image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    pub gps: GpsFix,
    /// Raw `YYYY:MM:DD HH:MM:SS` capture time
    pub date_time: String,
}

/// Source of per-image metadata
pub trait MetadataReader {
    /// Read GPS fix and capture time for the image at `path`
    fn read(&self, path: &Path) -> Result<ImageMetadata>;
}

/// Raw EXIF tag set of one image
#[derive(Debug, Clone, Default)]
pub struct RawMetadata {
    fields: Vec<Field>,
}

impl RawMetadata {
    /// Wrap an already decoded field list
    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Primary-IFD field for `tag`
    pub fn get(&self, tag: Tag) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.tag == tag && field.ifd_num == In::PRIMARY)
    }

    /// Whether any GPS IFD tag is present
    pub fn has_gps(&self) -> bool {
        self.fields.iter().any(|field| field.tag.context() == Context::Gps)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// EXIF metadata extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifExtractor;

impl ExifExtractor {
    /// Read the raw EXIF tag set of an image file
    ///
    /// Files without any EXIF block yield an empty tag set rather than an
    /// error; callers decide which tags are mandatory.
    ///
    /// # Errors
    ///
    /// Returns `StitchError::IoError` if the file cannot be opened and
    /// `StitchError::ExifError` if the EXIF block is malformed.
    pub fn read_raw(image_path: &Path) -> Result<RawMetadata> {
        let file = File::open(image_path).map_err(|e| {
            StitchError::io(format!("Failed to open {}", image_path.display()), e)
        })?;
        let mut reader = BufReader::new(file);

        match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(RawMetadata::from_fields(exif.fields().cloned().collect())),
            Err(exif::Error::NotFound(_)) => Ok(RawMetadata::default()),
            Err(e) => Err(StitchError::exif(
                format!("Failed to parse EXIF of {}", image_path.display()),
                e,
            )),
        }
    }

    /// Extract GPS fix and capture time from an image file
    ///
    /// # Errors
    ///
    /// - `MissingGeotag` when no latitude/longitude can be recovered
    /// - `MissingTimestamp` when neither `DateTime` nor `DateTimeOriginal` exists
    pub fn extract_metadata(image_path: &Path) -> Result<ImageMetadata> {
        let raw = Self::read_raw(image_path)?;
        let gps = Self::gps_fix(&raw, image_path)?;
        let date_time = Self::date_time(&raw, image_path)?;
        Ok(ImageMetadata { gps, date_time })
    }

    /// Read altitude, failing when it is absent
    pub fn read_altitude(image_path: &Path) -> Result<f64> {
        let raw = Self::read_raw(image_path)?;
        Self::altitude(&raw).ok_or_else(|| StitchError::MissingAltitude {
            path: image_path.to_path_buf(),
        })
    }

    /// Decode the GPS fix from a tag set
    pub fn gps_fix(raw: &RawMetadata, image_path: &Path) -> Result<GpsFix> {
        let missing = || StitchError::MissingGeotag {
            path: image_path.to_path_buf(),
        };

        if !raw.has_gps() {
            return Err(missing());
        }

        let latitude = Self::decimal_degrees(raw, Tag::GPSLatitude, Tag::GPSLatitudeRef, image_path)?
            .ok_or_else(missing)?;
        let longitude =
            Self::decimal_degrees(raw, Tag::GPSLongitude, Tag::GPSLongitudeRef, image_path)?
                .ok_or_else(missing)?;

        Ok(GpsFix {
            coordinate: Coordinate::new(latitude, longitude),
            altitude: Self::altitude(raw),
        })
    }

    /// Capture timestamp from `DateTime`, falling back to `DateTimeOriginal`
    pub fn date_time(raw: &RawMetadata, image_path: &Path) -> Result<String> {
        [Tag::DateTime, Tag::DateTimeOriginal]
            .into_iter()
            .filter_map(|tag| raw.get(tag))
            .find_map(ascii_value)
            .ok_or_else(|| StitchError::MissingTimestamp {
                path: image_path.to_path_buf(),
            })
    }

    /// Altitude in metres; requires both `GPSAltitude` and `GPSAltitudeRef`
    pub fn altitude(raw: &RawMetadata) -> Option<f64> {
        let altitude = match &raw.get(Tag::GPSAltitude)?.value {
            Value::Rational(values) => Self::rational_to_float(values.first()?)?,
            _ => return None,
        };
        let below_sea_level = match &raw.get(Tag::GPSAltitudeRef)?.value {
            Value::Byte(values) => *values.first()? == 1,
            _ => return None,
        };

        Some(if below_sea_level { -altitude } else { altitude })
    }

    /// Convert a D/M/S rational triple plus hemisphere reference to decimal degrees
    ///
    /// Returns `Ok(None)` when the tag is absent and an error when it is
    /// present but malformed.
    fn decimal_degrees(
        raw: &RawMetadata,
        value_tag: Tag,
        ref_tag: Tag,
        image_path: &Path,
    ) -> Result<Option<f64>> {
        let Some(field) = raw.get(value_tag) else {
            return Ok(None);
        };

        let malformed = |reason: &str| StitchError::ExifError {
            message: format!("{} in {}: {}", value_tag, image_path.display(), reason),
            source: None,
        };

        let dms = match &field.value {
            Value::Rational(values) if values.len() >= 3 => values,
            _ => return Err(malformed("expected three rationals")),
        };

        let degrees = Self::rational_to_float(&dms[0]).ok_or_else(|| malformed("zero denominator"))?;
        let minutes = Self::rational_to_float(&dms[1]).ok_or_else(|| malformed("zero denominator"))?;
        let seconds = Self::rational_to_float(&dms[2]).ok_or_else(|| malformed("zero denominator"))?;

        let negative = raw
            .get(ref_tag)
            .and_then(ascii_value)
            .is_some_and(|r| r.starts_with('S') || r.starts_with('W'));

        Ok(Some(dms_to_decimal(degrees, minutes, seconds, negative)))
    }

    /// Convert EXIF rational to float
    fn rational_to_float(value: &Rational) -> Option<f64> {
        if value.denom == 0 {
            None
        } else {
            Some(value.num as f64 / value.denom as f64)
        }
    }
}

impl MetadataReader for ExifExtractor {
    fn read(&self, path: &Path) -> Result<ImageMetadata> {
        Self::extract_metadata(path)
    }
}

/// First non-empty ASCII component of a field, trimmed
fn ascii_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .find(|s| !s.is_empty()),
        _ => None,
    }
}
