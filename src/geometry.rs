//! Coordinates and flight headings
//!
//! Headings follow the convention `270° − atan2(Δlat, Δlon)` normalised to
//! [0, 360): a southbound leg is 0°, westbound 90°, northbound 180° and
//! eastbound 270°.

use serde::{Deserialize, Serialize};

/// Latitude / longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Heading in degrees of the leg from `self` to `next`
    pub fn heading_to(&self, next: &Coordinate) -> f64 {
        let dlat = next.latitude - self.latitude;
        let dlon = next.longitude - self.longitude;
        to_360(270.0 - dlat.atan2(dlon).to_degrees())
    }

    /// Euclidean distance in degree space, as used by the similarity clustering
    pub fn distance(&self, other: &Coordinate) -> f64 {
        (self.latitude - other.latitude).hypot(self.longitude - other.longitude)
    }
}

/// Convert a degree/minute/second triple to decimal degrees
///
/// Southern and western hemispheres yield negative values.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, negative: bool) -> f64 {
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    if negative {
        -decimal
    } else {
        decimal
    }
}

/// Wrap any angle into [0, 360)
pub fn to_360(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Fold any angle into the half circle [0, 180)
pub fn to_180(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(180.0);
    if wrapped >= 180.0 {
        0.0
    } else {
        wrapped
    }
}

/// Smallest absolute difference between two angles, in [0, 180]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = to_360(a - b);
    diff.min(360.0 - diff)
}

/// One heading per coordinate
///
/// Entry `i` is the heading from coordinate `i - 1` to `i`; the first leg is
/// duplicated so the output is as long as the input. Fewer than two
/// coordinates produce no headings.
pub fn headings(coordinates: &[Coordinate]) -> Vec<f64> {
    let mut angles = Vec::with_capacity(coordinates.len());
    for (i, pair) in coordinates.windows(2).enumerate() {
        let angle = pair[0].heading_to(&pair[1]);
        if i == 0 {
            angles.push(angle);
        }
        angles.push(angle);
    }
    angles
}
