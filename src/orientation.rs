//! Orientation classification against a voted standard heading
//!
//! Every heading is folded into the half circle and votes into a 180-bin
//! histogram (own bin +2, both neighbours +1, wrapping at 0/179). The
//! heaviest bin is the standard angle. Each image is then tagged by
//! comparing its own heading with the standard and with the standard
//! plus 180°.

use crate::constants::histogram::{BINS, CENTER_WEIGHT, NEIGHBOR_WEIGHT};
use crate::geometry::{angular_distance, to_180};
use serde::{Deserialize, Serialize};

/// Per-image orientation tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Flying along the standard heading; used as is
    Normal,
    /// Flying against the standard heading; rotated 180° before stitching
    Rotated,
    /// Off-axis (turns, noisy fixes); dropped from the job
    Discard,
}

impl Orientation {
    pub fn is_kept(self) -> bool {
        !matches!(self, Orientation::Discard)
    }
}

/// Histogram bin of a heading: the folded angle rounded to the nearest degree
fn bin_of(angle: f64) -> usize {
    (to_180(angle).round() as usize) % BINS
}

/// Weighted half-circle histogram of the headings
pub fn heading_histogram(angles: &[f64]) -> [u32; BINS] {
    let mut scores = [0u32; BINS];
    for &angle in angles {
        let bin = bin_of(angle);
        scores[(bin + BINS - 1) % BINS] += NEIGHBOR_WEIGHT;
        scores[bin] += CENTER_WEIGHT;
        scores[(bin + 1) % BINS] += NEIGHBOR_WEIGHT;
    }
    scores
}

/// Dominant heading in [0, 180); ties resolve to the lowest bin
///
/// An empty input votes for 0.
pub fn standard_angle(angles: &[f64]) -> u16 {
    let scores = heading_histogram(angles);
    let mut best = 0;
    for (bin, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = bin;
        }
    }
    best as u16
}

/// Classify one heading against the standard angle
pub fn classify(standard: u16, angle: f64, tolerance_deg: f64) -> Orientation {
    let standard = f64::from(standard);
    if angular_distance(angle, standard) <= tolerance_deg {
        Orientation::Normal
    } else if angular_distance(angle, standard + 180.0) <= tolerance_deg {
        Orientation::Rotated
    } else {
        Orientation::Discard
    }
}

/// Result of classifying a whole heading sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub standard_angle: u16,
    pub orientations: Vec<Orientation>,
}

impl Classification {
    pub fn count(&self, orientation: Orientation) -> usize {
        self.orientations.iter().filter(|&&o| o == orientation).count()
    }
}

/// Orientation classifier with a configurable tolerance window
#[derive(Debug, Clone, Copy)]
pub struct OrientationClassifier {
    tolerance_deg: f64,
}

impl Default for OrientationClassifier {
    fn default() -> Self {
        Self::new(crate::constants::defaults::ROTATION_TOLERANCE_DEG)
    }
}

impl OrientationClassifier {
    pub fn new(tolerance_deg: f64) -> Self {
        Self { tolerance_deg }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance_deg
    }

    /// Vote the standard angle and tag every heading
    pub fn classify_all(&self, angles: &[f64]) -> Classification {
        let standard = standard_angle(angles);
        let orientations = angles
            .iter()
            .map(|&angle| classify(standard, angle, self.tolerance_deg))
            .collect();
        Classification {
            standard_angle: standard,
            orientations,
        }
    }
}
