//! Clustering diagnostic plot
//!
//! Renders every cluster as a scatter series (longitude on x, latitude on
//! y) into one PNG so operators can eyeball how a flight was split.

use crate::cluster::Cluster;
use crate::constants::plot::{GRID_DIVISIONS, HEIGHT, MARGIN, MARKER_RADIUS, WIDTH};
use crate::error::{Result, StitchError};
use crate::geometry::Coordinate;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use palette::{FromColor, Hsv, Srgb};
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const FRAME: Rgb<u8> = Rgb([40, 40, 40]);

/// Distinct colour of cluster `index` out of `count`
pub fn cluster_color(index: usize, count: usize) -> Rgb<u8> {
    let hue = 360.0 * index as f32 / count.max(1) as f32;
    let rgb: Srgb = Srgb::from_color(Hsv::new(hue, 0.85, 0.9));
    let rgb: Srgb<u8> = rgb.into_format();
    Rgb([rgb.red, rgb.green, rgb.blue])
}

/// Maps geographic coordinates into the plot frame
#[derive(Debug, Clone, Copy)]
struct Projection {
    min_lon: f64,
    min_lat: f64,
    span_lon: f64,
    span_lat: f64,
}

impl Projection {
    fn fit(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_lon, mut max_lon) = (first.longitude, first.longitude);
        let (mut min_lat, mut max_lat) = (first.latitude, first.latitude);
        for p in points {
            min_lon = min_lon.min(p.longitude);
            max_lon = max_lon.max(p.longitude);
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
        }

        // Degenerate extents still need a non-zero span
        let pad = |span: f64| if span > 0.0 { span * 0.05 } else { 1e-5 };
        let (pad_lon, pad_lat) = (pad(max_lon - min_lon), pad(max_lat - min_lat));

        Some(Self {
            min_lon: min_lon - pad_lon,
            min_lat: min_lat - pad_lat,
            span_lon: max_lon - min_lon + 2.0 * pad_lon,
            span_lat: max_lat - min_lat + 2.0 * pad_lat,
        })
    }

    fn project(&self, p: &Coordinate) -> (i32, i32) {
        let inner_w = f64::from(WIDTH - 2 * MARGIN);
        let inner_h = f64::from(HEIGHT - 2 * MARGIN);
        let x = f64::from(MARGIN) + (p.longitude - self.min_lon) / self.span_lon * inner_w;
        let y = f64::from(HEIGHT - MARGIN) - (p.latitude - self.min_lat) / self.span_lat * inner_h;
        (x.round() as i32, y.round() as i32)
    }
}

/// Render the clustering scatter plot into an image buffer
///
/// # Errors
///
/// Returns `StitchError::DiagnosticsError` if there are no points or a
/// cluster references a missing coordinate.
pub fn render_clusters(coordinates: &[Coordinate], clusters: &[Cluster]) -> Result<RgbImage> {
    let projection = Projection::fit(coordinates).ok_or_else(|| StitchError::DiagnosticsError {
        message: "no coordinates to plot".into(),
    })?;

    let mut canvas = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    draw_grid(&mut canvas);

    for (k, cluster) in clusters.iter().enumerate() {
        let color = cluster_color(k, clusters.len());
        for &index in &cluster.indices {
            let point = coordinates.get(index).ok_or_else(|| StitchError::DiagnosticsError {
                message: format!("cluster {} references missing point {}", k, index),
            })?;
            draw_filled_circle_mut(&mut canvas, projection.project(point), MARKER_RADIUS, color);
        }
    }

    Ok(canvas)
}

fn draw_grid(canvas: &mut RgbImage) {
    let (left, top) = (MARGIN as f32, MARGIN as f32);
    let (right, bottom) = ((WIDTH - MARGIN) as f32, (HEIGHT - MARGIN) as f32);

    for i in 1..GRID_DIVISIONS {
        let t = i as f32 / GRID_DIVISIONS as f32;
        let x = left + t * (right - left);
        let y = top + t * (bottom - top);
        draw_line_segment_mut(canvas, (x, top), (x, bottom), GRID);
        draw_line_segment_mut(canvas, (left, y), (right, y), GRID);
    }

    draw_hollow_rect_mut(
        canvas,
        Rect::at(MARGIN as i32, MARGIN as i32).of_size(WIDTH - 2 * MARGIN, HEIGHT - 2 * MARGIN),
        FRAME,
    );
}

/// Render and save the clustering plot
pub fn plot_clusters(coordinates: &[Coordinate], clusters: &[Cluster], output_path: &Path) -> Result<()> {
    let canvas = render_clusters(coordinates, clusters)?;
    canvas.save(output_path).map_err(|e| StitchError::DiagnosticsError {
        message: format!("failed to save {}: {}", output_path.display(), e),
    })
}
