//! OpenCV `Stitcher` backend
//!
//! Converts RGB buffers to BGR `Mat`s, runs `cv::Stitcher` in scans or
//! panorama mode and converts the mosaic back.

use super::{PanoramaStitcher, StitchFailure, StitchMode, StitchSettings, StitchStatus};
use crate::error::{Result, StitchError};
use image::RgbImage;
use log::debug;
use opencv::{
    core::{Mat, Vec3b, Vector, CV_8UC3},
    prelude::*,
    stitching::{Stitcher, Stitcher_Mode, Stitcher_Status},
};

/// Stitcher backed by OpenCV's high-level stitching pipeline
#[derive(Debug, Default)]
pub struct OpenCvStitcher;

impl OpenCvStitcher {
    pub fn new() -> Self {
        Self
    }

    fn run(
        &self,
        images: &[RgbImage],
        settings: &StitchSettings,
    ) -> opencv::Result<(Stitcher_Status, Mat)> {
        let mode = match settings.mode {
            StitchMode::Scans => Stitcher_Mode::SCANS,
            StitchMode::Panorama => Stitcher_Mode::PANORAMA,
        };
        let mut stitcher = Stitcher::create(mode)?;
        stitcher.set_pano_confidence_thresh(settings.pano_confidence)?;

        let mut mats = Vector::<Mat>::new();
        for image in images {
            mats.push(rgb_to_bgr_mat(image)?);
        }

        let mut pano = Mat::default();
        let status = stitcher.stitch(&mats, &mut pano)?;
        Ok((status, pano))
    }
}

impl PanoramaStitcher for OpenCvStitcher {
    fn stitch(
        &mut self,
        images: &[RgbImage],
        settings: &StitchSettings,
    ) -> std::result::Result<RgbImage, StitchFailure> {
        debug!(
            "OpenCV stitch: {} images, mode {:?}, pano confidence {}",
            images.len(),
            settings.mode,
            settings.pano_confidence
        );

        let (status, pano) = self
            .run(images, settings)
            .map_err(|e| StitchFailure::Raised(e.to_string()))?;

        if status != Stitcher_Status::OK {
            return Err(StitchFailure::Status(StitchStatus::from_code(status as i32)));
        }

        bgr_mat_to_rgb(&pano).map_err(|e| StitchFailure::Raised(e.to_string()))
    }
}

/// Convert an RGB buffer to an OpenCV BGR Mat
pub fn rgb_to_bgr_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let (width, height) = image.dimensions();
    let mut mat = Mat::zeros(height as i32, width as i32, CV_8UC3)?.to_mat()?;

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let bgr = mat.at_2d_mut::<Vec3b>(y as i32, x as i32)?;
        bgr[0] = b;
        bgr[1] = g;
        bgr[2] = r;
    }

    Ok(mat)
}

/// Convert an 8-bit BGR Mat to an RGB buffer
pub fn bgr_mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    if mat.empty() || mat.typ() != CV_8UC3 {
        return Err(StitchError::invalid_parameter(
            "mosaic",
            format!("expected non-empty CV_8UC3 Mat, got type {}", mat.typ()),
        ));
    }

    let (rows, cols) = (mat.rows(), mat.cols());
    let mut image = RgbImage::new(cols as u32, rows as u32);
    for y in 0..rows {
        for x in 0..cols {
            let bgr = mat
                .at_2d::<Vec3b>(y, x)
                .map_err(|e| StitchError::opencv("Mosaic pixel access", e))?;
            image.put_pixel(x as u32, y as u32, image::Rgb([bgr[2], bgr[1], bgr[0]]));
        }
    }
    Ok(image)
}
