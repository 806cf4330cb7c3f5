//! Image discovery, decoding and per-image refinement
//!
//! ## Supported Formats
//!
//! Source photographs may be PNG, JPEG, GIF (first frame) or TIFF; the
//! extension check is case-insensitive.
//!
//! ## Design
//!
//! Images are decoded with the `image` crate into 8-bit RGB buffers.
//! Orientation and the optional centre crop are applied here so the stitch
//! backend only ever sees upright, refined inputs.

use crate::constants::JPEG_QUALITY;
use crate::error::{Result, StitchError};
use crate::orientation::Orientation;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ImageError, ImageReader, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    /// First frame only
    Gif,
    Tiff,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }
}

/// List supported image files in `dir`, sorted by file name
///
/// Subdirectories and unsupported files are skipped.
///
/// # Errors
///
/// Returns `StitchError::IoError` if the directory cannot be read.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| StitchError::io(format!("Failed to read {}", dir.display()), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| StitchError::io(format!("Failed to read {}", dir.display()), e))?;
        let path = entry.path();
        if path.is_file() && ImageFormat::from_extension(&path).is_some() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Decode an image file into an RGB buffer
///
/// # Errors
///
/// Returns `StitchError::ImageLoadError` if the file cannot be opened,
/// its format is unknown, or decoding fails.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| StitchError::image_load(format!("Failed to open image file: {}", path.display()), e))?
        .with_guessed_format()
        .map_err(|e| StitchError::image_load(format!("Failed to detect image format: {}", path.display()), e))?;

    let img = reader
        .decode()
        .map_err(|e| StitchError::image_load(format!("Failed to decode image: {}", path.display()), e))?;

    Ok(img.to_rgb8())
}

/// Apply the orientation tag: ROTATED images are turned 180°
///
/// DISCARD images never reach this point; they are passed through unchanged.
pub fn orient(image: RgbImage, orientation: Orientation) -> RgbImage {
    match orientation {
        Orientation::Rotated => imageops::rotate180(&image),
        Orientation::Normal | Orientation::Discard => image,
    }
}

/// Keep the central `ratio` of width and height
pub fn center_crop(image: &RgbImage, ratio: f64) -> RgbImage {
    let (w, h) = image.dimensions();
    let new_w = ((w as f64 * ratio) as u32).clamp(1, w.max(1));
    let new_h = ((h as f64 * ratio) as u32).clamp(1, h.max(1));
    let x = (w - new_w) / 2;
    let y = (h - new_h) / 2;
    imageops::crop_imm(image, x, y, new_w, new_h).to_image()
}

/// Load, orient and optionally crop one image
pub fn load_oriented(path: &Path, orientation: Orientation, crop_ratio: Option<f64>) -> Result<RgbImage> {
    let image = orient(load_image(path)?, orientation);
    Ok(match crop_ratio {
        Some(ratio) if ratio < 1.0 => center_crop(&image, ratio),
        _ => image,
    })
}

/// Encode an RGB buffer as JPEG
///
/// # Errors
///
/// Returns `StitchError::ImageEncodeError` when the buffer cannot be
/// encoded (for example a side longer than 65535 pixels) and
/// `StitchError::IoError` when the file cannot be written. Nothing is
/// written to `path` unless encoding succeeded.
pub fn save_jpeg(image: &RgbImage, path: &Path) -> Result<()> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(image)
        .map_err(|e| encode_error(path, e))?;
    fs::write(path, bytes).map_err(|e| StitchError::io(format!("Failed to write {}", path.display()), e))
}

/// Save an RGB buffer in the format implied by the extension of `path`
pub fn save_image(image: &RgbImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| encode_error(path, e))
}

fn encode_error(path: &Path, error: ImageError) -> StitchError {
    match error {
        ImageError::IoError(e) => StitchError::io(format!("Failed to write {}", path.display()), e),
        other => StitchError::image_encode(format!("Failed to encode {}", path.display()), other),
    }
}
