use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, Luma};
use ndarray::Array2;
use tracing::debug;

use crate::error::{FrapError, Result};
use crate::frame::{Calibration, PixelType, Samples, Stack};

const IMAGE_EXTENSIONS: &[&str] = &["png", "tif", "tiff", "bmp", "jpg", "jpeg"];

/// Image files in `dir`, sorted by file name.
pub fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Decode one image as single-channel samples, keeping its native depth.
fn decode_gray(img: DynamicImage) -> Result<Samples> {
    Ok(match img {
        DynamicImage::ImageLuma8(buf) => Samples::U8(buf.into_raw()),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            Samples::U8(img.to_luma8().into_raw())
        }
        DynamicImage::ImageLuma16(buf) => Samples::U16(buf.into_raw()),
        DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => Samples::U16(img.to_luma16().into_raw()),
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            Samples::F32(img.to_luma32f().into_raw())
        }
        other => {
            return Err(FrapError::UnsupportedPixelFormat(format!(
                "{:?}",
                other.color()
            )))
        }
    })
}

fn append(into: &mut Option<Samples>, frame: Samples) -> Result<()> {
    let Some(all) = into.as_mut() else {
        *into = Some(frame);
        return Ok(());
    };
    match (all, frame) {
        (Samples::U8(all), Samples::U8(f)) => all.extend(f),
        (Samples::U16(all), Samples::U16(f)) => all.extend(f),
        (Samples::F32(all), Samples::F32(f)) => all.extend(f),
        (all, f) => {
            return Err(FrapError::UnsupportedPixelFormat(format!(
                "mixed pixel types in sequence: {} and {}",
                all.pixel_type(),
                f.pixel_type()
            )))
        }
    }
    Ok(())
}

/// Load a directory of single-frame images as one stack.
///
/// Every frame must share the first frame's dimensions and pixel type.
pub fn load_image_sequence(dir: &Path, calibration: Option<Calibration>) -> Result<Stack> {
    let files = list_image_files(dir)?;
    if files.is_empty() {
        return Err(FrapError::EmptySequence);
    }

    let mut dims: Option<(u32, u32)> = None;
    let mut samples: Option<Samples> = None;
    for path in &files {
        let img = image::open(path)?;
        let frame_dims = (img.width(), img.height());
        match dims {
            None => dims = Some(frame_dims),
            Some(d) if d != frame_dims => {
                return Err(FrapError::InvalidDimensions {
                    width: frame_dims.0,
                    height: frame_dims.1,
                })
            }
            Some(_) => {}
        }
        append(&mut samples, decode_gray(img)?)?;
    }

    let (width, height) = dims.ok_or(FrapError::EmptySequence)?;
    let samples = samples.ok_or(FrapError::EmptySequence)?;
    debug!(
        frames = files.len(),
        width,
        height,
        pixel_type = %samples.pixel_type(),
        "Image sequence decoded"
    );
    Stack::new(
        width as usize,
        height as usize,
        files.len(),
        samples,
        calibration.unwrap_or_default(),
    )
}

/// Save a region label mask as a 16-bit grayscale image (PNG or TIFF by
/// extension, TIFF otherwise).
pub fn save_label_mask(labels: &Array2<u8>, path: &Path) -> Result<()> {
    let (h, w) = labels.dim();
    let pixels: Vec<u16> = labels.iter().map(|&l| l as u16).collect();
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or(FrapError::InvalidDimensions {
            width: w as u32,
            height: h as u32,
        })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => img.save_with_format(path, image::ImageFormat::Png)?,
        Some("tif" | "tiff") => img.save_with_format(path, image::ImageFormat::Tiff)?,
        _ => img.save_with_format(path, image::ImageFormat::Tiff)?,
    }
    Ok(())
}

/// Load a label mask written by [`save_label_mask`].
pub fn load_label_mask(path: &Path) -> Result<Array2<u16>> {
    let gray = image::open(path)?.to_luma16();
    let (w, h) = gray.dimensions();
    Array2::from_shape_vec((h as usize, w as usize), gray.into_raw()).map_err(|_| {
        FrapError::InvalidDimensions {
            width: w,
            height: h,
        }
    })
}

/// Pixel type an image file decodes to.
pub fn probe_pixel_type(path: &Path) -> Result<PixelType> {
    Ok(decode_gray(image::open(path)?)?.pixel_type())
}
