pub mod image_io;
pub mod results;
pub mod ser;

use std::path::Path;

use crate::error::{FrapError, Result};
use crate::frame::{Calibration, SourceInfo, Stack};

/// Load a stack from a SER file or a directory of images.
pub fn load_stack(path: &Path, calibration: Option<Calibration>) -> Result<Stack> {
    if path.is_dir() {
        return image_io::load_image_sequence(path, calibration);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ser") => {
            ser::SerReader::open(path)?.read_stack(calibration)
        }
        _ => Err(FrapError::UnsupportedPixelFormat(format!(
            "expected a .ser file or an image directory: {}",
            path.display()
        ))),
    }
}

/// Describe a stack source without decoding every frame.
pub fn source_info(path: &Path) -> Result<SourceInfo> {
    if path.is_dir() {
        let files = image_io::list_image_files(path)?;
        let first = files.first().ok_or(FrapError::EmptySequence)?;
        let (width, height) = image::image_dimensions(first)?;
        return Ok(SourceInfo {
            path: path.to_path_buf(),
            total_frames: files.len(),
            width,
            height,
            pixel_type: image_io::probe_pixel_type(first)?,
            observer: None,
            instrument: None,
        });
    }
    Ok(ser::SerReader::open(path)?.source_info(path))
}
