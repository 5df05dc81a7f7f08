//! Image loading.

use std::path::Path;

use image::RgbImage;

use crate::error::{Error, Result};

/// Load an image from disk as 8-bit RGB.
///
/// Any alpha channel in the file is dropped; the segmentation model decides
/// transparency. Format is detected from the file contents.
///
/// # Errors
///
/// Returns [`Error::Load`] if the file is missing, unreadable, or not a
/// decodable image.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    let _span = tracing::debug_span!("load_image", path = %path.display()).entered();

    let img = image::ImageReader::open(path)
        .map_err(|e| Error::Load {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .with_guessed_format()
        .map_err(|e| Error::Load {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .decode()
        .map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!("Loaded {}x{} image", img.width(), img.height());

    Ok(img.to_rgb8())
}
